//! Transfer configuration
//!
//! Every server and client takes a [`Config`] value at construction. The
//! historical constants live only as defaults in [`Config::stream`] and
//! [`Config::datagram`]; an optional TOML file ([`FileConfig`]) and the
//! command line override them.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default address both servers bind to and both clients contact
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
/// Default port shared by the TCP and UDP services
pub const DEFAULT_PORT: u16 = 8080;
/// Largest request a server reads in one receive
pub const DEFAULT_REQUEST_BUFFER_SIZE: usize = 1024;
/// Transfer unit for TCP body writes and client reads
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 1024;
/// File bytes carried by one UDP datagram
pub const DEFAULT_DATAGRAM_CHUNK_SIZE: usize = 1000;
/// UDP client receive buffer, chunk size plus headroom for the header
pub const DEFAULT_DATAGRAM_BUFFER_SIZE: usize = 1500;
/// How long the UDP client waits for each datagram
pub const DEFAULT_RECEIVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Largest payload an IPv4 UDP datagram can carry
const MAX_UDP_PAYLOAD: usize = 65_507;

/// Runtime configuration for one server or client
///
/// # Example
///
/// ```rust
/// use xfer::config::Config;
/// use std::time::Duration;
///
/// let config = Config::datagram()
///     .with_port(9000)
///     .with_receive_timeout(Duration::from_secs(2));
/// assert_eq!(config.transfer_chunk_size, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address to bind (servers) or contact (clients)
    pub host: IpAddr,
    /// Port number
    pub port: u16,
    /// Buffer used when a server reads the filename request
    pub request_buffer_size: usize,
    /// Maximum body bytes per TCP write, or file bytes per UDP datagram
    pub transfer_chunk_size: usize,
    /// Buffer used by clients for each receive
    pub receive_buffer_size: usize,
    /// Per-datagram wait on the UDP client
    pub receive_timeout: Duration,
}

impl Config {
    /// Defaults for the reliable (TCP) transport
    pub fn stream() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            request_buffer_size: DEFAULT_REQUEST_BUFFER_SIZE,
            transfer_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
            receive_buffer_size: DEFAULT_STREAM_CHUNK_SIZE,
            receive_timeout: DEFAULT_RECEIVE_TIMEOUT,
        }
    }

    /// Defaults for the unreliable (UDP) transport
    pub fn datagram() -> Self {
        Self {
            transfer_chunk_size: DEFAULT_DATAGRAM_CHUNK_SIZE,
            receive_buffer_size: DEFAULT_DATAGRAM_BUFFER_SIZE,
            ..Self::stream()
        }
    }

    /// Set the host address
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    /// Set the port number
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the request buffer size
    pub fn with_request_buffer_size(mut self, size: usize) -> Self {
        self.request_buffer_size = size;
        self
    }

    /// Set the transfer chunk size
    pub fn with_transfer_chunk_size(mut self, size: usize) -> Self {
        self.transfer_chunk_size = size;
        self
    }

    /// Set the client receive buffer size
    pub fn with_receive_buffer_size(mut self, size: usize) -> Self {
        self.receive_buffer_size = size;
        self
    }

    /// Set the per-datagram receive timeout
    pub fn with_receive_timeout(mut self, timeout: Duration) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Socket address built from host and port
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Overlay the keys present in a file section
    pub fn merge_section(mut self, section: &TransportSection) -> Self {
        if let Some(host) = section.host {
            self.host = host;
        }
        if let Some(port) = section.port {
            self.port = port;
        }
        if let Some(size) = section.request_buffer_size {
            self.request_buffer_size = size;
        }
        if let Some(size) = section.transfer_chunk_size {
            self.transfer_chunk_size = size;
        }
        if let Some(size) = section.receive_buffer_size {
            self.receive_buffer_size = size;
        }
        if let Some(timeout) = section.receive_timeout {
            self.receive_timeout = timeout;
        }
        self
    }

    /// Overlay command line values; `None` keeps the current setting
    pub fn merge_cli(mut self, host: Option<IpAddr>, port: Option<u16>) -> Self {
        if let Some(host) = host {
            self.host = host;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }

    /// Check sizes common to both transports
    pub fn validate(&self) -> Result<()> {
        if self.request_buffer_size == 0 {
            anyhow::bail!("request_buffer_size must be greater than zero");
        }
        if self.transfer_chunk_size == 0 {
            anyhow::bail!("transfer_chunk_size must be greater than zero");
        }
        if self.receive_buffer_size == 0 {
            anyhow::bail!("receive_buffer_size must be greater than zero");
        }
        if self.receive_timeout.is_zero() {
            anyhow::bail!("receive_timeout must be greater than zero");
        }
        Ok(())
    }

    /// Check sizes, plus that a framed chunk fits one datagram and the
    /// client's receive buffer
    pub fn validate_datagram(&self) -> Result<()> {
        self.validate()?;
        let framed = self.transfer_chunk_size + crate::transfer::core::DATA_HEADER_LEN;
        if framed > MAX_UDP_PAYLOAD {
            anyhow::bail!(
                "transfer_chunk_size {} does not fit in a UDP datagram (max {})",
                self.transfer_chunk_size,
                MAX_UDP_PAYLOAD - crate::transfer::core::DATA_HEADER_LEN
            );
        }
        if self.receive_buffer_size < framed {
            anyhow::bail!(
                "receive_buffer_size {} is smaller than a framed chunk ({} bytes)",
                self.receive_buffer_size,
                framed
            );
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::stream()
    }
}

/// One `[tcp]` or `[udp]` table of the configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TransportSection {
    pub host: Option<IpAddr>,
    pub port: Option<u16>,
    pub request_buffer_size: Option<usize>,
    pub transfer_chunk_size: Option<usize>,
    pub receive_buffer_size: Option<usize>,
    #[serde(with = "humantime_serde")]
    pub receive_timeout: Option<Duration>,
    /// Directory a server resolves request names against
    pub root: Option<PathBuf>,
}

/// Contents of the optional TOML configuration file
///
/// ```toml
/// [tcp]
/// port = 8080
/// root = "/srv/files"
///
/// [udp]
/// transfer_chunk_size = 1000
/// receive_timeout = "5s"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub tcp: TransportSection,
    pub udp: TransportSection,
}

impl FileConfig {
    /// Parse configuration text
    pub fn parse(text: &str) -> Result<Self> {
        toml::from_str(text).context("Invalid configuration file")
    }

    /// Load a configuration file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        log::debug!("Loaded config file {}", path.display());
        Self::parse(&text)
    }

    /// Load the file when a path is given, otherwise use empty sections
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Effective TCP configuration: preset, then file
    pub fn stream_config(&self) -> Config {
        Config::stream().merge_section(&self.tcp)
    }

    /// Effective UDP configuration: preset, then file
    pub fn datagram_config(&self) -> Config {
        Config::datagram().merge_section(&self.udp)
    }
}
