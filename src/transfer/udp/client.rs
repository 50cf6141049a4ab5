use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use anyhow::{Context, Result};
use tokio::net::UdpSocket;
use tokio::time::timeout;

use super::reassembler::{Reassembler, Reassembly};
use crate::config::Config;
use crate::transfer::core::encode_request;

/// Unreliable file client
///
/// Sends the request once, then collects datagrams until the completion
/// marker, an error datagram, or a receive timeout. Missing chunks are
/// reported, never requested again.
///
/// # Example
///
/// ```rust,no_run
/// use xfer::config::Config;
/// use xfer::transfer::udp::UdpClient;
///
/// # async fn demo() -> anyhow::Result<()> {
/// let client = UdpClient::new(Config::datagram());
/// let result = client.fetch("test.txt").await?;
/// println!("{} bytes, {} missing", result.total_bytes(), result.missing_count());
/// # Ok(())
/// # }
/// ```
pub struct UdpClient {
    config: Config,
}

impl UdpClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Request `filename` and reassemble whatever arrives
    pub async fn fetch(&self, filename: &str) -> Result<Reassembly> {
        self.config.validate_datagram()?;
        let server_addr = self.config.socket_addr();
        let local: IpAddr = match server_addr {
            SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
            SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
        };
        let socket = UdpSocket::bind(SocketAddr::new(local, 0))
            .await
            .context("Socket creation error")?;

        socket
            .send_to(&encode_request(filename), server_addr)
            .await
            .with_context(|| format!("Failed to send request to {}", server_addr))?;
        log::info!("Filename sent. Waiting for file chunks...");

        self.receive(&socket).await
    }

    /// Drive a reassembler from datagrams arriving on `socket`
    pub async fn receive(&self, socket: &UdpSocket) -> Result<Reassembly> {
        let mut reassembler = Reassembler::new();
        let mut buf = vec![0u8; self.config.receive_buffer_size];

        while !reassembler.is_done() {
            match timeout(self.config.receive_timeout, socket.recv_from(&mut buf)).await {
                Ok(Ok((n, _from))) => {
                    reassembler.accept(&buf[..n]);
                }
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => {
                    log::warn!(
                        "Socket timeout reached. Assuming transmission complete or lost packets."
                    );
                    reassembler.time_out();
                }
            }
        }

        Ok(reassembler.finish())
    }
}
