use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::config::Config;
use crate::transfer::TransferError;
use crate::transfer::core::{ResponseHeader, encode_request};

/// What the server answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// `SUCCESS:<size>`; the body went to the sink
    Success {
        /// Size announced by the header
        declared_size: u64,
        /// Body bytes actually received; may differ from `declared_size`
        total_received: u64,
    },
    /// `ERROR:` with its message
    Error { message: String },
    /// Header text that is neither status, reported verbatim
    Unexpected { text: String },
    /// Server closed without sending a header
    Closed,
}

/// Reliable file client
///
/// # Example
///
/// ```rust,no_run
/// use xfer::config::Config;
/// use xfer::transfer::tcp::TcpClient;
///
/// # async fn demo() -> anyhow::Result<()> {
/// let client = TcpClient::new(Config::stream());
/// let (response, body) = client.fetch("test.txt").await?;
/// # Ok(())
/// # }
/// ```
pub struct TcpClient {
    config: Config,
}

impl TcpClient {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Request `filename` and collect the body in memory
    pub async fn fetch(&self, filename: &str) -> Result<(Response, Vec<u8>)> {
        let mut body = Vec::new();
        let response = self.fetch_into(filename, &mut body).await?;
        Ok((response, body))
    }

    /// Request `filename` and stream the body into `sink` as it arrives
    pub async fn fetch_into<W>(&self, filename: &str, sink: &mut W) -> Result<Response>
    where
        W: AsyncWrite + Unpin,
    {
        let addr = self.config.socket_addr();
        let mut stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("Connection to {} failed", addr))?;
        log::info!("Connection established. Sending filename...");

        stream.write_all(&encode_request(filename)).await?;
        self.receive(&mut stream, sink).await
    }

    /// Read the header and body from an established stream
    ///
    /// The first read is taken to be the whole header. Nothing separates the
    /// header from the body on the wire, so if body bytes arrive in that same
    /// read they are parsed as part of the header (usually failing as an
    /// invalid size).
    pub async fn receive<R, W>(&self, stream: &mut R, sink: &mut W) -> Result<Response>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut buf = vec![0u8; self.config.receive_buffer_size];

        let n = stream.read(&mut buf).await?;
        if n == 0 {
            log::warn!("Server closed connection without response.");
            return Ok(Response::Closed);
        }
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();

        let declared_size = match ResponseHeader::parse(&text) {
            Ok(ResponseHeader::Error { message }) => return Ok(Response::Error { message }),
            Ok(ResponseHeader::Success { size }) => size,
            Err(TransferError::UnexpectedResponse(text)) => {
                return Ok(Response::Unexpected { text });
            }
            Err(e) => return Err(e.into()),
        };
        log::info!(
            "File transfer initiated (Expected size: {} bytes).",
            declared_size
        );

        let mut total_received = 0u64;
        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n]).await?;
            total_received += n as u64;
        }
        sink.flush().await?;

        if total_received != declared_size {
            log::debug!(
                "Received {} bytes, header announced {}",
                total_received,
                declared_size
            );
        }

        Ok(Response::Success {
            declared_size,
            total_received,
        })
    }
}
