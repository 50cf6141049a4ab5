//! Named-file transfer over TCP and UDP
//!
//! A client sends a bare filename; the server answers with a status header
//! and, on success, the file bytes.
//!
//! ## Module Structure
//!
//! ```text
//! transfer/
//! ├── core/           # Shared wire vocabulary
//! │   ├── request     # Filename request codec
//! │   ├── header      # SUCCESS:/ERROR: status header
//! │   ├── datagram    # Sequenced datagram codec
//! │   └── storage     # File storage backends
//! │
//! ├── tcp/            # Reliable stream transfer
//! │   ├── server      # Header, chunked body, close
//! │   └── client      # Header read, body until close
//! │
//! └── udp/            # Best-effort datagram transfer
//!     ├── chunker     # File bytes to sequenced datagrams
//!     ├── server      # Request handling loop
//!     ├── reassembler # Ordering, duplicates, gaps
//!     └── client      # Receive loop with timeout
//! ```
//!
//! ## Usage Examples
//!
//! ```rust,no_run
//! use xfer::config::Config;
//! use xfer::transfer::core::MemoryStore;
//! use xfer::transfer::udp::{UdpClient, UdpServer};
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let store = MemoryStore::new().with_file("test.txt", "Hello World");
//! let server = UdpServer::bind(Config::datagram().with_port(0), store).await?;
//! let port = server.local_addr()?.port();
//! tokio::spawn(async move { server.listen().await });
//!
//! let client = UdpClient::new(Config::datagram().with_port(port));
//! let result = client.fetch("test.txt").await?;
//! assert_eq!(result.content, b"Hello World");
//! # Ok(())
//! # }
//! ```

pub mod core;
mod error;
pub mod tcp;
pub mod udp;

pub use error::{Result, TransferError};
