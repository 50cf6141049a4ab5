use std::net::SocketAddr;

use anyhow::{Context, Result};
use log::{error, info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::config::Config;
use crate::transfer::core::{
    ChunkReader, FileStore, ResponseHeader, decode_request, spawn_blocking_iter,
};
use crate::transfer::error::{ERROR_BACKOFF, is_transient};

/// How a single reliable session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Header and full body were sent
    Sent { filename: String, bytes: u64 },
    /// `ERROR: File Not Found.` was sent
    NotFound { filename: String },
    /// Peer closed before sending a request
    Disconnected,
}

/// Reliable file server
///
/// Connections are served strictly one after another: a new connection is
/// not accepted until the current session has written its whole body.
pub struct TcpServer<S> {
    listener: TcpListener,
    config: Config,
    store: S,
}

impl<S: FileStore> TcpServer<S> {
    /// Bind to the configured host and port
    pub async fn bind(config: Config, store: S) -> Result<Self> {
        config.validate()?;
        let addr = config.socket_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        Ok(Self {
            listener,
            config,
            store,
        })
    }

    /// Address actually bound, useful when the port was 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept and serve connections until the task is dropped
    pub async fn listen(&self) {
        info!("File server listening on {}", self.config.socket_addr());
        loop {
            info!("Waiting for a new client connection...");
            match self.listener.accept().await {
                Ok((stream, peer_addr)) => {
                    info!("Connection established with {}", peer_addr);
                    if let Err(e) = self.handle_connection(stream).await {
                        error!("An error occurred while handling client {}: {:#}", peer_addr, e);
                    }
                }
                Err(e) if is_transient(&e) => {
                    warn!("Accept failed: {}", e);
                }
                Err(e) => {
                    error!("Accept failed: {}", e);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                }
            }
        }
    }

    /// Run one session on an accepted connection, then close it
    pub async fn handle_connection(&self, mut stream: TcpStream) -> Result<SessionOutcome> {
        let outcome = self.serve(&mut stream).await;
        // The close is the body terminator
        let _ = stream.shutdown().await;
        outcome
    }

    async fn serve(&self, stream: &mut TcpStream) -> Result<SessionOutcome> {
        let mut buf = vec![0u8; self.config.request_buffer_size];
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            info!("Client disconnected.");
            return Ok(SessionOutcome::Disconnected);
        }

        let filename = decode_request(&buf[..n]);
        info!("Client requested file: '{}'", filename);

        let size = match self.store.lookup(&filename)? {
            Some(size) => size,
            None => {
                let header = ResponseHeader::not_found();
                stream.write_all(&header.encode()).await?;
                info!("Sent {}", header);
                return Ok(SessionOutcome::NotFound { filename });
            }
        };

        info!("File found (Size: {} bytes). Sending content...", size);
        stream
            .write_all(&ResponseHeader::Success { size }.encode())
            .await?;

        let reader = self
            .store
            .open(&filename)
            .with_context(|| format!("Failed to open {}", filename))?;

        // File reads block, so they run off the runtime and arrive by channel
        let mut chunks =
            spawn_blocking_iter(ChunkReader::new(reader, self.config.transfer_chunk_size));
        let mut sent = 0u64;
        while let Some(chunk) = chunks.recv().await {
            let chunk = chunk.with_context(|| format!("Failed to read {}", filename))?;
            stream.write_all(&chunk).await?;
            sent += chunk.len() as u64;
        }

        info!("File content transmission complete.");
        Ok(SessionOutcome::Sent {
            filename,
            bytes: sent,
        })
    }
}
