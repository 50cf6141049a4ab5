use std::net::SocketAddr;

use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use tokio::net::UdpSocket;

use super::chunker::Chunker;
use crate::config::Config;
use crate::transfer::core::{
    Datagram, FileStore, NOT_FOUND_MESSAGE, decode_request, spawn_blocking_iter,
};
use crate::transfer::error::{ERROR_BACKOFF, is_transient};

/// How one datagram request was answered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Every chunk and the completion marker went out
    Sent {
        filename: String,
        bytes: u64,
        chunks: u32,
    },
    /// The error datagram went out
    NotFound { filename: String },
}

/// Unreliable file server
///
/// Chunks are fired at the requester with no acknowledgment, pacing or
/// retransmission. Requests are handled one at a time; the next request is
/// not read until the current chunk loop has finished.
pub struct UdpServer<S> {
    socket: UdpSocket,
    config: Config,
    store: S,
}

impl<S: FileStore> UdpServer<S> {
    /// Bind to the configured host and port
    pub async fn bind(config: Config, store: S) -> Result<Self> {
        config.validate_datagram()?;
        let addr = config.socket_addr();
        let socket = UdpSocket::bind(addr)
            .await
            .with_context(|| format!("Failed to bind to {}", addr))?;
        Ok(Self {
            socket,
            config,
            store,
        })
    }

    /// Address actually bound, useful when the port was 0
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and answer requests until the task is dropped
    pub async fn listen(&self) {
        info!("UDP file server listening on {}", self.config.socket_addr());
        let mut buf = vec![0u8; self.config.request_buffer_size];
        loop {
            info!("Waiting for client request (filename)...");
            let (n, peer) = match self.socket.recv_from(&mut buf).await {
                Ok(received) => received,
                Err(e) if is_transient(&e) => {
                    warn!("Receive failed: {}", e);
                    continue;
                }
                Err(e) => {
                    error!("Receive failed: {}", e);
                    tokio::time::sleep(ERROR_BACKOFF).await;
                    continue;
                }
            };
            if let Err(e) = self.handle_request(&buf[..n], peer).await {
                error!("An error occurred while serving {}: {:#}", peer, e);
            }
        }
    }

    /// Answer one request datagram from `peer`
    pub async fn handle_request(&self, request: &[u8], peer: SocketAddr) -> Result<RequestOutcome> {
        let filename = decode_request(request);
        info!("Received request from {} for file: '{}'", peer, filename);

        let size = match self.store.lookup(&filename)? {
            Some(size) => size,
            None => {
                let reply = Datagram::Error {
                    message: NOT_FOUND_MESSAGE.to_string(),
                };
                self.socket.send_to(&reply.encode(), peer).await?;
                info!("Sent {}", String::from_utf8_lossy(&reply.encode()));
                return Ok(RequestOutcome::NotFound { filename });
            }
        };

        info!("File found (Size: {} bytes). Sending content in chunks...", size);
        let reader = self
            .store
            .open(&filename)
            .with_context(|| format!("Failed to open {}", filename))?;

        let mut datagrams =
            spawn_blocking_iter(Chunker::new(reader, self.config.transfer_chunk_size));
        let mut bytes = 0u64;
        let mut chunks = 0u32;
        while let Some(datagram) = datagrams.recv().await {
            let datagram = datagram.with_context(|| format!("Failed to read {}", filename))?;
            if let Datagram::Data { seq, payload } = &datagram {
                debug!("Sending chunk {} ({} bytes)", seq, payload.len());
                bytes += payload.len() as u64;
                chunks += 1;
            }
            self.socket.send_to(&datagram.encode(), peer).await?;
        }

        info!("Transmission complete. Total chunks sent: {}", chunks);
        Ok(RequestOutcome::Sent {
            filename,
            bytes,
            chunks,
        })
    }
}
