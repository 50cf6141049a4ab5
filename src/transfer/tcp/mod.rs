//! Reliable transfer over a TCP stream
//!
//! - `server`: sequential accept loop, header then body, close ends the body
//! - `client`: one read for the header, then reads until the peer closes

mod client;
mod server;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;
use crate::transfer::core::LocalStore;

pub use client::{Response, TcpClient};
pub use server::{SessionOutcome, TcpServer};

/// Run the TCP file server until the process is interrupted
pub async fn run_server(config: Config, root: PathBuf) -> Result<()> {
    if !root.is_dir() {
        log::error!("Directory does not exist: {}", root.display());
        anyhow::bail!("Directory does not exist: {}", root.display());
    }
    log::info!("Serving files from: {}", root.display());

    let server = TcpServer::bind(config, LocalStore::new(root)).await?;
    log::info!("TCP file server ready, press Ctrl+C to stop");

    tokio::select! {
        _ = server.listen() => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Server shutting down.");
        }
    }
    Ok(())
}

/// Fetch one file and print it to stdout
pub async fn run_get(config: Config, filename: &str) -> Result<()> {
    println!(
        "Attempting to request file: '{}' from {}",
        filename,
        config.socket_addr()
    );

    let client = TcpClient::new(config);
    let (response, body) = client.fetch(filename).await?;

    println!("\n--- Server Response ---");
    match response {
        Response::Success {
            declared_size,
            total_received,
        } => {
            println!(
                "File transfer initiated (Expected size: {} bytes).",
                declared_size
            );
            println!("File Contents:");
            println!("======================================");
            let mut stdout = std::io::stdout();
            stdout.write_all(&body)?;
            stdout.flush()?;
            println!("\n======================================");
            println!(
                "Transmission complete. Total received data: {} bytes.",
                total_received
            );
        }
        Response::Error { message } => {
            println!("Error: {}", message);
        }
        Response::Unexpected { text } => {
            println!("Unexpected response received.");
            println!("======================================");
            println!("{}", text);
            println!("======================================");
        }
        Response::Closed => {
            println!("Server closed connection without response.");
        }
    }
    Ok(())
}
