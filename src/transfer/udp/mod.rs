//! Best-effort transfer over UDP datagrams
//!
//! - `chunker`: splits file bytes into `<seq>:<payload>` datagrams
//! - `server`: answers each request with chunks and a completion marker
//! - `reassembler`: orders chunks, drops duplicates, finds gaps
//! - `client`: sends the request and feeds the reassembler until done

mod chunker;
mod client;
mod reassembler;
mod server;

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;

use crate::config::Config;
use crate::transfer::core::LocalStore;

pub use chunker::Chunker;
pub use client::UdpClient;
pub use reassembler::{Reassembler, Reassembly, ReassemblyState};
pub use server::{RequestOutcome, UdpServer};

/// Run the UDP file server until the process is interrupted
pub async fn run_server(config: Config, root: PathBuf) -> Result<()> {
    if !root.is_dir() {
        log::error!("Directory does not exist: {}", root.display());
        anyhow::bail!("Directory does not exist: {}", root.display());
    }
    log::info!("Serving files from: {}", root.display());

    let server = UdpServer::bind(config, LocalStore::new(root)).await?;
    log::info!("UDP file server ready, press Ctrl+C to stop");

    tokio::select! {
        _ = server.listen() => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("Server shutting down.");
        }
    }
    Ok(())
}

/// Fetch one file, print it and report gaps
pub async fn run_get(config: Config, filename: &str, show_missing: bool) -> Result<()> {
    config.validate_datagram()?;
    println!(
        "Attempting to request file: '{}' from {}",
        filename,
        config.socket_addr()
    );

    let client = UdpClient::new(config);
    let result = client.fetch(filename).await?;

    match &result.state {
        ReassemblyState::Rejected { message } => {
            println!("\n--- Server Response ---");
            println!("Error: {}", message);
            return Ok(());
        }
        ReassemblyState::Completed { last_seq } => {
            println!("Received completion marker. Total data packets expected: {}", last_seq);
        }
        ReassemblyState::TimedOut | ReassemblyState::Receiving => {}
    }

    println!("\n--- Reassembly & Output ---");
    if result.chunks_received == 0 {
        println!("No data received or file was empty.");
        return Ok(());
    }

    println!("File Contents:");
    println!("======================================");
    let mut stdout = std::io::stdout();
    stdout.write_all(&result.content)?;
    stdout.flush()?;

    if let Some(missing) = result.missing.as_ref().filter(|m| !m.is_empty()) {
        println!(
            "\n\nWARNING: Missing packets detected: {} packet(s).",
            missing.len()
        );
        if show_missing {
            let list: Vec<String> = missing.iter().map(u32::to_string).collect();
            println!("Missing sequence numbers: {}", list.join(", "));
        }
    }

    println!("\n======================================");
    println!(
        "Transmission complete. Total received data: {} bytes.",
        result.total_bytes()
    );
    Ok(())
}
