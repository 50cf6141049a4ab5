use std::io::Write;
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use xfer::config::{FileConfig, TransportSection};
use xfer::{bucket, crc, transfer};

#[derive(Parser)]
#[command(name = "xfer", version, about = "File transfer over TCP and UDP, plus link-layer lab tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reliable transfer over TCP
    Tcp {
        #[command(subcommand)]
        action: TcpAction,
    },
    /// Best-effort transfer over UDP
    Udp {
        #[command(subcommand)]
        action: UdpAction,
    },
    /// CRC-16/CCITT frame check walkthrough
    Crc {
        /// Message to protect
        message: String,
        /// Byte index of the frame to corrupt
        #[arg(long, default_value_t = 4)]
        corrupt: usize,
    },
    /// Leaky bucket traffic shaping simulation
    Bucket {
        /// Bucket capacity in units
        #[arg(long, default_value_t = bucket::DEFAULT_CAPACITY)]
        capacity: u64,
        /// Output rate in units per tick
        #[arg(long, default_value_t = bucket::DEFAULT_RATE)]
        rate: u64,
        /// Units arriving at each tick
        incoming: Vec<u64>,
    },
}

#[derive(Subcommand)]
enum TcpAction {
    /// Serve files from a directory
    Server(ServerArgs),
    /// Request a file and print it
    Get(GetArgs),
}

#[derive(Subcommand)]
enum UdpAction {
    /// Serve files from a directory
    Server(ServerArgs),
    /// Request a file and print it
    Get {
        #[command(flatten)]
        get: GetArgs,
        /// Wait per datagram before giving up (e.g. 5s, 500ms)
        #[arg(long, value_parser = humantime_serde::re::humantime::parse_duration)]
        timeout: Option<Duration>,
        /// List the missing sequence numbers
        #[arg(long)]
        show_missing: bool,
    },
}

#[derive(Args)]
struct ServerArgs {
    /// IP address to bind
    #[arg(short, long)]
    bind: Option<IpAddr>,
    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,
    /// Directory to serve, defaults to the current directory
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Args)]
struct GetArgs {
    /// File to request
    filename: String,
    /// Server address
    #[arg(long)]
    host: Option<IpAddr>,
    /// Server port
    #[arg(short, long)]
    port: Option<u16>,
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .init();
}

/// Server root: flag, then file, then the working directory
fn server_root(dir: Option<PathBuf>, section: &TransportSection) -> PathBuf {
    dir.or_else(|| section.root.clone())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Tcp { action } => match action {
            TcpAction::Server(args) => {
                let file = FileConfig::load_optional(args.config.as_deref())?;
                let config = file.stream_config().merge_cli(args.bind, args.port);
                let root = server_root(args.dir, &file.tcp);
                transfer::tcp::run_server(config, root).await?;
            }
            TcpAction::Get(args) => {
                let file = FileConfig::load_optional(args.config.as_deref())?;
                let config = file.stream_config().merge_cli(args.host, args.port);
                config.validate()?;
                transfer::tcp::run_get(config, &args.filename).await?;
            }
        },
        Commands::Udp { action } => match action {
            UdpAction::Server(args) => {
                let file = FileConfig::load_optional(args.config.as_deref())?;
                let config = file.datagram_config().merge_cli(args.bind, args.port);
                let root = server_root(args.dir, &file.udp);
                transfer::udp::run_server(config, root).await?;
            }
            UdpAction::Get {
                get,
                timeout,
                show_missing,
            } => {
                let file = FileConfig::load_optional(get.config.as_deref())?;
                let mut config = file.datagram_config().merge_cli(get.host, get.port);
                if let Some(timeout) = timeout {
                    config = config.with_receive_timeout(timeout);
                }
                transfer::udp::run_get(config, &get.filename, show_missing).await?;
            }
        },
        Commands::Crc { message, corrupt } => crc::run(&message, corrupt)?,
        Commands::Bucket {
            capacity,
            rate,
            incoming,
        } => {
            let traffic = if incoming.is_empty() {
                bucket::DEFAULT_TRAFFIC.to_vec()
            } else {
                incoming
            };
            bucket::run(capacity, rate, &traffic)?;
        }
    }

    Ok(())
}
