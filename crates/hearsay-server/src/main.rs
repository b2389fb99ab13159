//! Hearsay relay binary.
//!
//! # Usage
//!
//! ```bash
//! # Development relay with a self-signed certificate
//! hearsay-server --bind 0.0.0.0:4433
//!
//! # Production relay with TLS material
//! hearsay-server --bind 0.0.0.0:4433 --cert cert.pem --key key.pem
//! ```

use std::time::Duration;

use clap::Parser;
use hearsay_server::{Server, ServerConfig, ServerRuntimeConfig, SweeperConfig, TlsSetup};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Zero-knowledge relay for ephemeral encrypted group chats.
#[derive(Parser, Debug)]
#[command(name = "hearsay-server")]
#[command(about = "Hearsay relay server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:4433")]
    bind: String,

    /// Path to TLS certificate (PEM format)
    #[arg(short, long)]
    cert: Option<String>,

    /// Path to TLS private key (PEM format)
    #[arg(short, long)]
    key: Option<String>,

    /// Maximum concurrent connections
    #[arg(long, default_value = "10000")]
    max_connections: usize,

    /// Seconds between lifecycle sweeps
    #[arg(long, default_value = "30")]
    sweep_interval: u64,

    /// Seconds an empty room may linger before it is reaped
    #[arg(long, default_value = "300")]
    room_retention: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    tracing::info!("Hearsay relay starting on {}", args.bind);

    let tls = match (args.cert, args.key) {
        (Some(cert_path), Some(key_path)) => TlsSetup::Pem { cert_path, key_path },
        _ => {
            tracing::warn!("no TLS certificate provided - using a self-signed certificate");
            TlsSetup::SelfSigned
        },
    };

    let config = ServerRuntimeConfig {
        bind_address: args.bind,
        tls,
        driver: ServerConfig {
            max_connections: args.max_connections,
            sweeper: SweeperConfig {
                interval: Duration::from_secs(args.sweep_interval),
                retention: Duration::from_secs(args.room_retention),
            },
        },
        ..Default::default()
    };

    let server = Server::bind(config)?;
    tracing::info!("relay listening on {}", server.local_addr()?);

    server.run().await?;

    Ok(())
}
