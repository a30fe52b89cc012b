//! Dirshare Server Binary
//!
//! Serves a directory tree to any number of concurrent clients.

use anyhow::{Context, Result};
use clap::Parser;
use dirshare_proto::Framing;
use dirshare_server::{Server, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dirshare-server", about = "Share a directory over TCP", version)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    bind: Option<SocketAddr>,

    /// Initial working directory of every session
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Bytes taken from the socket per read
    #[arg(long, value_name = "BYTES")]
    buffer_size: Option<usize>,

    /// Message framing: delimited or length-prefixed
    #[arg(long, value_name = "MODE")]
    framing: Option<Framing>,
}

impl Cli {
    fn into_config(self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ServerConfig::new(),
        };

        if let Some(addr) = self.bind {
            config = config.with_bind_addr(addr);
        }
        if let Some(root) = self.root {
            config = config.with_root_dir(root);
        }
        if let Some(size) = self.buffer_size {
            config = config.with_buffer_size(size);
        }
        if let Some(framing) = self.framing {
            config = config.with_framing(framing);
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_config()?;
    info!("Starting dirshare server");

    let server = Server::bind(config).await.context("starting server")?;

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                error!("Server error: {}", e);
                std::process::exit(1);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, shutting down");
        }
    }

    Ok(())
}
