//! Dirshare Client Binary
//!
//! Interactive prompt: each line is one command against the remote
//! directory. `exit` (or end of input) ends the session.

use anyhow::{Context, Result};
use clap::Parser;
use dirshare::{Client, ClientConfig, ClientState};
use dirshare_proto::Framing;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_subscriber::EnvFilter;

const PROMPT: &str = "Enter the command you want to perform on the current Directory: ";

#[derive(Parser, Debug)]
#[command(name = "dirshare", about = "Browse and transfer files on a dirshare server", version)]
struct Cli {
    /// JSON configuration file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Server address, host:port
    #[arg(long, value_name = "ADDR")]
    addr: Option<String>,

    /// Directory uploads are read from and downloads written to
    #[arg(long, value_name = "DIR")]
    local_dir: Option<PathBuf>,

    /// Message framing: delimited or length-prefixed (must match the server)
    #[arg(long, value_name = "MODE")]
    framing: Option<Framing>,
}

impl Cli {
    fn into_config(self) -> Result<ClientConfig> {
        let mut config = match &self.config {
            Some(path) => ClientConfig::from_json_file(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => ClientConfig::new(),
        };

        if let Some(addr) = self.addr {
            config = config.with_addr(addr);
        }
        if let Some(dir) = self.local_dir {
            config = config.with_local_dir(dir);
        }
        if let Some(framing) = self.framing {
            config = config.with_framing(framing);
        }

        Ok(config)
    }
}

fn prompt() -> Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "{}", PROMPT)?;
    stdout.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // logs go to stderr so they do not interleave with listings
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().into_config()?;
    let mut client = Client::connect(config).await.context("connecting to server")?;
    println!("{}", client.listing());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while client.state() == ClientState::Ready {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match client.execute(&line).await {
            Ok(report) => {
                if let Some(notice) = report.notice {
                    println!("{}", notice);
                }
                if let Some(listing) = report.listing {
                    println!("{}", listing);
                }
            }
            Err(e) => {
                error!("Session ended: {}", e);
                return Err(e.into());
            }
        }
    }

    client.close().await?;
    Ok(())
}
