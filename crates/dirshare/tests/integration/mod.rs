//! Integration test harness
//!
//! Runs a real `dirshare-server` on an ephemeral localhost port, rooted in
//! a temporary directory, and connects clients to it.

#![allow(dead_code)]

pub mod utils;

use anyhow::{Context, Result};
use dirshare::{Client, ClientConfig};
use dirshare_proto::{Channel, ChannelConfig, Framing};
use dirshare_server::{Server, ServerConfig};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

pub use utils::*;

/// A running server plus the directory it serves
pub struct TestServer {
    /// Address the server listens on
    pub addr: SocketAddr,
    /// Served directory, removed on drop
    root: Option<TempDir>,
    /// Root when serving a directory that is not temporary
    root_path: PathBuf,
    /// Framing settings both ends use
    channel: ChannelConfig,
    /// Stops the accept loop on drop
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Delimited server over a fresh temporary directory
    pub async fn start() -> Result<Self> {
        Self::start_with(Framing::Delimited).await
    }

    /// Server over a fresh temporary directory with the given framing
    pub async fn start_with(framing: Framing) -> Result<Self> {
        let root = TempDir::new().context("Failed to create served directory")?;
        let root_path = root.path().to_path_buf();
        Self::launch(Some(root), root_path, framing).await
    }

    /// Server rooted at an existing directory
    pub async fn serving(dir: &Path) -> Result<Self> {
        Self::launch(None, dir.to_path_buf(), Framing::Delimited).await
    }

    async fn launch(root: Option<TempDir>, root_path: PathBuf, framing: Framing) -> Result<Self> {
        let config = ServerConfig::new()
            .with_bind_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, 0)))
            .with_root_dir(root_path.clone())
            .with_framing(framing);
        let channel = config.channel.clone();

        let mut server = Server::bind(config).await.context("Failed to bind server")?;
        let addr = server.local_addr()?;
        let shutdown = server.shutdown_sender();
        tokio::spawn(server.run());

        Ok(Self {
            addr,
            root,
            root_path,
            channel,
            shutdown,
        })
    }

    /// Directory every session starts in
    pub fn root(&self) -> &Path {
        &self.root_path
    }

    /// Client configuration pointing at this server
    pub fn client_config(&self, local_dir: &Path) -> ClientConfig {
        ClientConfig {
            addr: self.addr.to_string(),
            local_dir: local_dir.to_path_buf(),
            channel: self.channel.clone(),
        }
    }

    /// Connected client transferring files through `local_dir`
    pub async fn client(&self, local_dir: &Path) -> Result<Client> {
        Client::connect(self.client_config(local_dir))
            .await
            .context("Failed to connect client")
    }

    /// Bare protocol channel, after the handshake but before the first listing
    pub async fn raw_channel(&self) -> Result<Channel> {
        let stream = TcpStream::connect(self.addr).await?;
        let (reader, writer) = stream.into_split();
        Ok(Channel::connect(reader, writer, &self.channel).await?)
    }

    /// Listing header for a directory, as the server renders it
    pub fn header_for(&self, dir: &Path) -> String {
        format!("Current Directory: {}:", dir.display())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
