//! Server configuration

use crate::ServerError;
use dirshare_proto::{ChannelConfig, Framing, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on
    pub bind_addr: SocketAddr,
    /// Initial working directory of every session (process cwd if unset)
    pub root_dir: Option<PathBuf>,
    /// Framing settings shared with clients
    pub channel: ChannelConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            root_dir: None,
            channel: ChannelConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ServerError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set the listening address
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the initial working directory
    pub fn with_root_dir(mut self, root: PathBuf) -> Self {
        self.root_dir = Some(root);
        self
    }

    /// Set the per-read buffer size
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.channel.buffer_size = size;
        self
    }

    /// Set the framing mode
    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.channel.framing = framing;
        self
    }

    /// Set the largest accepted message
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.channel.max_message_size = size;
        self
    }

    /// Absolute initial working directory, checked to be a directory
    pub fn resolved_root(&self) -> Result<PathBuf, ServerError> {
        let root = match &self.root_dir {
            Some(root) if root.is_absolute() => root.clone(),
            Some(root) => std::env::current_dir()?.join(root),
            None => std::env::current_dir()?,
        };

        if !root.is_dir() {
            return Err(ServerError::Config(format!(
                "Root directory {} does not exist",
                root.display()
            )));
        }

        Ok(root)
    }
}
