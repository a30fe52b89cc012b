//! Client configuration

use crate::ClientError;
use dirshare_proto::{ChannelConfig, Framing, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Client configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server address, `host:port`
    pub addr: String,
    /// Where uploads are read from and downloads are written to
    pub local_dir: PathBuf,
    /// Framing settings; must match the server
    pub channel: ChannelConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            addr: format!("127.0.0.1:{}", DEFAULT_PORT),
            local_dir: PathBuf::from("."),
            channel: ChannelConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON configuration file; missing fields take defaults
    pub fn from_json_file(path: &Path) -> Result<Self, ClientError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set the server address
    pub fn with_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    /// Set the local transfer directory
    pub fn with_local_dir(mut self, dir: PathBuf) -> Self {
        self.local_dir = dir;
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
}
