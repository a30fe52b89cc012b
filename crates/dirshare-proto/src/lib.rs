//! # Dirshare Protocol
//!
//! Wire protocol shared by the dirshare server and client: per-session
//! delimiter tokens, message framing over an unstructured byte stream,
//! the command table and the filesystem capability interface.

#![warn(missing_docs)]

/// Per-session delimiter token
pub mod token;

/// Message codec for async streams
pub mod codec;

/// Raw token-then-ack exchange that opens every session
pub mod handshake;

/// Framed duplex channel over a connected stream
pub mod channel;

/// Command verbs and parsing
pub mod command;

/// Working-directory description sent after every command
pub mod listing;

/// Filesystem capability interface
pub mod fs;

/// Error types for protocol operations
pub mod error;

pub use token::{DelimiterToken, TOKEN_LEN};
pub use codec::{ChannelConfig, Framing, MessageCodec};
pub use channel::Channel;
pub use command::{Command, CommandError, TransferPhase, Verb, BLANK_FILE_ACK, DOWNLOAD_ACK};
pub use listing::DirectoryListing;
pub use fs::{EntryKind, FileSystem, FsError, LocalFs};
pub use error::ProtocolError;

/// Port the server listens on and the client dials by default
pub const DEFAULT_PORT: u16 = 62214;
