//! Error types for protocol operations

use thiserror::Error;

/// Protocol-specific errors
///
/// Every variant is fatal to the session that raised it: the connection is
/// closed instead of continuing on a stream whose message boundaries are lost.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Stream closed before the delimiter token was observed
    #[error("Truncated message: stream closed with {buffered} bytes buffered and no delimiter")]
    TruncatedMessage {
        /// Bytes accumulated before the stream closed
        buffered: usize,
    },

    /// Accumulated message exceeds the configured limit
    #[error("Message too large: {size} bytes (max: {max})")]
    MessageTooLarge {
        /// Bytes accumulated so far
        size: usize,
        /// Maximum allowed size
        max: usize,
    },

    /// Payload would terminate early because it contains the delimiter
    #[error("Payload contains the session delimiter token at offset {offset}")]
    PayloadContainsToken {
        /// Offset of the first occurrence
        offset: usize,
    },

    /// Length-prefixed unit did not end with the session token
    #[error("Length-prefixed message is not terminated by the session token")]
    TokenMismatch,

    /// Received token does not match `<` + 8 alphanumerics + `>`
    #[error("Invalid delimiter token: {0:?}")]
    InvalidToken(String),

    /// Token/ack exchange did not complete
    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),

    /// Peer closed the stream
    #[error("Stream closed")]
    StreamClosed,

    /// Underlying transport error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProtocolError {
    /// Whether the error means the peer went away rather than misbehaved
    pub fn is_disconnect(&self) -> bool {
        match self {
            Self::StreamClosed => true,
            Self::TruncatedMessage { buffered } => *buffered == 0,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::UnexpectedEof
            ),
            _ => false,
        }
    }
}
