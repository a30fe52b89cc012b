//! Error types for the client

use dirshare_proto::ProtocolError;
use thiserror::Error;

/// Main error type for client operations
///
/// Local problems a user can fix (bad input, missing files) are not errors;
/// they come back as [`Notice`](crate::Notice)s and the session stays usable.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Framing or handshake failure; the session is closed
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Connection errors
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Command issued after the session closed
    #[error("Session is closed")]
    Closed,
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_converts() {
        let err: ClientError = ProtocolError::StreamClosed.into();
        assert!(matches!(err, ClientError::Protocol(ProtocolError::StreamClosed)));
    }

    #[test]
    fn test_json_error_converts() {
        let err: ClientError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(err.to_string().starts_with("Serialization error: JSON error"));
    }
}
