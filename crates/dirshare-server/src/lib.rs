//! # Dirshare Server
//!
//! Accepts connections and drives one session per connection: handshake,
//! then command/response cycles until `exit` or disconnect.

#![warn(missing_docs)]

/// Server configuration
pub mod config;

/// Error types for the server
pub mod error;

/// Command handlers and per-session context
pub mod handlers;

/// Verb-keyed handler table
pub mod router;

/// Per-connection session state machine
pub mod session;

/// Connection acceptor
pub mod server;

pub use config::ServerConfig;
pub use error::ServerError;
pub use handlers::{Handler, Outcome, SessionContext};
pub use router::CommandRouter;
pub use session::{ServerSession, SessionState, SessionSummary};
pub use server::Server;
