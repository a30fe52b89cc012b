//! # Dirshare
//!
//! Client for browsing and transferring files in a directory served by
//! `dirshare-server`.
//!
//! One [`Client`] drives one connection: it runs the token handshake, then
//! turns each user command into the message exchange the server expects,
//! including the extra payload phase of `ul` and `dl`.
//!
//! ```no_run
//! use dirshare::{Client, ClientConfig};
//!
//! # async fn example() -> dirshare::Result<()> {
//! let mut client = Client::connect(ClientConfig::new().with_addr("127.0.0.1:62214")).await?;
//! println!("{}", client.listing());
//!
//! let report = client.execute("mkdir photos").await?;
//! if let Some(listing) = report.listing {
//!     println!("{}", listing);
//! }
//! client.execute("exit").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub use dirshare_proto as proto;

/// Client configuration
pub mod config;

/// Error types for the client
pub mod error;

/// Per-verb command exchanges
pub mod handlers;

/// Client session state machine
pub mod session;

pub use config::ClientConfig;
pub use error::ClientError;
pub use handlers::{ClientContext, ClientDispatcher, ClientHandler, Completion, Notice};
pub use session::{Client, ClientState, CommandReport};

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;
