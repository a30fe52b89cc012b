//! Client session state machine
//!
//! The client mirrors the server one command at a time: send the command,
//! run the verb's payload phase, then read the listing the server sends
//! back. `exit` skips the last step and closes the session.

use crate::handlers::{ClientContext, ClientDispatcher, Completion, Notice};
use crate::{ClientConfig, ClientError, Result};
use dirshare_proto::{Channel, Command, CommandError, DelimiterToken, FileSystem, LocalFs, Verb};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, info};

/// Client session status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Handshake done; commands may be issued
    Ready,
    /// Session ended by `exit` or by a protocol failure
    Closed,
}

/// Result of one user command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandReport {
    /// Listing sent by the server after the command, if one was expected
    pub listing: Option<String>,
    /// Local diagnostic for the user
    pub notice: Option<Notice>,
}

impl CommandReport {
    fn notice(notice: Notice) -> Self {
        Self {
            listing: None,
            notice: Some(notice),
        }
    }
}

/// A connected client session
pub struct Client {
    /// Framed channel to the server
    channel: Channel,
    /// Current state
    state: ClientState,
    /// Client configuration
    config: ClientConfig,
    /// Handler table
    dispatcher: ClientDispatcher,
    /// Local filesystem for transfers
    fs: Arc<dyn FileSystem>,
    /// Most recent listing received
    listing: String,
}

impl Client {
    /// Connect over TCP, run the handshake and read the first listing
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        info!("Connecting to {}", config.addr);
        let stream = TcpStream::connect(&config.addr)
            .await
            .map_err(|e| ClientError::Connection(format!("{}: {}", config.addr, e)))?;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        Self::from_io(reader, writer, config).await
    }

    /// Run the handshake over an already connected stream
    pub async fn from_io<R, W>(reader: R, writer: W, config: ClientConfig) -> Result<Self>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut channel = Channel::connect(reader, writer, &config.channel).await?;
        info!("Handshake complete, token={}", channel.token());

        let listing = channel.receive().await?;
        Ok(Self {
            channel,
            state: ClientState::Ready,
            config,
            dispatcher: ClientDispatcher::standard(),
            fs: Arc::new(LocalFs),
            listing: String::from_utf8_lossy(&listing).into_owned(),
        })
    }

    /// Replace the local filesystem used for transfers
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the handler table
    pub fn with_dispatcher(mut self, dispatcher: ClientDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// Get the current state
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// The negotiated token
    pub fn token(&self) -> DelimiterToken {
        self.channel.token()
    }

    /// Most recent listing from the server
    pub fn listing(&self) -> &str {
        &self.listing
    }

    /// Directory transfers are read from and written to
    pub fn local_dir(&self) -> &Path {
        &self.config.local_dir
    }

    /// Run one line of user input
    ///
    /// Bad input and missing files come back as a [`Notice`] with nothing
    /// sent. A protocol failure closes the session and is returned as an
    /// error.
    pub async fn execute(&mut self, line: &str) -> Result<CommandReport> {
        if self.state == ClientState::Closed {
            return Err(ClientError::Closed);
        }

        let command = match Command::parse_lenient(line) {
            Ok(command) => command,
            Err(CommandError::Empty) => return Ok(CommandReport::notice(Notice::EmptyInput)),
            Err(CommandError::UnknownVerb(word)) => {
                return Ok(CommandReport::notice(Notice::InvalidCommand(word)))
            }
            Err(CommandError::MissingArgument(verb)) => {
                return Ok(CommandReport::notice(Notice::MissingArgument(verb)))
            }
        };

        match self.run(&command).await {
            Ok(report) => Ok(report),
            Err(e) => {
                self.state = ClientState::Closed;
                Err(e)
            }
        }
    }

    /// Send `exit` unless the session is already closed
    pub async fn close(&mut self) -> Result<()> {
        if self.state == ClientState::Ready {
            self.run(&Command::new(Verb::Exit, "")).await?;
        }
        Ok(())
    }

    async fn run(&mut self, command: &Command) -> Result<CommandReport> {
        let handler = match self.dispatcher.get(command.verb) {
            Some(handler) => handler,
            None => {
                return Ok(CommandReport::notice(Notice::InvalidCommand(
                    command.verb.to_string(),
                )))
            }
        };

        debug!("Issuing: {}", command);
        let ctx = ClientContext {
            channel: &mut self.channel,
            fs: self.fs.as_ref(),
            local_dir: &self.config.local_dir,
        };

        match handler.run(ctx, command).await? {
            Completion::AwaitListing(notice) => {
                let listing = self.channel.receive().await?;
                self.listing = String::from_utf8_lossy(&listing).into_owned();
                Ok(CommandReport {
                    listing: Some(self.listing.clone()),
                    notice,
                })
            }
            Completion::Aborted(notice) => Ok(CommandReport::notice(notice)),
            Completion::Closed(notice) => {
                self.state = ClientState::Closed;
                if let Err(e) = self.channel.close().await {
                    debug!("Error shutting down stream: {}", e);
                }
                info!("Session closed");
                Ok(CommandReport::notice(notice))
            }
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state)
            .field("addr", &self.config.addr)
            .field("channel", &self.channel)
            .finish()
    }
}
