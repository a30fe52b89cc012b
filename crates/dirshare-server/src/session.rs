//! Per-connection session state machine
//!
//! ```text
//! Handshaking -> Ready -> { Dispatching -> Ready }* -> Closed
//! ```
//!
//! Every state has a defined successor for every input: a malformed command
//! goes back to `Ready` with the unchanged listing, and any protocol failure
//! goes to `Closed`.

use crate::handlers::{Outcome, SessionContext};
use crate::{CommandRouter, ServerError};
use dirshare_proto::{Channel, ChannelConfig, Command, FileSystem, ProtocolError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Session status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// Token not yet exchanged
    Handshaking,
    /// Waiting for the next command
    Ready,
    /// Running the handler for a received command
    Dispatching(Command),
    /// Connection closed; terminal
    Closed,
}

/// What a finished session did
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Session identifier
    pub id: Uuid,
    /// Commands dispatched, malformed ones excluded
    pub commands_handled: u64,
    /// Working directory when the session closed
    pub final_cwd: Option<PathBuf>,
}

/// One connection from accept to close
pub struct ServerSession<R, W> {
    /// Unique session ID
    id: Uuid,
    /// Current state
    state: SessionState,
    /// Raw stream halves, consumed by the handshake
    io: Option<(R, W)>,
    /// Handler-visible state, present once the handshake is done
    context: Option<SessionContext>,
    /// Initial working directory
    root: PathBuf,
    /// Host filesystem
    fs: Arc<dyn FileSystem>,
    /// Handler table
    router: Arc<CommandRouter>,
    /// Framing settings
    config: ChannelConfig,
    /// Commands dispatched so far
    commands_handled: u64,
    /// Failure that closed the session, if any
    failure: Option<ProtocolError>,
}

impl<R, W> ServerSession<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Create a session over a freshly accepted stream
    pub fn new(
        reader: R,
        writer: W,
        root: PathBuf,
        fs: Arc<dyn FileSystem>,
        router: Arc<CommandRouter>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Handshaking,
            io: Some((reader, writer)),
            context: None,
            root,
            fs,
            router,
            config,
            commands_handled: 0,
            failure: None,
        }
    }

    /// Get session ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Get the current state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Current working directory, once the handshake is done
    pub fn cwd(&self) -> Option<&Path> {
        self.context.as_ref().map(|ctx| ctx.cwd.as_path())
    }

    /// Drive the session until it is closed
    ///
    /// A peer that disconnects counts as a normal end; any other protocol
    /// failure is returned after the connection has been closed.
    pub async fn run(mut self) -> Result<SessionSummary, ServerError> {
        let span = info_span!("session", id = %self.id);
        async move {
            while self.state != SessionState::Closed {
                self.step().await;
            }

            match self.failure.take() {
                Some(e) if !e.is_disconnect() => Err(ServerError::Protocol(e)),
                _ => Ok(SessionSummary {
                    id: self.id,
                    commands_handled: self.commands_handled,
                    final_cwd: self.cwd().map(Path::to_path_buf),
                }),
            }
        }
        .instrument(span)
        .await
    }

    /// Perform one transition and return the new state
    pub async fn step(&mut self) -> &SessionState {
        let current = std::mem::replace(&mut self.state, SessionState::Closed);
        let was_open = current != SessionState::Closed;

        let next = match self.advance(current).await {
            Ok(next) => next,
            Err(e) => {
                if e.is_disconnect() {
                    info!("Peer disconnected");
                } else {
                    error!("Session failed: {}", e);
                }
                self.failure = Some(e);
                SessionState::Closed
            }
        };

        if was_open && next == SessionState::Closed {
            self.close().await;
        }

        self.state = next;
        &self.state
    }

    async fn advance(&mut self, state: SessionState) -> Result<SessionState, ProtocolError> {
        match state {
            SessionState::Handshaking => {
                let (reader, writer) = self.io.take().ok_or_else(|| {
                    ProtocolError::HandshakeFailed("stream already consumed".to_string())
                })?;
                let channel = Channel::accept(reader, writer, &self.config).await?;
                info!("Handshake complete, token={}", channel.token());

                let mut context =
                    SessionContext::new(self.id, self.root.clone(), channel, self.fs.clone());
                context.send_listing().await?;
                self.context = Some(context);
                Ok(SessionState::Ready)
            }

            SessionState::Ready => {
                let context = self.context.as_mut().ok_or(ProtocolError::StreamClosed)?;
                let message = context.channel.receive().await?;
                let line = String::from_utf8_lossy(&message);

                match Command::parse(&line) {
                    Ok(command) => Ok(SessionState::Dispatching(command)),
                    Err(e) => {
                        warn!("Ignoring malformed command {:?}: {}", line, e);
                        context.send_listing().await?;
                        Ok(SessionState::Ready)
                    }
                }
            }

            SessionState::Dispatching(command) => {
                self.commands_handled += 1;
                let router = Arc::clone(&self.router);
                let context = self.context.as_mut().ok_or(ProtocolError::StreamClosed)?;

                match router.dispatch(context, &command).await? {
                    Outcome::Close => Ok(SessionState::Closed),
                    Outcome::Continue => {
                        context.send_listing().await?;
                        Ok(SessionState::Ready)
                    }
                }
            }

            SessionState::Closed => Ok(SessionState::Closed),
        }
    }

    async fn close(&mut self) {
        if let Some(context) = self.context.as_mut() {
            if let Err(e) = context.channel.close().await {
                debug!("Error shutting down stream: {}", e);
            }
        }
        // dropping the raw halves closes a stream that never finished the handshake
        self.io = None;
        info!("Session closed after {} commands", self.commands_handled);
    }
}

#[cfg(test)]
mod tests;
