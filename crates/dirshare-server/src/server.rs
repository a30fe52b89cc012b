//! Connection acceptor
//!
//! Listens on a TCP address and spawns one independent task per accepted
//! connection. A failing session never affects the others.

use crate::{CommandRouter, ServerConfig, ServerError, ServerSession};
use dirshare_proto::{FileSystem, LocalFs};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

/// Accepts connections and runs a session for each
pub struct Server {
    /// Bound listener
    listener: TcpListener,
    /// Configuration the server was bound with
    config: ServerConfig,
    /// Initial working directory of every session
    root: PathBuf,
    /// Handler table shared by all sessions
    router: Arc<CommandRouter>,
    /// Host filesystem shared by all sessions
    fs: Arc<dyn FileSystem>,
    /// Shutdown signal receiver
    shutdown_rx: Option<oneshot::Receiver<()>>,
    /// Shutdown signal sender (handed out once)
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl Server {
    /// Bind the listener and resolve the root directory
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let root = config.resolved_root()?;
        let listener = TcpListener::bind(config.bind_addr).await?;
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        info!(
            "Listening on {}, root={}",
            listener.local_addr()?,
            root.display()
        );

        Ok(Self {
            listener,
            config,
            root,
            router: Arc::new(CommandRouter::standard()),
            fs: Arc::new(LocalFs),
            shutdown_rx: Some(shutdown_rx),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Replace the filesystem sessions operate on
    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Replace the handler table
    pub fn with_router(mut self, router: CommandRouter) -> Self {
        self.router = Arc::new(router);
        self
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Initial working directory of every session
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get shutdown sender for graceful shutdown
    pub fn shutdown_sender(&mut self) -> Option<oneshot::Sender<()>> {
        self.shutdown_tx.take()
    }

    /// Accept connections until the shutdown signal fires
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn run(mut self) -> Result<(), ServerError> {
        let mut shutdown_rx = self
            .shutdown_rx
            .take()
            .ok_or_else(|| ServerError::Config("shutdown receiver already taken".to_string()))?;

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Received shutdown signal, no longer accepting connections");
                    break;
                }

                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => self.spawn_session(stream, peer),
                        Err(e) => {
                            // accept errors are per-connection (e.g. EMFILE); keep listening
                            warn!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }

        info!("Server stopped");
        Ok(())
    }

    fn spawn_session(&self, stream: tokio::net::TcpStream, peer: SocketAddr) {
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Failed to set TCP_NODELAY for {}: {}", peer, e);
        }

        let (reader, writer) = stream.into_split();
        let session = ServerSession::new(
            reader,
            writer,
            self.root.clone(),
            Arc::clone(&self.fs),
            Arc::clone(&self.router),
            self.config.channel.clone(),
        );
        info!("Accepted connection from {}, session={}", peer, session.id());

        tokio::spawn(async move {
            match session.run().await {
                Ok(summary) => info!(
                    "Session {} from {} ended after {} commands",
                    summary.id, peer, summary.commands_handled
                ),
                Err(e) => error!("Session from {} failed: {}", peer, e),
            }
        });
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("root", &self.root)
            .field("router", &self.router)
            .finish()
    }
}
