//! Command handlers and per-session context
//!
//! Filesystem failures stop at the handler: they are logged on the server
//! and the session carries on. Only transport failures are returned.

use async_trait::async_trait;
use bytes::Bytes;
use dirshare_proto::{Channel, DirectoryListing, EntryKind, FileSystem, FsError, ProtocolError};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// What the session does after a handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Send the listing and wait for the next command
    Continue,
    /// Close the connection without a reply
    Close,
}

/// State a handler may read and mutate
pub struct SessionContext {
    /// Session identifier, for logs
    pub id: Uuid,
    /// Current working directory
    pub cwd: PathBuf,
    /// Framed channel to the client
    pub channel: Channel,
    /// Host filesystem
    pub fs: Arc<dyn FileSystem>,
}

impl SessionContext {
    /// Create a context rooted at `cwd`
    pub fn new(id: Uuid, cwd: PathBuf, channel: Channel, fs: Arc<dyn FileSystem>) -> Self {
        Self { id, cwd, channel, fs }
    }

    /// `arg` joined onto the working directory
    pub fn resolve(&self, arg: &str) -> PathBuf {
        self.cwd.join(arg)
    }

    /// Send the working-directory description as one framed message
    pub async fn send_listing(&mut self) -> Result<(), ProtocolError> {
        let listing = describe(self.fs.as_ref(), &self.cwd).await;
        self.channel.send(listing.render().as_bytes()).await
    }
}

/// Listing of `dir`; an unreadable directory is shown empty
pub async fn describe(fs: &dyn FileSystem, dir: &Path) -> DirectoryListing {
    let path = dir.display().to_string();
    match fs.list_entries(dir).await {
        Ok((dirs, files)) => DirectoryListing::new(path, dirs, files),
        Err(e) => {
            warn!("Cannot list {}: {}", path, e);
            DirectoryListing::unreadable(path)
        }
    }
}

/// Handler trait for processing one command verb
#[async_trait]
pub trait Handler: Send + Sync {
    /// Run the command with its argument against the session
    async fn handle(&self, session: &mut SessionContext, arg: &str) -> Result<Outcome, ProtocolError>;
}

/// `cd`: adopt the target if it is an existing directory, otherwise stay put
pub struct CdHandler;

#[async_trait]
impl Handler for CdHandler {
    async fn handle(&self, session: &mut SessionContext, arg: &str) -> Result<Outcome, ProtocolError> {
        let target = match arg {
            // parent of the root is the root
            ".." => session
                .cwd
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| session.cwd.clone()),
            "." => session.cwd.clone(),
            _ => session.resolve(arg),
        };

        if session.fs.kind(&target).await == Some(EntryKind::Dir) {
            debug!("Changing directory: {:?} -> {:?}", session.cwd, target);
            session.cwd = target;
        } else {
            debug!("Not a directory, keeping cwd: {:?}", target);
        }

        Ok(Outcome::Continue)
    }
}

/// `mkdir`: create a subdirectory of the working directory
pub struct MkdirHandler;

#[async_trait]
impl Handler for MkdirHandler {
    async fn handle(&self, session: &mut SessionContext, arg: &str) -> Result<Outcome, ProtocolError> {
        let path = session.resolve(arg);
        match session.fs.create_dir(&path).await {
            Ok(()) => debug!("Created directory: {:?}", path),
            Err(FsError::AlreadyExists) => warn!("File already exists: {:?}", path),
            Err(e) => warn!("Cannot create {:?}: {}", path, e),
        }
        Ok(Outcome::Continue)
    }
}

/// `rm`: delete a file or a whole directory tree
pub struct RmHandler;

#[async_trait]
impl Handler for RmHandler {
    async fn handle(&self, session: &mut SessionContext, arg: &str) -> Result<Outcome, ProtocolError> {
        let path = session.resolve(arg);
        match session.fs.remove(&path).await {
            Ok(()) => debug!("Removed: {:?}", path),
            Err(FsError::NotFound) => warn!("Path can not be removed, nothing there: {:?}", path),
            Err(e) => warn!("Cannot remove {:?}: {}", path, e),
        }
        Ok(Outcome::Continue)
    }
}

/// `ul`: receive one framed payload and store it under the given name
pub struct UploadHandler;

#[async_trait]
impl Handler for UploadHandler {
    async fn handle(&self, session: &mut SessionContext, arg: &str) -> Result<Outcome, ProtocolError> {
        let contents = session.channel.receive().await?;
        let path = session.resolve(arg);

        match session.fs.write_file(&path, &contents).await {
            Ok(()) => debug!("Stored upload: {:?} ({} bytes)", path, contents.len()),
            Err(e) => warn!("Cannot write upload {:?}: {}", path, e),
        }
        Ok(Outcome::Continue)
    }
}

/// `dl`: send the file as one framed payload, then wait for the raw ack
///
/// Anything that cannot be sent (missing, unreadable, or in delimited mode
/// containing the token) goes out as an empty payload, which the client
/// reports as a missing file.
pub struct DownloadHandler;

#[async_trait]
impl Handler for DownloadHandler {
    async fn handle(&self, session: &mut SessionContext, arg: &str) -> Result<Outcome, ProtocolError> {
        let path = session.resolve(arg);

        let contents = match session.fs.read_file(&path).await {
            Ok(contents) => match session.channel.codec().can_frame(&contents) {
                Ok(()) => contents,
                Err(e) => {
                    warn!("Cannot send {:?}: {}", path, e);
                    Bytes::new()
                }
            },
            Err(e) => {
                warn!("Cannot read {:?}: {}", path, e);
                Bytes::new()
            }
        };

        session.channel.send(&contents).await?;
        let ack = session.channel.receive_raw().await?;
        debug!(
            "Download of {:?} acknowledged: {:?}",
            path,
            String::from_utf8_lossy(&ack)
        );

        Ok(Outcome::Continue)
    }
}

/// `exit`: end the session
pub struct ExitHandler;

#[async_trait]
impl Handler for ExitHandler {
    async fn handle(&self, session: &mut SessionContext, _arg: &str) -> Result<Outcome, ProtocolError> {
        debug!("Client requested exit: session={}", session.id);
        Ok(Outcome::Close)
    }
}
