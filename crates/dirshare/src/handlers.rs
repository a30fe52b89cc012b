//! Per-verb command exchanges
//!
//! Each handler performs everything between the user entering a command and
//! the server's listing arriving: sending the command message and, for
//! `ul` and `dl`, the payload phase that [`Verb::phase`] assigns to the verb.

use crate::ClientError;
use async_trait::async_trait;
use dirshare_proto::{
    Channel, Command, FileSystem, FsError, ProtocolError, TransferPhase, Verb, BLANK_FILE_ACK,
    DOWNLOAD_ACK,
};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Local diagnostic shown to the user; never sent to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Blank input line
    EmptyInput,
    /// First word is not a command
    InvalidCommand(String),
    /// Command needs an argument
    MissingArgument(Verb),
    /// Upload source does not exist or cannot be read
    LocalFileNotFound(PathBuf),
    /// Server had nothing to send for a download
    RemoteFileNotFound(String),
    /// Upload source contains the session token and cannot be framed
    PayloadContainsToken(PathBuf),
    /// Upload source exceeds the message size limit
    FileTooLarge {
        /// Upload source
        path: PathBuf,
        /// Its size
        size: usize,
        /// Largest payload allowed
        max: usize,
    },
    /// Download could not be stored locally
    LocalWriteFailed(PathBuf),
    /// Download stored
    Downloaded {
        /// Where it was written
        path: PathBuf,
        /// Bytes written
        size: usize,
    },
    /// Upload sent
    Uploaded {
        /// Remote name
        name: String,
        /// Bytes sent
        size: usize,
    },
    /// Session ended by `exit`
    Exiting,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::EmptyInput => write!(f, "Please enter any command"),
            Notice::InvalidCommand(word) => write!(f, "Please enter any valid command ({})", word),
            Notice::MissingArgument(verb) => write!(f, "{} needs an argument", verb),
            Notice::LocalFileNotFound(path) => {
                write!(f, "No such file or directory: {}", path.display())
            }
            Notice::RemoteFileNotFound(name) => write!(f, "No such file or directory: {}", name),
            Notice::PayloadContainsToken(path) => write!(
                f,
                "{} contains the session token and cannot be uploaded",
                path.display()
            ),
            Notice::FileTooLarge { path, size, max } => write!(
                f,
                "{} is too large to upload ({} bytes, limit {})",
                path.display(),
                size,
                max
            ),
            Notice::LocalWriteFailed(path) => write!(f, "Could not write {}", path.display()),
            Notice::Downloaded { path, size } => {
                write!(f, "Downloaded {} ({} bytes)", path.display(), size)
            }
            Notice::Uploaded { name, size } => write!(f, "Uploaded {} ({} bytes)", name, size),
            Notice::Exiting => write!(f, "Exiting the application."),
        }
    }
}

/// How a command exchange ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Command (and payload) sent; the server's listing comes next
    AwaitListing(Option<Notice>),
    /// Nothing was sent; the session is unchanged
    Aborted(Notice),
    /// Session is over; nothing comes back
    Closed(Notice),
}

/// What a handler may use
pub struct ClientContext<'a> {
    /// Framed channel to the server
    pub channel: &'a mut Channel,
    /// Local filesystem
    pub fs: &'a dyn FileSystem,
    /// Directory uploads are read from and downloads written to
    pub local_dir: &'a Path,
}

/// Handler trait for one command verb on the client side
#[async_trait]
pub trait ClientHandler: Send + Sync {
    /// Run the exchange for `command`, stopping before the listing
    async fn run(&self, ctx: ClientContext<'_>, command: &Command) -> Result<Completion, ClientError>;
}

/// `cd`, `mkdir`, `rm`: the command message alone
pub struct PlainHandler;

#[async_trait]
impl ClientHandler for PlainHandler {
    async fn run(&self, ctx: ClientContext<'_>, command: &Command) -> Result<Completion, ClientError> {
        ctx.channel.send(command.to_line().as_bytes()).await?;
        Ok(Completion::AwaitListing(None))
    }
}

/// `ul`: command message, then the file bytes as a second message
///
/// The file is read and checked first, so a server never waits for a
/// payload that is not coming.
pub struct UploadHandler;

#[async_trait]
impl ClientHandler for UploadHandler {
    async fn run(&self, ctx: ClientContext<'_>, command: &Command) -> Result<Completion, ClientError> {
        let path = ctx.local_dir.join(&command.arg);

        let contents = match ctx.fs.read_file(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                if !matches!(e, FsError::NotFound) {
                    warn!("Cannot read {:?}: {}", path, e);
                }
                return Ok(Completion::Aborted(Notice::LocalFileNotFound(path)));
            }
        };

        match ctx.channel.codec().can_frame(&contents) {
            Ok(()) => {}
            Err(ProtocolError::PayloadContainsToken { offset }) => {
                debug!("Token found in {:?} at offset {}", path, offset);
                return Ok(Completion::Aborted(Notice::PayloadContainsToken(path)));
            }
            Err(ProtocolError::MessageTooLarge { size, max }) => {
                return Ok(Completion::Aborted(Notice::FileTooLarge { path, size, max }));
            }
            Err(e) => return Err(e.into()),
        }

        ctx.channel.send(command.to_line().as_bytes()).await?;
        ctx.channel.send(&contents).await?;
        debug!("Uploaded {:?} ({} bytes)", path, contents.len());

        Ok(Completion::AwaitListing(Some(Notice::Uploaded {
            name: command.arg.clone(),
            size: contents.len(),
        })))
    }
}

/// `dl`: command message, receive the file bytes, acknowledge
///
/// An empty payload means the server had nothing to send.
pub struct DownloadHandler;

#[async_trait]
impl ClientHandler for DownloadHandler {
    async fn run(&self, ctx: ClientContext<'_>, command: &Command) -> Result<Completion, ClientError> {
        ctx.channel.send(command.to_line().as_bytes()).await?;
        let contents = ctx.channel.receive().await?;

        if contents.is_empty() {
            ctx.channel.send(BLANK_FILE_ACK.as_bytes()).await?;
            return Ok(Completion::AwaitListing(Some(Notice::RemoteFileNotFound(
                command.arg.clone(),
            ))));
        }

        // keep only the last component so a download never lands outside local_dir
        let notice = match Path::new(&command.arg).file_name() {
            Some(name) => {
                let path = ctx.local_dir.join(name);
                match ctx.fs.write_file(&path, &contents).await {
                    Ok(()) => Notice::Downloaded {
                        path,
                        size: contents.len(),
                    },
                    Err(e) => {
                        warn!("Cannot write {:?}: {}", path, e);
                        Notice::LocalWriteFailed(path)
                    }
                }
            }
            None => Notice::LocalWriteFailed(ctx.local_dir.join(&command.arg)),
        };

        // the server waits for an ack either way
        ctx.channel.send_raw(DOWNLOAD_ACK.as_bytes()).await?;
        Ok(Completion::AwaitListing(Some(notice)))
    }
}

/// `exit`: send the command and stop without waiting for a reply
pub struct ExitHandler;

#[async_trait]
impl ClientHandler for ExitHandler {
    async fn run(&self, ctx: ClientContext<'_>, command: &Command) -> Result<Completion, ClientError> {
        ctx.channel.send(command.to_line().as_bytes()).await?;
        Ok(Completion::Closed(Notice::Exiting))
    }
}

/// Verb-keyed handler table
#[derive(Clone, Default)]
pub struct ClientDispatcher {
    /// Registered handlers by verb
    handlers: HashMap<Verb, Arc<dyn ClientHandler>>,
}

impl ClientDispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Dispatcher with the handler each verb's transfer phase calls for
    pub fn standard() -> Self {
        let mut dispatcher = Self::new();
        for verb in Verb::ALL {
            let handler: Arc<dyn ClientHandler> = match verb.phase() {
                TransferPhase::None => Arc::new(PlainHandler),
                TransferPhase::Upload => Arc::new(UploadHandler),
                TransferPhase::Download => Arc::new(DownloadHandler),
                TransferPhase::Terminate => Arc::new(ExitHandler),
            };
            dispatcher.register(verb, handler);
        }
        dispatcher
    }

    /// Register (or replace) the handler for a verb
    pub fn register(&mut self, verb: Verb, handler: Arc<dyn ClientHandler>) {
        self.handlers.insert(verb, handler);
    }

    /// Handler for a verb
    pub fn get(&self, verb: Verb) -> Option<Arc<dyn ClientHandler>> {
        self.handlers.get(&verb).cloned()
    }
}

impl fmt::Debug for ClientDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut verbs: Vec<_> = self.handlers.keys().map(|v| v.as_str()).collect();
        verbs.sort_unstable();
        f.debug_struct("ClientDispatcher").field("verbs", &verbs).finish()
    }
}
