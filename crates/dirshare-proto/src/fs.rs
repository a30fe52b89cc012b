//! Filesystem capability interface
//!
//! Handlers on both ends touch the host filesystem only through
//! [`FileSystem`]. Nothing here serializes access across sessions; two
//! sessions working on the same paths race like any two processes would.

use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::Path;
use thiserror::Error;
use tokio::fs;

/// Filesystem failure, recovered locally by the handler that hit it
#[derive(Debug, Error)]
pub enum FsError {
    /// Path does not exist
    #[error("No such file or directory")]
    NotFound,

    /// Path already exists
    #[error("File already exists")]
    AlreadyExists,

    /// Operation not permitted
    #[error("Permission denied")]
    PermissionDenied,

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl From<io::Error> for FsError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::AlreadyExists => Self::AlreadyExists,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            _ => Self::Io(err),
        }
    }
}

/// What a path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file (or anything that is not a directory)
    File,
    /// Directory
    Dir,
}

/// Narrow filesystem interface used by command handlers
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Names of subdirectories and files directly under `path`
    async fn list_entries(&self, path: &Path) -> Result<(Vec<String>, Vec<String>), FsError>;

    /// Create one directory
    async fn create_dir(&self, path: &Path) -> Result<(), FsError>;

    /// Delete a file, or a directory with everything under it
    async fn remove(&self, path: &Path) -> Result<(), FsError>;

    /// Whole contents of a file
    async fn read_file(&self, path: &Path) -> Result<Bytes, FsError>;

    /// Create or overwrite a file
    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError>;

    /// Kind of entry at `path`, `None` if nothing is there
    async fn kind(&self, path: &Path) -> Option<EntryKind>;
}

/// Host filesystem through `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

#[async_trait]
impl FileSystem for LocalFs {
    async fn list_entries(&self, path: &Path) -> Result<(Vec<String>, Vec<String>), FsError> {
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        let mut dir = fs::read_dir(path).await?;
        while let Some(entry) = dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            // follows symlinks, so a link to a directory lists as a directory
            match fs::metadata(entry.path()).await {
                Ok(metadata) if metadata.is_dir() => dirs.push(name),
                Ok(metadata) if metadata.is_file() => files.push(name),
                _ => {}
            }
        }

        Ok((dirs, files))
    }

    async fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        fs::create_dir(path).await?;
        Ok(())
    }

    async fn remove(&self, path: &Path) -> Result<(), FsError> {
        match self.kind(path).await {
            Some(EntryKind::Dir) => fs::remove_dir_all(path).await?,
            Some(EntryKind::File) => fs::remove_file(path).await?,
            None => return Err(FsError::NotFound),
        }
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes, FsError> {
        let contents = fs::read(path).await?;
        Ok(Bytes::from(contents))
    }

    async fn write_file(&self, path: &Path, contents: &[u8]) -> Result<(), FsError> {
        fs::write(path, contents).await?;
        Ok(())
    }

    async fn kind(&self, path: &Path) -> Option<EntryKind> {
        let metadata = fs::metadata(path).await.ok()?;
        Some(if metadata.is_dir() { EntryKind::Dir } else { EntryKind::File })
    }
}
