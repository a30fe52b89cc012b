//! Working-directory description sent after every command

use std::fmt;

/// Snapshot of one directory, rendered for display on the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryListing {
    /// Directory shown
    pub path: String,
    /// Subdirectory names
    pub dirs: Vec<String>,
    /// File names
    pub files: Vec<String>,
}

impl DirectoryListing {
    /// Build a listing; entry names are sorted
    pub fn new(path: impl Into<String>, mut dirs: Vec<String>, mut files: Vec<String>) -> Self {
        dirs.sort();
        files.sort();
        Self {
            path: path.into(),
            dirs,
            files,
        }
    }

    /// Listing of a directory that could not be read
    pub fn unreadable(path: impl Into<String>) -> Self {
        Self::new(path, Vec::new(), Vec::new())
    }

    /// Rendered text
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for DirectoryListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Current Directory: {}:\n|", self.path)?;
        for name in self.dirs.iter().chain(&self.files) {
            write!(f, "\n-- {}", name)?;
        }
        Ok(())
    }
}
