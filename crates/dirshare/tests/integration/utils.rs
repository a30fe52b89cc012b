//! Utility functions for integration tests

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Bytes covering every value, repeated to `len`
pub fn binary_pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 256) as u8).collect()
}

/// Write `contents` to `dir/name` and return the path
pub fn write_file(dir: &Path, name: &str, contents: &[u8]) -> Result<PathBuf> {
    let path = dir.join(name);
    fs::write(&path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// First line of a listing
pub fn header(listing: &str) -> &str {
    listing.lines().next().unwrap_or_default()
}

/// Entry names shown in a listing, in order
pub fn entries(listing: &str) -> Vec<&str> {
    listing
        .lines()
        .filter_map(|line| line.strip_prefix("-- "))
        .collect()
}
