//! Archive packaging
//!
//! Turns a job's output directory into a single downloadable file. Entries
//! are stored relative to the directory root, with no enclosing folder.

mod zip;

pub use self::zip::ZipArchiver;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while packaging an output directory
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Output directory {0} does not exist")]
    MissingSource(PathBuf),

    #[error("Output directory {0} has no usable file name")]
    UnnamedSource(PathBuf),

    #[error("IO error while archiving: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write archive: {0}")]
    Zip(#[from] ::zip::result::ZipError),

    #[error("Archive task aborted: {0}")]
    Aborted(String),
}

/// Packages a directory tree into one file
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Archives everything under `source`
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Location of the written archive
    /// * `Err(ArchiveError)` - The archive could not be produced
    async fn package(&self, source: &Path) -> Result<PathBuf, ArchiveError>;
}
