//! Transform errors.
//!
//! Per-file problems are not errors at this level: they become
//! `FileOutcome`s. These cover the job as a whole.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    /// An archive entry would land outside the job directory.
    #[error("Archive entry escapes the extraction directory: {0}")]
    UnsafeEntry(String),

    #[error("Failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Background task failed: {0}")]
    Task(String),
}

impl TransformError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
