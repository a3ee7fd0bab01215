use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpdaterError {
    #[error("Path not found: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Purge of {path} failed after {attempts} attempts: {reason}")]
    PurgeFailed {
        path: PathBuf,
        attempts: u32,
        reason: String,
    },

    #[error("Extract of {path} failed: {reason}")]
    ExtractFailed { path: PathBuf, reason: String },

    #[error("Restore of {backup} to {target} failed: {reason}")]
    RestoreFailed {
        backup: PathBuf,
        target: PathBuf,
        reason: String,
    },

    #[error("Failed to launch {path}: {reason}")]
    LaunchFailed { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, UpdaterError>;
