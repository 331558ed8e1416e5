//! Local filesystem read helpers.
//!
//! The corpus is an immutable, read-only input: the only storage operation
//! the engine needs is "give me the whole file as bytes". This module keeps
//! that one operation in a single place and classifies failures so callers
//! can distinguish a missing instance file from any other I/O problem.

use std::{
    io,
    path::{Path, PathBuf},
};

use snafu::{Backtrace, prelude::*};
use tokio::fs;

/// General result type used by storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while reading corpus files.
#[derive(Debug, Snafu)]
pub enum StorageError {
    /// The specified path was not found (or is not a regular file).
    #[snafu(display("Path not found: {}", path.display()))]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
        /// Underlying I/O error that caused the failure.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },

    /// An I/O error occurred on the local filesystem.
    #[snafu(display("I/O error at {}: {source}", path.display()))]
    OtherIo {
        /// The path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error with platform-specific details.
        source: io::Error,
        /// The backtrace at the time the error occurred.
        backtrace: Backtrace,
    },
}

/// Read the full contents of the file at `path` as a `Vec<u8>`.
///
/// A missing file maps to [`StorageError::NotFound`]; every other filesystem
/// problem maps to [`StorageError::OtherIo`].
pub async fn read_all_bytes(path: &Path) -> StorageResult<Vec<u8>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(e).context(NotFoundSnafu { path }),
        Err(e) => Err(e).context(OtherIoSnafu { path }),
    }
}
