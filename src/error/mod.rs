//! Error types and Result aliases for medialib.
//!
//! This module defines the error hierarchy used throughout the crate.
//! All public functions return `Result<T, Error>` or `Result<T>`.
//!
//! File-level failures during a scan are never surfaced to the caller of
//! [`crate::library::LocalLibrary::scan`]; they are logged and counted.
//! These types describe what went wrong for a single operation.

use thiserror::Error;

/// Result type alias using medialib's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for medialib operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Catalog storage error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Metadata extraction error.
    #[error("metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// File watching error.
    #[error("watcher error: {0}")]
    Watcher(#[from] WatcherError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// `SQLite` database error.
    #[error("database error: {0}")]
    Database(String),

    /// Record not found.
    #[error("not found: {entity} with id '{id}'")]
    NotFound { entity: &'static str, id: String },

    /// Schema migration error.
    #[error("migration error: {0}")]
    Migration(String),
}

/// Metadata extraction errors.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// The file could not be opened or parsed.
    #[error("cannot read '{path}': {reason}")]
    Unreadable { path: String, reason: String },

    /// The file is not a recognised audio file.
    #[error("'{0}' is not a supported audio file")]
    Unsupported(String),
}

/// File watcher errors.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Failed to watch path.
    #[error("failed to watch path '{path}': {reason}")]
    WatchFailed { path: String, reason: String },

    /// The change notification backend could not be started.
    #[error("failed to start watcher: {0}")]
    Init(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl StorageError {
    /// Create a not-found error.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

impl MetadataError {
    /// Create an unreadable-file error.
    pub fn unreadable(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Unreadable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}
