//! Error types for weatherdash-store.

use std::path::PathBuf;

use weatherdash_types::ValidationError;

/// Result type for weatherdash-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in weatherdash-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Database error from SQLite.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failed to create database directory.
    #[error("Failed to create database directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A record failed ingestion checks.
    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),

    /// A query argument (range bounds, page, limit) was rejected.
    #[error("Invalid argument: {0}")]
    InvalidArgument(ValidationError),

    /// Serialization error for the raw payload.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
