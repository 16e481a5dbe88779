//! Error types for autoprint.

use thiserror::Error;

/// Result type alias for autoprint operations.
pub type Result<T> = std::result::Result<T, WatcherError>;

/// Errors that can occur while watching and printing.
#[derive(Error, Debug)]
pub enum WatcherError {
    /// Directory not found.
    #[error("directory not found: {0}")]
    DirectoryNotFound(String),

    /// No watch configuration with the given id.
    #[error("watch configuration not found: {0}")]
    UnknownConfiguration(uuid::Uuid),

    /// The print utility could not be run.
    #[error("print dispatch failed: {0}")]
    Dispatch(String),

    /// Storage operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to create the state directory.
    #[error("failed to create directory: {0}")]
    CreateDirectory(String),

    /// Failed to read a state file.
    #[error("failed to read file: {0}")]
    ReadFile(String),

    /// Failed to write a state file.
    #[error("failed to write file: {0}")]
    WriteFile(String),
}
