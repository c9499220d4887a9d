//! Error types for Fastlane.

use thiserror::Error;

/// Common error type for Fastlane.
#[derive(Error, Debug)]
pub enum FastlaneError {
    /// No share with the given identifier.
    #[error("share {0} not found")]
    NotFound(String),

    /// The share exists but its lifetime has elapsed.
    #[error("share {0} has expired")]
    Expired(String),

    /// The source file could not be found at create time.
    #[error("source file unavailable: {0}")]
    SourceUnavailable(String),

    /// Invalid user input (e.g. a non-positive lifetime).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Copying the source into the blob directory failed.
    ///
    /// No record is registered when this is returned.
    #[error("failed to copy file: {0}")]
    CopyFailed(String),

    /// A live record points at a blob that cannot be read.
    #[error("blob missing for share {0}")]
    BlobMissing(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record store error (serialization or durable write).
    #[error("record store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for FastlaneError {
    fn from(e: serde_json::Error) -> Self {
        FastlaneError::Store(e.to_string())
    }
}

/// Result type alias for Fastlane operations.
pub type Result<T> = std::result::Result<T, FastlaneError>;
