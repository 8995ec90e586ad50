//! Error types for margin.

use std::path::PathBuf;
use thiserror::Error;

/// Cache-layer errors. These never leave the store; they are logged and the
/// store degrades to its in-memory document.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Store document could not be encoded or decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors surfaced to the user by commands.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("Provider request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Provider authentication failed: {0}")]
    ProviderAuthFailed(String),

    #[error("Provider rate limit exceeded: {0}")]
    ProviderRateLimit(String),

    #[error("Provider model not found: {0}")]
    ProviderModelNotFound(String),

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("No readable source file at {0}")]
    MissingInput(PathBuf),

    #[error("Unsupported file type: {0}. Only recognized source files can be annotated.")]
    UnsupportedFile(PathBuf),

    #[error("Invalid abstraction level {0}: expected a value from 1 to 5")]
    InvalidLevel(u8),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StoreError),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}

impl ApiError {
    /// Errors raised before any network request is attempted.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, ApiError::MissingInput(_) | ApiError::UnsupportedFile(_))
    }
}
