//! Error types for the batch gateway

use thiserror::Error;

/// Result type alias for the batch gateway
pub type Result<T> = std::result::Result<T, BatchError>;

/// Main error type for the batch gateway
///
/// Running out of retry budget and caller cancellation are not errors: they
/// are reported through [`crate::core::batch::Outcome`] together with the
/// items that did not land.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Invalid per-request limit, retry policy or other configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed item, key or unknown collection
    #[error("Validation error: {0}")]
    Validation(String),

    /// Throttling or capacity pressure at the store
    #[error("Transient store error: {0}")]
    TransientStore(String),

    /// Authorization or schema failure at the store
    #[error("Permanent store error: {0}")]
    Permanent(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BatchError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn transient(msg: impl Into<String>) -> Self {
        Self::TransientStore(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the failed items should be fed back into the retry loop
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    /// Stable category name used in logs and HTTP error bodies
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "configuration_error",
            Self::Validation(_) => "validation_error",
            Self::TransientStore(_) => "transient_store_error",
            Self::Permanent(_) => "permanent_error",
            Self::Io(_) => "io_error",
            Self::Yaml(_) => "yaml_error",
            Self::Serialization(_) => "serialization_error",
            Self::Server(_) => "server_error",
            Self::Internal(_) => "internal_error",
        }
    }
}
