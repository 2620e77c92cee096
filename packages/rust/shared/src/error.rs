//! Error types for the categorizer.
//!
//! Library crates use [`ClassificationError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics. Component
//! boundaries turn errors into sentinel results through
//! [`ClassificationResult::from_error`](crate::ClassificationResult::from_error).

use std::path::PathBuf;

/// Top-level error type for all categorizer operations.
#[derive(Debug, thiserror::Error)]
pub enum ClassificationError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during discovery, fetching, or search.
    #[error("network error: {0}")]
    Network(String),

    /// The site answered HTTP 403.
    #[error("access forbidden: {0}")]
    Forbidden(String),

    /// HTML, event-stream, or response parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// The generation service failed or returned nothing usable.
    #[error("generation service error: {0}")]
    ModelService(String),

    /// Input validation error (missing URL, empty batch, missing column).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Tabular input/output error.
    #[error("table error: {0}")]
    Table(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ClassificationError>;

impl ClassificationError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
