//! Error types for specmerge.
//!
//! Library crates use [`SpecmergeError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all specmerge operations.
#[derive(Debug, thiserror::Error)]
pub enum SpecmergeError {
    /// Malformed build input (options, base structure). Raised before any I/O.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A caller-supplied converter failed or returned an unusable value.
    #[error("conversion error in {path:?}: {message}")]
    Conversion { path: PathBuf, message: String },

    /// A pattern could not be resolved. Absorbed by discovery.
    #[error("discovery error for pattern '{pattern}': {message}")]
    Discovery { pattern: String, message: String },

    /// A definition file could not be loaded. Absorbed by the extractor.
    #[error("load error at {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    /// Configuration loading or parsing error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The assembled document could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SpecmergeError>;

impl SpecmergeError {
    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a conversion error attributed to a definition file.
    pub fn conversion(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Conversion {
            path: path.into(),
            message: msg.into(),
        }
    }

    /// Create a discovery error for a single pattern.
    pub fn discovery(pattern: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Discovery {
            pattern: pattern.into(),
            message: msg.into(),
        }
    }

    /// Create a load error for a single definition file.
    pub fn load(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::Load {
            path: path.into(),
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
