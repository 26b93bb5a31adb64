//! Runtime error types.

use std::path::PathBuf;

use logtree_core::ConfigError;
use thiserror::Error;

/// Errors that can occur while loading or installing a configuration tree.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Entity, validation or filesystem failure from the core crate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An explicitly requested file does not exist.
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension is unknown or its feature is disabled.
    #[error("Unsupported or disabled configuration file format: .{0}")]
    UnsupportedFormat(String),

    /// A source could not be read into a JSON-shaped fragment.
    #[error("Failed to extract configuration from {source_name}: {reason}")]
    Extract { source_name: String, reason: String },

    /// A handler's routing could not be expressed as a tracing filter.
    #[error("Invalid filter for handler '{handler}': {reason}")]
    Filter { handler: String, reason: String },

    /// A file sink could not be opened.
    #[error("Failed to open appender for handler '{handler}': {reason}")]
    Appender { handler: String, reason: String },

    /// A global subscriber is already installed.
    #[error("Failed to install subscriber: {0}")]
    Init(String),
}

impl RuntimeError {
    pub(crate) fn extract(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::Extract {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
