//! Error types for entity construction, validation and persistence.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building, validating or saving a configuration tree.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A level name outside the severity table.
    #[error("invalid level '{level}', expected one of: {allowed}")]
    InvalidLevel {
        /// The offending input.
        level: String,
        /// Comma-separated list of accepted names.
        allowed: String,
    },

    /// Malformed or out-of-range field value.
    #[error("invalid value for '{field}': {reason}")]
    Validation {
        /// Name of the offending field.
        field: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Creating a directory or file was refused by the OS.
    #[error("permission denied: {}", path.display())]
    PermissionDenied {
        /// The path that could not be created.
        path: PathBuf,
    },

    /// Any other filesystem failure.
    #[error("I/O failure at {}: {source}", path.display())]
    Io {
        /// The path being operated on.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Refused to overwrite an existing file.
    #[error("file already exists: {}", .0.display())]
    FileExists(PathBuf),

    /// Tree could not be turned into JSON.
    #[error("failed to serialize configuration tree: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a validation error for `field`.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Maps an I/O error at `path` onto the permission/generic split.
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }

    /// Returns true for the validation family (bad level, bad field value).
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidLevel { .. } | Self::Validation { .. })
    }
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// A deep-merge step left the tree in an inconsistent shape.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("merge failed at '{path}': {reason}")]
pub struct MergeFailure {
    /// Dotted key path where the inconsistency was detected.
    pub path: String,
    /// Description of the inconsistency.
    pub reason: String,
}

impl MergeFailure {
    pub(crate) fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
