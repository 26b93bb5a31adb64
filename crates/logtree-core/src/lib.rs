//! Logtree Core - typed logging-configuration entities and tree composition.
//!
//! This crate provides:
//! - Entities for formatters, handlers (eight variants) and loggers
//! - The assembly engine building a [`ConfigurationTree`] from entities
//! - A deterministic deep merge for layering trees and fragments
//! - Level, compression and reference validation
//! - A directory guarantor and JSON persistence for trees
//!
//! Nothing here performs logging I/O. The tree only describes sinks; a backend
//! (see `logtree-runtime`) interprets it.
//!
//! ```rust
//! use logtree_core::prelude::*;
//! use serde_json::json;
//!
//! let tree = ConfigurationTree::builder()
//!     .root(["console"], "warning")?
//!     .formatter(&FormatterConfig::new("std", "%(message)s")?)
//!     .handler(&StreamHandlerConfig::new("console", Level::Info)?.with_formatter("std"))
//!     .logger(&LoggerConfig::new("app", Level::Debug)?.with_handler("console"))
//!     .build();
//!
//! let layered = tree.merge(&json!({"loggers": {"app": {"level": "INFO"}}}))
//!     .unwrap_or_else(|_| tree.clone());
//! assert_eq!(layered.logger("app").unwrap()["level"], "INFO");
//! # Ok::<(), ConfigError>(())
//! ```

pub mod entity;
pub mod error;
pub mod fs;
pub mod level;
pub mod merge;
pub mod preset;
pub mod tree;
pub mod validation;

// Re-exports
pub use entity::{
    FileHandlerConfig, FormatStyle, FormatterConfig, HandlerBase, HandlerConfig, LoggerConfig,
    QueueHandlerConfig, QueueListenerConfig, RawSubtree, Renderable, RotatingFileHandlerConfig,
    SmtpHandlerConfig, SocketHandlerConfig, StreamHandlerConfig, TimedRotatingFileHandlerConfig,
};
pub use error::{ConfigError, ConfigResult, MergeFailure};
pub use fs::{ensure_dir, ensure_parent_dir, expand_home, save_tree};
pub use level::{Compression, Level, validate_compression, validate_level};
pub use merge::{MergeOutcome, deep_merge, merge_all, merge_or_base};
pub use preset::{Preset, PresetBuilder, apply_presets};
pub use tree::{ConfigurationTree, RootConfig, TreeBuilder, assemble};
pub use validation::{
    DanglingReference, normalize_levels, validate_logger, validate_logger_name, validate_references,
};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::entity::*;
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::level::Level;
    pub use crate::tree::{ConfigurationTree, assemble};
}
