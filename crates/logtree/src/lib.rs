//! # Logtree
//!
//! Typed, layered logging configuration for Rust.
//!
//! ## Overview
//!
//! Logtree describes a logging setup as a plain configuration tree of
//! formatters, handlers and loggers. Trees are assembled from typed entities,
//! layered with presets, files and environment variables, and finally
//! installed into `tracing`.
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────────┐    ┌─────────────────┐
//! │ Entities │───▶│ assemble │───▶│ merge / layer │───▶│ tracing backend │
//! └──────────┘    └──────────┘    └───────────────┘    └─────────────────┘
//!                                   ▲   ▲   ▲
//!                        presets ───┘   │   └─── LOGTREE_* env
//!                                 logtree.{toml,yaml,json}
//! ```
//!
//! - **Core** (`logtree-core`): entities, assembly, deep merge, validation, persistence
//! - **Runtime** (`logtree-runtime`): layered loading and the `tracing` backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use logtree::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let std = FormatterConfig::new("std", "%(asctime)s %(levelname)s %(message)s")?;
//!     let console = StreamHandlerConfig::new("console", Level::Info)?.with_formatter("std");
//!     let tree = assemble(&["console"], "info", false, true, &[&std], &[&console], &[])?;
//!
//!     let tree = TreeLoader::new().base(tree).with_current_dir().load()?;
//!     BackendBuilder::from_tree(&tree).install()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: read `logtree.toml` (default)
//! - `yaml-config`: read `logtree.yaml` / `logtree.yml`

pub use logtree_core as core;
pub use logtree_runtime as runtime;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use logtree::prelude::*;
/// ```
pub mod prelude {
    // Entities and assembly
    pub use logtree_core::prelude::*;

    // Layering
    pub use logtree_core::preset::{self, Preset};
    pub use logtree_core::{MergeOutcome, apply_presets, merge_all, merge_or_base};

    // Validation and persistence
    pub use logtree_core::{save_tree, validate_compression, validate_level, validate_logger};

    // Runtime
    pub use logtree_runtime::{
        ActiveBackend, BackendBuilder, Profile, RuntimeError, RuntimeResult, TreeLoader,
        reconstruct_from_active_backend,
    };
}
