//! Logtree Runtime - loading configuration trees and installing them into `tracing`.
//!
//! This crate provides:
//! - Layered loading from files, environment variables and presets (`TreeLoader`)
//! - Profile selection via `LOGTREE_PROFILE`
//! - A `tracing-subscriber` backend built from a tree (`BackendBuilder`)
//! - Reconstruction of a tree from an installed backend
//!
//! ```ignore
//! use logtree_core::{Level, preset};
//! use logtree_runtime::{BackendBuilder, TreeLoader};
//!
//! let tree = TreeLoader::new()
//!     .with_current_dir()
//!     .preset(preset::console(Level::Info)?)
//!     .load()?;
//!
//! let backend = BackendBuilder::from_tree(&tree).install()?;
//! let snapshot = backend.reconstruct();
//! ```

pub mod backend;
pub mod error;
pub mod introspect;
pub mod loader;

// Re-exports
pub use backend::{
    ActiveBackend, BackendBuilder, BackendSubscriber, DEFAULT_ROOT_LEVEL, LoggerRecord,
    SinkDestination, SinkRecord, init_from_tree, logger_target,
};
pub use error::{RuntimeError, RuntimeResult};
pub use introspect::reconstruct_from_active_backend;
pub use loader::{ENV_PREFIX, Profile, TreeLoader};
