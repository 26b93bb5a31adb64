//! Typed configuration entities.
//!
//! Every entity renders into a single-key sub-tree `{name: {...}}` that the
//! assembly engine folds into the matching top-level section. Pre-rendered
//! fragments take the same path through [`RawSubtree`].

pub mod formatter;
pub mod handler;
pub mod logger;

use serde_json::{Map, Value};

pub use formatter::{FormatStyle, FormatterConfig};
pub use handler::{
    FileHandlerConfig, HandlerBase, HandlerConfig, QueueHandlerConfig, QueueListenerConfig,
    RotatingFileHandlerConfig, SmtpHandlerConfig, SocketHandlerConfig, StreamHandlerConfig,
    TimedRotatingFileHandlerConfig,
};
pub use logger::LoggerConfig;

/// Anything that can be folded into a section of the configuration tree.
///
/// Rendering is pure: it never mutates `self` and returns the same mapping for
/// the same field values.
pub trait Renderable {
    /// Renders the `{name: body}` mapping for this entity.
    fn to_subtree(&self) -> Map<String, Value>;
}

impl<T: Renderable + ?Sized> Renderable for &T {
    fn to_subtree(&self) -> Map<String, Value> {
        (**self).to_subtree()
    }
}

/// An already-rendered fragment, passed through unchanged.
///
/// Useful for injecting sub-trees taken from third-party presets or files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSubtree(pub Map<String, Value>);

impl RawSubtree {
    /// Wraps a single `{name: body}` entry.
    pub fn entry(name: impl Into<String>, body: Value) -> Self {
        let mut map = Map::new();
        map.insert(name.into(), body);
        Self(map)
    }
}

impl From<Map<String, Value>> for RawSubtree {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl Renderable for RawSubtree {
    fn to_subtree(&self) -> Map<String, Value> {
        self.0.clone()
    }
}

/// Wraps `body` under `name`.
pub(crate) fn single_entry(name: &str, body: Map<String, Value>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(name.to_string(), Value::Object(body));
    map
}

/// Rejects empty or whitespace-only names.
pub(crate) fn check_name(field: &str, name: &str) -> crate::ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(crate::ConfigError::validation(field, "must not be empty"));
    }
    Ok(())
}
