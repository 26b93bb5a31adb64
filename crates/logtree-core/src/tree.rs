//! The assembled configuration tree and the assembly engine.
//!
//! # Shape
//!
//! ```json
//! {
//!   "version": 1,
//!   "disable_existing_loggers": false,
//!   "propagate": true,
//!   "root": {"handlers": ["console"], "level": "WARNING"},
//!   "formatters": {"std": {"format": "%(message)s", "style": "%", "validate": true}},
//!   "handlers": {"console": {"class": "logging.StreamHandler", "level": "INFO", "stream": "stdout"}},
//!   "loggers": {"app": {"level": "DEBUG", "handlers": ["console"], "propagate": false}}
//! }
//! ```
//!
//! Key names and per-entity shapes are a stable contract with the backends
//! that consume the tree.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::entity::Renderable;
use crate::error::ConfigResult;
use crate::level::{Level, validate_level};

/// The only schema version.
pub const TREE_VERSION: u8 = 1;

/// Top-level keys every tree carries.
pub const TOP_LEVEL_KEYS: [&str; 7] = [
    "version",
    "disable_existing_loggers",
    "propagate",
    "root",
    "formatters",
    "handlers",
    "loggers",
];

/// Routing policy of the root logger.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RootConfig {
    /// Handler names attached to the root logger.
    #[serde(default)]
    pub handlers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<Level>,
}

/// A complete logging configuration ready for a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigurationTree {
    #[serde(deserialize_with = "deserialize_version")]
    version: u8,
    pub disable_existing_loggers: bool,
    pub propagate: bool,
    pub root: RootConfig,
    pub formatters: Map<String, Value>,
    pub handlers: Map<String, Value>,
    pub loggers: Map<String, Value>,
    /// Top-level keys outside the fixed sections (`filters`, `incremental`,
    /// ...). Carried through merges and saved as-is; backends ignore them.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn deserialize_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let version = u8::deserialize(deserializer)?;
    if version != TREE_VERSION {
        return Err(serde::de::Error::custom(format!(
            "unsupported configuration version {version}, expected {TREE_VERSION}"
        )));
    }
    Ok(version)
}

impl Default for ConfigurationTree {
    /// The empty skeleton every assembly starts from.
    fn default() -> Self {
        Self {
            version: TREE_VERSION,
            disable_existing_loggers: false,
            propagate: true,
            root: RootConfig::default(),
            formatters: Map::new(),
            handlers: Map::new(),
            loggers: Map::new(),
            extra: Map::new(),
        }
    }
}

impl ConfigurationTree {
    /// Starts a builder from the empty skeleton.
    pub fn builder() -> TreeBuilder {
        TreeBuilder::new()
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    /// Looks up a rendered formatter body.
    pub fn formatter(&self, name: &str) -> Option<&Map<String, Value>> {
        self.formatters.get(name).and_then(Value::as_object)
    }

    /// Looks up a rendered handler body.
    pub fn handler(&self, name: &str) -> Option<&Map<String, Value>> {
        self.handlers.get(name).and_then(Value::as_object)
    }

    /// Looks up a rendered logger body.
    pub fn logger(&self, name: &str) -> Option<&Map<String, Value>> {
        self.loggers.get(name).and_then(Value::as_object)
    }

    /// Converts into a plain JSON value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Parses a plain JSON value, rejecting any version other than 1.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Pretty-printed JSON document.
    pub fn to_json_string(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Incrementally assembles a [`ConfigurationTree`].
///
/// Entities are rendered as they are added and inserted by name into their
/// section; a later entity with the same name replaces the earlier one.
///
/// # Example
///
/// ```rust
/// use logtree_core::{ConfigurationTree, FormatterConfig, Level, StreamHandlerConfig};
///
/// let tree = ConfigurationTree::builder()
///     .root(["console"], "warning")?
///     .formatter(&FormatterConfig::new("std", "%(message)s")?)
///     .handler(&StreamHandlerConfig::new("console", Level::Info)?.with_formatter("std"))
///     .build();
///
/// assert_eq!(tree.root.level, Some(Level::Warning));
/// # Ok::<(), logtree_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    tree: ConfigurationTree,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets root handlers and level. The level is validated case-insensitively.
    pub fn root<I, S>(mut self, handlers: I, level: &str) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tree.root = RootConfig {
            handlers: handlers.into_iter().map(Into::into).collect(),
            level: Some(validate_level(level)?),
        };
        Ok(self)
    }

    pub fn disable_existing_loggers(mut self, disable: bool) -> Self {
        self.tree.disable_existing_loggers = disable;
        self
    }

    pub fn propagate(mut self, propagate: bool) -> Self {
        self.tree.propagate = propagate;
        self
    }

    pub fn formatter(mut self, entity: &impl Renderable) -> Self {
        insert_rendered(&mut self.tree.formatters, entity);
        self
    }

    pub fn handler(mut self, entity: &impl Renderable) -> Self {
        insert_rendered(&mut self.tree.handlers, entity);
        self
    }

    pub fn logger(mut self, entity: &impl Renderable) -> Self {
        insert_rendered(&mut self.tree.loggers, entity);
        self
    }

    pub fn formatters<'a>(mut self, entities: impl IntoIterator<Item = &'a dyn Renderable>) -> Self {
        for entity in entities {
            insert_rendered(&mut self.tree.formatters, entity);
        }
        self
    }

    pub fn handlers<'a>(mut self, entities: impl IntoIterator<Item = &'a dyn Renderable>) -> Self {
        for entity in entities {
            insert_rendered(&mut self.tree.handlers, entity);
        }
        self
    }

    pub fn loggers<'a>(mut self, entities: impl IntoIterator<Item = &'a dyn Renderable>) -> Self {
        for entity in entities {
            insert_rendered(&mut self.tree.loggers, entity);
        }
        self
    }

    pub fn build(self) -> ConfigurationTree {
        debug!(
            formatters = self.tree.formatters.len(),
            handlers = self.tree.handlers.len(),
            loggers = self.tree.loggers.len(),
            "Assembled configuration tree"
        );
        self.tree
    }
}

fn insert_rendered<R: Renderable + ?Sized>(section: &mut Map<String, Value>, entity: &R) {
    for (name, body) in entity.to_subtree() {
        section.insert(name, body);
    }
}

/// Assembles a tree in one call.
///
/// Each entity list accepts typed entities and [`RawSubtree`](crate::RawSubtree)
/// fragments alike. All seven top-level keys are present even when every list
/// is empty.
pub fn assemble<S: AsRef<str>>(
    root_handlers: &[S],
    root_level: &str,
    disable_existing_loggers: bool,
    propagate: bool,
    formatters: &[&dyn Renderable],
    handlers: &[&dyn Renderable],
    loggers: &[&dyn Renderable],
) -> ConfigResult<ConfigurationTree> {
    Ok(TreeBuilder::new()
        .root(root_handlers.iter().map(|h| h.as_ref().to_string()), root_level)?
        .disable_existing_loggers(disable_existing_loggers)
        .propagate(propagate)
        .formatters(formatters.iter().copied())
        .handlers(handlers.iter().copied())
        .loggers(loggers.iter().copied())
        .build())
}
