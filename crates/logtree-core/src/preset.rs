//! Named partial trees that can be layered onto an application's tree.
//!
//! A preset is a fragment, not a full tree: it only carries the keys it wants
//! to contribute, so layering it never resets `disable_existing_loggers` or
//! `propagate` on the base.

use std::path::Path;

use serde_json::{Map, Value};

use crate::entity::{FormatterConfig, Renderable, RotatingFileHandlerConfig, StreamHandlerConfig};
use crate::error::ConfigResult;
use crate::level::Level;
use crate::merge::{MergeOutcome, merge_all};
use crate::tree::ConfigurationTree;

/// Format used by the built-in presets.
pub const DEFAULT_FORMAT: &str = "%(asctime)s | %(levelname)-8s | %(name)s - %(message)s";
/// Date format used by the built-in presets.
pub const DEFAULT_DATEFMT: &str = "%Y-%m-%d %H:%M:%S";

/// A named configuration fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    pub name: String,
    pub fragment: Value,
}

impl Preset {
    /// Wraps an existing fragment.
    pub fn new(name: impl Into<String>, fragment: Value) -> Self {
        Self {
            name: name.into(),
            fragment,
        }
    }

    /// Starts an empty fragment.
    pub fn builder(name: impl Into<String>) -> PresetBuilder {
        PresetBuilder {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Builds a preset fragment section by section.
///
/// Sections left empty are not emitted.
#[derive(Debug, Clone, Default)]
pub struct PresetBuilder {
    name: String,
    root_handlers: Vec<String>,
    root_level: Option<Level>,
    formatters: Map<String, Value>,
    handlers: Map<String, Value>,
    loggers: Map<String, Value>,
}

impl PresetBuilder {
    pub fn formatter(mut self, entity: &impl Renderable) -> Self {
        self.formatters.extend(entity.to_subtree());
        self
    }

    pub fn handler(mut self, entity: &impl Renderable) -> Self {
        self.handlers.extend(entity.to_subtree());
        self
    }

    pub fn logger(mut self, entity: &impl Renderable) -> Self {
        self.loggers.extend(entity.to_subtree());
        self
    }

    /// Appends a handler name to the root list (merged by concatenation).
    pub fn root_handler(mut self, handler: impl Into<String>) -> Self {
        self.root_handlers.push(handler.into());
        self
    }

    pub fn root_level(mut self, level: Level) -> Self {
        self.root_level = Some(level);
        self
    }

    pub fn build(self) -> Preset {
        let mut fragment = Map::new();

        let mut root = Map::new();
        if !self.root_handlers.is_empty() {
            root.insert("handlers".into(), Value::from(self.root_handlers));
        }
        if let Some(level) = self.root_level {
            root.insert("level".into(), Value::from(level.as_str()));
        }

        for (key, section) in [
            ("root", root),
            ("formatters", self.formatters),
            ("handlers", self.handlers),
            ("loggers", self.loggers),
        ] {
            if !section.is_empty() {
                fragment.insert(key.into(), Value::Object(section));
            }
        }

        Preset::new(self.name, Value::Object(fragment))
    }
}

/// Console output on `stdout` attached to the root logger.
pub fn console(level: Level) -> ConfigResult<Preset> {
    let formatter = FormatterConfig::new("console", DEFAULT_FORMAT)?.with_datefmt(DEFAULT_DATEFMT);
    let handler = StreamHandlerConfig::new("console", level)?.with_formatter("console");
    Ok(Preset::builder("console")
        .formatter(&formatter)
        .handler(&handler)
        .root_handler("console")
        .build())
}

/// A 10 MiB x 5 rotating file attached to the root logger.
///
/// Creates the log directory.
pub fn rotating_file(path: impl AsRef<Path>, level: Level) -> ConfigResult<Preset> {
    let formatter = FormatterConfig::new("file", DEFAULT_FORMAT)?.with_datefmt(DEFAULT_DATEFMT);
    let handler = RotatingFileHandlerConfig::new("file", level, path, 10 * 1024 * 1024, 5)?
        .with_formatter("file");
    Ok(Preset::builder("rotating_file")
        .formatter(&formatter)
        .handler(&handler)
        .root_handler("file")
        .build())
}

/// Layers presets onto `base` in order.
pub fn apply_presets(base: &ConfigurationTree, presets: &[Preset]) -> MergeOutcome {
    merge_all(base, presets.iter().map(|p| &p.fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_console_preset_fragment() {
        let preset = console(Level::Info).unwrap();
        assert_eq!(preset.name, "console");
        assert_eq!(preset.fragment["root"], json!({"handlers": ["console"]}));
        assert_eq!(
            preset.fragment["handlers"]["console"]["formatter"],
            "console"
        );
        assert!(preset.fragment.get("disable_existing_loggers").is_none());
    }

    #[test]
    fn test_apply_presets_keeps_base_flags() {
        let base = ConfigurationTree::builder()
            .root(["app"], "warning")
            .unwrap()
            .disable_existing_loggers(true)
            .propagate(false)
            .build();

        let tmp = tempfile::tempdir().unwrap();
        let presets = [
            console(Level::Debug).unwrap(),
            rotating_file(tmp.path().join("logs/app.log"), Level::Info).unwrap(),
        ];
        let outcome = apply_presets(&base, &presets);

        assert!(outcome.is_clean());
        let tree = outcome.into_tree();
        assert!(tree.disable_existing_loggers);
        assert!(!tree.propagate);
        assert_eq!(tree.root.handlers, vec!["app", "console", "file"]);
        assert_eq!(tree.root.level, Some(Level::Warning));
        assert!(tree.handler("file").is_some());
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn test_builder_root_level() {
        let preset = Preset::builder("quiet").root_level(Level::Error).build();
        assert_eq!(preset.fragment, json!({"root": {"level": "ERROR"}}));
    }
}
