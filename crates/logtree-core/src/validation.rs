//! Validation passes over entities and assembled trees.
//!
//! Assembly never calls [`validate_references`]; dangling names are left for
//! the backend to report unless a caller opts in.

use std::fmt;

use serde_json::{Map, Value};

use crate::entity::LoggerConfig;
use crate::entity::logger::check_logger_name;
use crate::error::{ConfigError, ConfigResult};
use crate::level::validate_level;
use crate::tree::ConfigurationTree;

/// Checks that `name` can key a logger and be used as a filter target.
pub fn validate_logger_name(name: &str) -> ConfigResult<()> {
    check_logger_name(name)
}

/// Checks a logger entity's fields.
pub fn validate_logger(logger: &LoggerConfig) -> ConfigResult<()> {
    check_logger_name(&logger.name)?;
    if let Some(index) = logger.handlers.iter().position(|h| h.trim().is_empty()) {
        return Err(ConfigError::validation(
            "logger.handlers",
            format!("entry {index} is empty"),
        ));
    }
    // Round-trip through the table so a deserialized level is known-good.
    validate_level(logger.level.as_str())?;
    Ok(())
}

/// A name in one section that points at nothing in another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Where the reference lives, e.g. `handlers.console.formatter`.
    pub location: String,
    /// The name that could not be resolved.
    pub missing: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} refers to unknown '{}'", self.location, self.missing)
    }
}

/// Lists every handler→formatter, logger→handler and root→handler reference
/// that does not resolve.
pub fn validate_references(tree: &ConfigurationTree) -> Vec<DanglingReference> {
    let mut dangling = Vec::new();

    for (name, body) in &tree.handlers {
        if let Some(formatter) = body.get("formatter").and_then(Value::as_str)
            && !tree.formatters.contains_key(formatter)
        {
            dangling.push(DanglingReference {
                location: format!("handlers.{name}.formatter"),
                missing: formatter.to_string(),
            });
        }
        // Queue listeners forward to other handlers.
        collect_handler_refs(
            &tree.handlers,
            body.get("handlers"),
            &format!("handlers.{name}.handlers"),
            &mut dangling,
        );
    }

    for (name, body) in &tree.loggers {
        collect_handler_refs(
            &tree.handlers,
            body.get("handlers"),
            &format!("loggers.{name}.handlers"),
            &mut dangling,
        );
    }

    for handler in &tree.root.handlers {
        if !tree.handlers.contains_key(handler) {
            dangling.push(DanglingReference {
                location: "root.handlers".into(),
                missing: handler.clone(),
            });
        }
    }

    dangling
}

fn collect_handler_refs(
    handlers: &Map<String, Value>,
    names: Option<&Value>,
    location: &str,
    dangling: &mut Vec<DanglingReference>,
) {
    let Some(names) = names.and_then(Value::as_array) else {
        return;
    };
    for name in names.iter().filter_map(Value::as_str) {
        if !handlers.contains_key(name) {
            dangling.push(DanglingReference {
                location: location.to_string(),
                missing: name.to_string(),
            });
        }
    }
}

/// Canonicalizes every `level` string in the handler and logger sections.
///
/// Trees layered from files or environment variables may carry lower-case
/// names; this rewrites them in place and fails on unknown ones.
pub fn normalize_levels(tree: &mut ConfigurationTree) -> ConfigResult<()> {
    normalize_section("handlers", &mut tree.handlers)?;
    normalize_section("loggers", &mut tree.loggers)?;
    Ok(())
}

fn normalize_section(section: &str, entries: &mut Map<String, Value>) -> ConfigResult<()> {
    for (name, body) in entries.iter_mut() {
        let Some(level) = body.get_mut("level") else {
            continue;
        };
        let Some(raw) = level.as_str() else {
            return Err(ConfigError::validation(
                format!("{section}.{name}.level"),
                format!("expected a level name, found {level}"),
            ));
        };
        let canonical = validate_level(raw).map_err(|e| match e {
            ConfigError::InvalidLevel { level, allowed } => ConfigError::validation(
                format!("{section}.{name}.level"),
                format!("'{level}' is not one of: {allowed}"),
            ),
            other => other,
        })?;
        *level = Value::from(canonical.as_str());
    }
    Ok(())
}
