//! Logger entities.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Renderable, check_name, single_entry};
use crate::error::{ConfigError, ConfigResult};
use crate::level::Level;

/// A named logger routed to a list of handlers.
///
/// Renders to `{name: {level, handlers, propagate}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "LoggerRaw")]
pub struct LoggerConfig {
    /// Dotted logger name, the key in the `loggers` section.
    pub name: String,
    pub level: Level,
    /// Ordered handler names.
    #[serde(default)]
    pub handlers: Vec<String>,
    /// Whether records also flow to ancestor loggers.
    #[serde(default)]
    pub propagate: bool,
}

/// Characters that would split a logger name when it is used as a filter
/// target.
const RESERVED_NAME_CHARS: [char; 6] = [',', '=', '[', ']', '{', '}'];

/// Rejects empty logger names and names that cannot be used as a target.
pub(crate) fn check_logger_name(name: &str) -> ConfigResult<()> {
    check_name("logger.name", name)?;
    if let Some(c) = name
        .chars()
        .find(|c| c.is_whitespace() || RESERVED_NAME_CHARS.contains(c))
    {
        return Err(ConfigError::validation(
            "logger.name",
            format!("'{name}' contains reserved character {c:?}"),
        ));
    }
    Ok(())
}

impl LoggerConfig {
    /// Creates a non-propagating logger with no handlers.
    pub fn new(name: impl Into<String>, level: Level) -> ConfigResult<Self> {
        let name = name.into();
        check_logger_name(&name)?;
        Ok(Self {
            name,
            level,
            handlers: Vec::new(),
            propagate: false,
        })
    }

    /// Appends a handler name.
    pub fn with_handler(mut self, handler: impl Into<String>) -> Self {
        self.handlers.push(handler.into());
        self
    }

    /// Appends several handler names in order.
    pub fn with_handlers<I, S>(mut self, handlers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handlers.extend(handlers.into_iter().map(Into::into));
        self
    }

    pub fn with_propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    /// Renders the body without the name key.
    pub fn render(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("level".into(), Value::from(self.level.as_str()));
        body.insert("handlers".into(), Value::from(self.handlers.clone()));
        body.insert("propagate".into(), Value::from(self.propagate));
        body
    }
}

#[derive(Deserialize)]
struct LoggerRaw {
    name: String,
    level: Level,
    #[serde(default)]
    handlers: Vec<String>,
    #[serde(default)]
    propagate: bool,
}

impl TryFrom<LoggerRaw> for LoggerConfig {
    type Error = ConfigError;

    fn try_from(raw: LoggerRaw) -> ConfigResult<Self> {
        Ok(Self::new(raw.name, raw.level)?
            .with_handlers(raw.handlers)
            .with_propagate(raw.propagate))
    }
}

impl Renderable for LoggerConfig {
    fn to_subtree(&self) -> Map<String, Value> {
        single_entry(&self.name, self.render())
    }
}
