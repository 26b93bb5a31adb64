//! Formatter entities.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Renderable, check_name, single_entry};
use crate::error::{ConfigError, ConfigResult};

/// Template dialect of a format string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FormatStyle {
    /// `%(name)s` placeholders.
    #[default]
    #[serde(rename = "%")]
    Percent,
    /// `{name}` placeholders.
    #[serde(rename = "{")]
    Brace,
    /// `$name` placeholders.
    #[serde(rename = "$")]
    Dollar,
}

impl FormatStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percent => "%",
            Self::Brace => "{",
            Self::Dollar => "$",
        }
    }

    /// Marker every format string in this dialect must contain at least once.
    fn field_marker(self) -> &'static str {
        match self {
            Self::Percent => "%(",
            Self::Brace => "{",
            Self::Dollar => "$",
        }
    }
}

impl fmt::Display for FormatStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named message formatter.
///
/// Renders to `{name: {format, datefmt?, style, validate}}`. Deserialized
/// formatters are checked the same way as constructed ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FormatterRaw")]
pub struct FormatterConfig {
    /// Key in the `formatters` section.
    pub name: String,
    /// Message template.
    pub fmt: String,
    /// Timestamp template.
    #[serde(default)]
    pub datefmt: Option<String>,
    /// Template dialect.
    #[serde(default)]
    pub style: FormatStyle,
    /// Whether the backend should check the template against its dialect.
    #[serde(default = "default_validate")]
    pub validate: bool,
}

fn default_validate() -> bool {
    true
}

#[derive(Deserialize)]
struct FormatterRaw {
    name: String,
    fmt: String,
    #[serde(default)]
    datefmt: Option<String>,
    #[serde(default)]
    style: FormatStyle,
    #[serde(default = "default_validate")]
    validate: bool,
}

impl TryFrom<FormatterRaw> for FormatterConfig {
    type Error = ConfigError;

    fn try_from(raw: FormatterRaw) -> ConfigResult<Self> {
        let formatter = Self {
            name: raw.name,
            fmt: raw.fmt,
            datefmt: raw.datefmt,
            style: raw.style,
            validate: raw.validate,
        };
        formatter.check()?;
        Ok(formatter)
    }
}

impl FormatterConfig {
    /// Creates a `%`-style formatter with validation enabled.
    pub fn new(name: impl Into<String>, fmt: impl Into<String>) -> ConfigResult<Self> {
        let formatter = Self {
            name: name.into(),
            fmt: fmt.into(),
            datefmt: None,
            style: FormatStyle::default(),
            validate: default_validate(),
        };
        formatter.check()?;
        Ok(formatter)
    }

    /// Sets the timestamp template.
    pub fn with_datefmt(mut self, datefmt: impl Into<String>) -> Self {
        self.datefmt = Some(datefmt.into());
        self
    }

    /// Switches the template dialect, re-checking the format string.
    pub fn with_style(mut self, style: FormatStyle) -> ConfigResult<Self> {
        self.style = style;
        self.check()?;
        Ok(self)
    }

    /// Turns template validation on or off.
    pub fn with_validate(mut self, validate: bool) -> ConfigResult<Self> {
        self.validate = validate;
        self.check()?;
        Ok(self)
    }

    /// Checks field values.
    pub fn check(&self) -> ConfigResult<()> {
        check_name("formatter.name", &self.name)?;
        if self.fmt.is_empty() {
            return Err(ConfigError::validation("formatter.fmt", "must not be empty"));
        }
        if self.validate && !self.fmt.contains(self.style.field_marker()) {
            return Err(ConfigError::validation(
                "formatter.fmt",
                format!(
                    "'{}' has no '{}' field for style '{}'",
                    self.fmt,
                    self.style.field_marker(),
                    self.style
                ),
            ));
        }
        Ok(())
    }

    /// Renders the body without the name key.
    pub fn render(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert("format".into(), Value::from(self.fmt.clone()));
        if let Some(datefmt) = &self.datefmt {
            body.insert("datefmt".into(), Value::from(datefmt.clone()));
        }
        body.insert("style".into(), Value::from(self.style.as_str()));
        body.insert("validate".into(), Value::from(self.validate));
        body
    }
}

impl Renderable for FormatterConfig {
    fn to_subtree(&self) -> Map<String, Value> {
        single_entry(&self.name, self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_shape() {
        let formatter = FormatterConfig::new("std", "%(message)s")
            .unwrap()
            .with_datefmt("%H:%M:%S");

        assert_eq!(
            Value::Object(formatter.to_subtree()),
            json!({
                "std": {
                    "format": "%(message)s",
                    "datefmt": "%H:%M:%S",
                    "style": "%",
                    "validate": true
                }
            })
        );
    }

    #[test]
    fn test_render_is_idempotent() {
        let formatter = FormatterConfig::new("std", "%(message)s").unwrap();
        assert_eq!(formatter.to_subtree(), formatter.to_subtree());
    }

    #[test]
    fn test_style_mismatch_rejected() {
        let err = FormatterConfig::new("std", "%(message)s")
            .unwrap()
            .with_style(FormatStyle::Brace)
            .unwrap_err();
        assert!(err.is_validation());

        let brace = FormatterConfig::new("b", "{message}")
            .unwrap_err();
        assert!(brace.is_validation());

        let unchecked = FormatterConfig {
            validate: false,
            ..FormatterConfig::new("b", "%(message)s").unwrap()
        };
        assert!(unchecked.with_style(FormatStyle::Brace).is_ok());
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert!(FormatterConfig::new("", "%(message)s").is_err());
        assert!(FormatterConfig::new("std", "").is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let formatter: FormatterConfig =
            serde_yaml::from_str("name: plain\nfmt: '{message}'\nstyle: '{'\n").unwrap();
        assert_eq!(formatter.style, FormatStyle::Brace);
        assert!(formatter.validate);
        assert!(formatter.datefmt.is_none());
    }

    #[test]
    fn test_deserialize_rejects_invalid() {
        assert!(serde_yaml::from_str::<FormatterConfig>("name: ''\nfmt: ''\n").is_err());
        assert!(serde_yaml::from_str::<FormatterConfig>("name: std\nfmt: ''\nvalidate: false\n").is_err());
        assert!(serde_yaml::from_str::<FormatterConfig>("name: std\nfmt: 'plain text'\n").is_err());

        let unchecked: FormatterConfig =
            serde_yaml::from_str("name: std\nfmt: 'plain text'\nvalidate: false\n").unwrap();
        assert!(!unchecked.validate);
    }
}
