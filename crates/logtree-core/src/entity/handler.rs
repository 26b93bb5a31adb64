//! Handler entities.
//!
//! Each variant describes a sink and renders a fixed class tag that backends
//! dispatch on. File-backed variants create their log directory when they are
//! constructed.
//!
//! Deserialization goes through the same constructors as the builders: every
//! variant is first read into a private raw struct and then rebuilt with
//! `new()`, so a handler read from YAML or JSON is validated and has its
//! directory created just like one built in code.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Renderable, check_name, single_entry};
use crate::error::{ConfigError, ConfigResult};
use crate::fs::ensure_parent_dir;
use crate::level::{Compression, Level, validate_compression};

/// Fields shared by every handler variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandlerBase {
    /// Key in the `handlers` section.
    pub name: String,
    /// Minimum level this handler emits.
    pub level: Level,
    /// Name of an entry in the `formatters` section.
    #[serde(default)]
    pub formatter: Option<String>,
    /// Ordered filter names.
    #[serde(default)]
    pub filters: Vec<String>,
}

impl HandlerBase {
    fn new(name: impl Into<String>, level: Level) -> ConfigResult<Self> {
        let name = name.into();
        check_name("handler.name", &name)?;
        Ok(Self {
            name,
            level,
            formatter: None,
            filters: Vec::new(),
        })
    }

    fn render_into(&self, class: &str, body: &mut Map<String, Value>) {
        body.insert("class".into(), Value::from(class));
        body.insert("level".into(), Value::from(self.level.as_str()));
        if let Some(formatter) = &self.formatter {
            body.insert("formatter".into(), Value::from(formatter.clone()));
        }
    }

    fn render_filters(&self, body: &mut Map<String, Value>) {
        if !self.filters.is_empty() {
            body.insert("filters".into(), Value::from(self.filters.clone()));
        }
    }
}

/// Per-variant rendering hooks.
trait HandlerVariant {
    const CLASS: &'static str;

    fn base(&self) -> &HandlerBase;
    fn base_mut(&mut self) -> &mut HandlerBase;
    fn render_fields(&self, body: &mut Map<String, Value>);

    /// Replaces the shared fields, keeping formatter and filters read from input.
    fn with_base(mut self, base: HandlerBase) -> Self
    where
        Self: Sized,
    {
        *self.base_mut() = base;
        self
    }

    fn render_body(&self) -> Map<String, Value> {
        let mut body = Map::new();
        self.base().render_into(Self::CLASS, &mut body);
        self.render_fields(&mut body);
        self.base().render_filters(&mut body);
        body
    }
}

/// Builder methods shared by all variants.
macro_rules! handler_common {
    ($ty:ty) => {
        impl $ty {
            /// Sets the formatter name.
            pub fn with_formatter(mut self, formatter: impl Into<String>) -> Self {
                HandlerVariant::base_mut(&mut self).formatter = Some(formatter.into());
                self
            }

            /// Appends a filter name.
            pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
                HandlerVariant::base_mut(&mut self).filters.push(filter.into());
                self
            }

            /// Returns the shared handler fields.
            pub fn base(&self) -> &HandlerBase {
                HandlerVariant::base(self)
            }

            /// Returns the fixed class tag.
            pub fn render_class(&self) -> &'static str {
                <Self as HandlerVariant>::CLASS
            }

            /// Renders the body without the name key.
            pub fn render(&self) -> Map<String, Value> {
                self.render_body()
            }
        }

        impl Renderable for $ty {
            fn to_subtree(&self) -> Map<String, Value> {
                single_entry(&HandlerVariant::base(self).name, self.render_body())
            }
        }
    };
}

/// Accessors for the log file of file-backed variants.
macro_rules! file_backed {
    ($ty:ty) => {
        impl $ty {
            /// Returns the log file path.
            pub fn filename(&self) -> &Path {
                &self.filename
            }

            /// Points the handler at another file, creating its directory.
            pub fn with_filename(mut self, filename: impl AsRef<Path>) -> ConfigResult<Self> {
                self.filename = ensure_parent_dir(filename)?;
                Ok(self)
            }
        }
    };
}

fn path_value(path: &Path) -> Value {
    Value::from(path.to_string_lossy().into_owned())
}

// =============================================================================
// Stream
// =============================================================================

/// Writes to a process stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "StreamHandlerRaw")]
pub struct StreamHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    /// Target stream identifier.
    #[serde(default = "default_stream")]
    pub stream: String,
}

fn default_stream() -> String {
    "stdout".to_string()
}

impl StreamHandlerConfig {
    /// Creates a handler writing to `stdout`.
    pub fn new(name: impl Into<String>, level: Level) -> ConfigResult<Self> {
        Ok(Self {
            base: HandlerBase::new(name, level)?,
            stream: default_stream(),
        })
    }

    /// Sets the target stream identifier.
    pub fn with_stream(mut self, stream: impl Into<String>) -> ConfigResult<Self> {
        let stream = stream.into();
        check_name("handler.stream", &stream)?;
        self.stream = stream;
        Ok(self)
    }
}

impl HandlerVariant for StreamHandlerConfig {
    const CLASS: &'static str = "logging.StreamHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("stream".into(), Value::from(self.stream.clone()));
    }
}

handler_common!(StreamHandlerConfig);

#[derive(Deserialize)]
struct StreamHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    #[serde(default = "default_stream")]
    stream: String,
}

impl TryFrom<StreamHandlerRaw> for StreamHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: StreamHandlerRaw) -> ConfigResult<Self> {
        let handler = Self::new(raw.base.name.clone(), raw.base.level)?.with_stream(raw.stream)?;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// File
// =============================================================================

/// Appends to a single file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FileHandlerRaw")]
pub struct FileHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    filename: PathBuf,
}

impl FileHandlerConfig {
    /// Creates the handler, making sure the log directory exists.
    pub fn new(
        name: impl Into<String>,
        level: Level,
        filename: impl AsRef<Path>,
    ) -> ConfigResult<Self> {
        Ok(Self {
            base: HandlerBase::new(name, level)?,
            filename: ensure_parent_dir(filename)?,
        })
    }
}

impl HandlerVariant for FileHandlerConfig {
    const CLASS: &'static str = "logging.FileHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("filename".into(), path_value(&self.filename));
    }
}

handler_common!(FileHandlerConfig);
file_backed!(FileHandlerConfig);

#[derive(Deserialize)]
struct FileHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    filename: PathBuf,
}

impl TryFrom<FileHandlerRaw> for FileHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: FileHandlerRaw) -> ConfigResult<Self> {
        let handler = Self::new(raw.base.name.clone(), raw.base.level, raw.filename)?;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// Rotating file
// =============================================================================

/// Rolls the file over once it reaches `max_bytes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RotatingFileHandlerRaw")]
pub struct RotatingFileHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    filename: PathBuf,
    /// Size threshold in bytes; 0 never rolls over.
    #[serde(rename = "maxBytes")]
    pub max_bytes: u64,
    /// Number of rolled files kept.
    #[serde(rename = "backupCount")]
    pub backup_count: u32,
    /// Archive format for rolled files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<Compression>,
}

impl RotatingFileHandlerConfig {
    /// Creates the handler, making sure the log directory exists.
    pub fn new(
        name: impl Into<String>,
        level: Level,
        filename: impl AsRef<Path>,
        max_bytes: u64,
        backup_count: u32,
    ) -> ConfigResult<Self> {
        Ok(Self {
            base: HandlerBase::new(name, level)?,
            filename: ensure_parent_dir(filename)?,
            max_bytes,
            backup_count,
            compression: None,
        })
    }

    /// Compresses rolled files with the given tag.
    pub fn with_compression(mut self, tag: &str) -> ConfigResult<Self> {
        self.compression = Some(validate_compression(tag)?);
        Ok(self)
    }
}

impl HandlerVariant for RotatingFileHandlerConfig {
    const CLASS: &'static str = "logging.handlers.RotatingFileHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("filename".into(), path_value(&self.filename));
        body.insert("maxBytes".into(), Value::from(self.max_bytes));
        body.insert("backupCount".into(), Value::from(self.backup_count));
        if let Some(compression) = self.compression {
            body.insert("compression".into(), Value::from(compression.as_str()));
        }
    }
}

handler_common!(RotatingFileHandlerConfig);
file_backed!(RotatingFileHandlerConfig);

#[derive(Deserialize)]
struct RotatingFileHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    filename: PathBuf,
    #[serde(rename = "maxBytes")]
    max_bytes: u64,
    #[serde(rename = "backupCount")]
    backup_count: u32,
    #[serde(default)]
    compression: Option<Compression>,
}

impl TryFrom<RotatingFileHandlerRaw> for RotatingFileHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: RotatingFileHandlerRaw) -> ConfigResult<Self> {
        let mut handler = Self::new(
            raw.base.name.clone(),
            raw.base.level,
            raw.filename,
            raw.max_bytes,
            raw.backup_count,
        )?;
        handler.compression = raw.compression;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// Timed rotating file
// =============================================================================

const WHEN_VALUES: [&str; 12] = [
    "S", "M", "H", "D", "MIDNIGHT", "W0", "W1", "W2", "W3", "W4", "W5", "W6",
];

/// Validates a rollover unit and returns its canonical spelling.
pub fn validate_when(when: &str) -> ConfigResult<String> {
    let upper = when.trim().to_ascii_uppercase();
    if !WHEN_VALUES.contains(&upper.as_str()) {
        return Err(ConfigError::validation(
            "handler.when",
            format!(
                "'{when}' is not a rollover unit, expected one of: {}",
                WHEN_VALUES.join(", ")
            ),
        ));
    }
    Ok(if upper == "MIDNIGHT" {
        "midnight".to_string()
    } else {
        upper
    })
}

/// Rolls the file over on a time schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TimedRotatingFileHandlerRaw")]
pub struct TimedRotatingFileHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    filename: PathBuf,
    /// Rollover unit (`S`, `M`, `H`, `D`, `midnight`, `W0`..`W6`).
    pub when: String,
    /// Number of units between rollovers.
    pub interval: u32,
    #[serde(rename = "backupCount")]
    pub backup_count: u32,
}

impl TimedRotatingFileHandlerConfig {
    /// Creates the handler, making sure the log directory exists.
    pub fn new(
        name: impl Into<String>,
        level: Level,
        filename: impl AsRef<Path>,
        when: &str,
        interval: u32,
        backup_count: u32,
    ) -> ConfigResult<Self> {
        if interval == 0 {
            return Err(ConfigError::validation(
                "handler.interval",
                "must be greater than 0",
            ));
        }
        let base = HandlerBase::new(name, level)?;
        let when = validate_when(when)?;
        Ok(Self {
            base,
            filename: ensure_parent_dir(filename)?,
            when,
            interval,
            backup_count,
        })
    }
}

impl HandlerVariant for TimedRotatingFileHandlerConfig {
    const CLASS: &'static str = "logging.handlers.TimedRotatingFileHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("filename".into(), path_value(&self.filename));
        body.insert("when".into(), Value::from(self.when.clone()));
        body.insert("interval".into(), Value::from(self.interval));
        body.insert("backupCount".into(), Value::from(self.backup_count));
    }
}

handler_common!(TimedRotatingFileHandlerConfig);
file_backed!(TimedRotatingFileHandlerConfig);

#[derive(Deserialize)]
struct TimedRotatingFileHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    filename: PathBuf,
    when: String,
    interval: u32,
    #[serde(rename = "backupCount")]
    backup_count: u32,
}

impl TryFrom<TimedRotatingFileHandlerRaw> for TimedRotatingFileHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: TimedRotatingFileHandlerRaw) -> ConfigResult<Self> {
        let handler = Self::new(
            raw.base.name.clone(),
            raw.base.level,
            raw.filename,
            &raw.when,
            raw.interval,
            raw.backup_count,
        )?;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// Socket
// =============================================================================

/// Ships records to a TCP endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SocketHandlerRaw")]
pub struct SocketHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    pub host: String,
    pub port: u16,
}

impl SocketHandlerConfig {
    pub fn new(
        name: impl Into<String>,
        level: Level,
        host: impl Into<String>,
        port: u16,
    ) -> ConfigResult<Self> {
        let base = HandlerBase::new(name, level)?;
        let host = host.into();
        check_name("handler.host", &host)?;
        if port == 0 {
            return Err(ConfigError::validation("handler.port", "must be in 1..=65535"));
        }
        Ok(Self { base, host, port })
    }
}

impl HandlerVariant for SocketHandlerConfig {
    const CLASS: &'static str = "logging.handlers.SocketHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("host".into(), Value::from(self.host.clone()));
        body.insert("port".into(), Value::from(self.port));
    }
}

handler_common!(SocketHandlerConfig);

#[derive(Deserialize)]
struct SocketHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    host: String,
    port: u16,
}

impl TryFrom<SocketHandlerRaw> for SocketHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: SocketHandlerRaw) -> ConfigResult<Self> {
        let handler = Self::new(raw.base.name.clone(), raw.base.level, raw.host, raw.port)?;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// SMTP
// =============================================================================

/// Mails records to a list of recipients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SmtpHandlerRaw")]
pub struct SmtpHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    pub mailhost: String,
    pub fromaddr: String,
    pub toaddrs: Vec<String>,
    pub subject: String,
    /// `(username, password)`.
    #[serde(default)]
    pub credentials: Option<(String, String)>,
    /// TLS arguments; an empty list enables TLS without a key file.
    #[serde(default)]
    pub secure: Option<Vec<String>>,
}

impl SmtpHandlerConfig {
    pub fn new(
        name: impl Into<String>,
        level: Level,
        mailhost: impl Into<String>,
        fromaddr: impl Into<String>,
        toaddrs: Vec<String>,
        subject: impl Into<String>,
    ) -> ConfigResult<Self> {
        let base = HandlerBase::new(name, level)?;
        let mailhost = mailhost.into();
        let fromaddr = fromaddr.into();
        check_name("handler.mailhost", &mailhost)?;
        check_name("handler.fromaddr", &fromaddr)?;
        if toaddrs.is_empty() || toaddrs.iter().any(|a| a.trim().is_empty()) {
            return Err(ConfigError::validation(
                "handler.toaddrs",
                "must list at least one non-empty address",
            ));
        }
        Ok(Self {
            base,
            mailhost,
            fromaddr,
            toaddrs,
            subject: subject.into(),
            credentials: None,
            secure: None,
        })
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn with_secure(mut self, args: Vec<String>) -> Self {
        self.secure = Some(args);
        self
    }
}

impl HandlerVariant for SmtpHandlerConfig {
    const CLASS: &'static str = "logging.handlers.SMTPHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("mailhost".into(), Value::from(self.mailhost.clone()));
        body.insert("fromaddr".into(), Value::from(self.fromaddr.clone()));
        body.insert("toaddrs".into(), Value::from(self.toaddrs.clone()));
        body.insert("subject".into(), Value::from(self.subject.clone()));
        if let Some((user, password)) = &self.credentials {
            body.insert(
                "credentials".into(),
                Value::from(vec![user.clone(), password.clone()]),
            );
        }
        if let Some(secure) = &self.secure {
            body.insert("secure".into(), Value::from(secure.clone()));
        }
    }
}

handler_common!(SmtpHandlerConfig);

#[derive(Deserialize)]
struct SmtpHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    mailhost: String,
    fromaddr: String,
    toaddrs: Vec<String>,
    subject: String,
    #[serde(default)]
    credentials: Option<(String, String)>,
    #[serde(default)]
    secure: Option<Vec<String>>,
}

impl TryFrom<SmtpHandlerRaw> for SmtpHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: SmtpHandlerRaw) -> ConfigResult<Self> {
        let mut handler = Self::new(
            raw.base.name.clone(),
            raw.base.level,
            raw.mailhost,
            raw.fromaddr,
            raw.toaddrs,
            raw.subject,
        )?;
        handler.credentials = raw.credentials;
        handler.secure = raw.secure;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// Queue
// =============================================================================

/// Hands records to a named queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QueueHandlerRaw")]
pub struct QueueHandlerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    pub queue: String,
}

impl QueueHandlerConfig {
    pub fn new(name: impl Into<String>, level: Level, queue: impl Into<String>) -> ConfigResult<Self> {
        let base = HandlerBase::new(name, level)?;
        let queue = queue.into();
        check_name("handler.queue", &queue)?;
        Ok(Self { base, queue })
    }
}

impl HandlerVariant for QueueHandlerConfig {
    const CLASS: &'static str = "logging.handlers.QueueHandler";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("queue".into(), Value::from(self.queue.clone()));
    }
}

handler_common!(QueueHandlerConfig);

#[derive(Deserialize)]
struct QueueHandlerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    queue: String,
}

impl TryFrom<QueueHandlerRaw> for QueueHandlerConfig {
    type Error = ConfigError;

    fn try_from(raw: QueueHandlerRaw) -> ConfigResult<Self> {
        let handler = Self::new(raw.base.name.clone(), raw.base.level, raw.queue)?;
        Ok(handler.with_base(raw.base))
    }
}

/// Drains a named queue into other handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "QueueListenerRaw")]
pub struct QueueListenerConfig {
    #[serde(flatten)]
    pub base: HandlerBase,
    pub queue: String,
    /// Names of the handlers records are forwarded to.
    pub handlers: Vec<String>,
}

impl QueueListenerConfig {
    pub fn new(
        name: impl Into<String>,
        level: Level,
        queue: impl Into<String>,
        handlers: Vec<String>,
    ) -> ConfigResult<Self> {
        let base = HandlerBase::new(name, level)?;
        let queue = queue.into();
        check_name("handler.queue", &queue)?;
        if handlers.iter().any(|h| h.trim().is_empty()) {
            return Err(ConfigError::validation(
                "handler.handlers",
                "handler names must not be empty",
            ));
        }
        Ok(Self {
            base,
            queue,
            handlers,
        })
    }
}

impl HandlerVariant for QueueListenerConfig {
    const CLASS: &'static str = "logging.handlers.QueueListener";

    fn base(&self) -> &HandlerBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut HandlerBase {
        &mut self.base
    }

    fn render_fields(&self, body: &mut Map<String, Value>) {
        body.insert("queue".into(), Value::from(self.queue.clone()));
        body.insert("handlers".into(), Value::from(self.handlers.clone()));
    }
}

handler_common!(QueueListenerConfig);

#[derive(Deserialize)]
struct QueueListenerRaw {
    #[serde(flatten)]
    base: HandlerBase,
    queue: String,
    handlers: Vec<String>,
}

impl TryFrom<QueueListenerRaw> for QueueListenerConfig {
    type Error = ConfigError;

    fn try_from(raw: QueueListenerRaw) -> ConfigResult<Self> {
        let handler =
            Self::new(raw.base.name.clone(), raw.base.level, raw.queue, raw.handlers)?;
        Ok(handler.with_base(raw.base))
    }
}

// =============================================================================
// Tagged union
// =============================================================================

/// Any handler variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum HandlerConfig {
    Stream(StreamHandlerConfig),
    File(FileHandlerConfig),
    RotatingFile(RotatingFileHandlerConfig),
    TimedRotatingFile(TimedRotatingFileHandlerConfig),
    Socket(SocketHandlerConfig),
    Smtp(SmtpHandlerConfig),
    Queue(QueueHandlerConfig),
    QueueListener(QueueListenerConfig),
}

impl HandlerConfig {
    /// Returns the shared handler fields.
    pub fn base(&self) -> &HandlerBase {
        match self {
            Self::Stream(h) => &h.base,
            Self::File(h) => &h.base,
            Self::RotatingFile(h) => &h.base,
            Self::TimedRotatingFile(h) => &h.base,
            Self::Socket(h) => &h.base,
            Self::Smtp(h) => &h.base,
            Self::Queue(h) => &h.base,
            Self::QueueListener(h) => &h.base,
        }
    }

    /// Returns the handler name.
    pub fn name(&self) -> &str {
        &self.base().name
    }

    /// Returns the fixed class tag of the variant.
    pub fn render_class(&self) -> &'static str {
        match self {
            Self::Stream(h) => h.render_class(),
            Self::File(h) => h.render_class(),
            Self::RotatingFile(h) => h.render_class(),
            Self::TimedRotatingFile(h) => h.render_class(),
            Self::Socket(h) => h.render_class(),
            Self::Smtp(h) => h.render_class(),
            Self::Queue(h) => h.render_class(),
            Self::QueueListener(h) => h.render_class(),
        }
    }

    /// Renders the body without the name key.
    pub fn render(&self) -> Map<String, Value> {
        match self {
            Self::Stream(h) => h.render(),
            Self::File(h) => h.render(),
            Self::RotatingFile(h) => h.render(),
            Self::TimedRotatingFile(h) => h.render(),
            Self::Socket(h) => h.render(),
            Self::Smtp(h) => h.render(),
            Self::Queue(h) => h.render(),
            Self::QueueListener(h) => h.render(),
        }
    }
}

impl Renderable for HandlerConfig {
    fn to_subtree(&self) -> Map<String, Value> {
        single_entry(self.name(), self.render())
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for HandlerConfig {
                fn from(handler: $ty) -> Self {
                    Self::$variant(handler)
                }
            }
        )*
    };
}

impl_from_variant! {
    Stream => StreamHandlerConfig,
    File => FileHandlerConfig,
    RotatingFile => RotatingFileHandlerConfig,
    TimedRotatingFile => TimedRotatingFileHandlerConfig,
    Socket => SocketHandlerConfig,
    Smtp => SmtpHandlerConfig,
    Queue => QueueHandlerConfig,
    QueueListener => QueueListenerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stream_render() {
        let handler = StreamHandlerConfig::new("console", Level::Info)
            .unwrap()
            .with_formatter("std")
            .with_filter("no_health");

        assert_eq!(handler.render_class(), "logging.StreamHandler");
        assert_eq!(
            Value::Object(handler.to_subtree()),
            json!({
                "console": {
                    "class": "logging.StreamHandler",
                    "level": "INFO",
                    "formatter": "std",
                    "stream": "stdout",
                    "filters": ["no_health"]
                }
            })
        );
    }

    #[test]
    fn test_formatter_and_filters_omitted_when_unset() {
        let handler = StreamHandlerConfig::new("console", Level::Debug)
            .unwrap()
            .with_stream("stderr")
            .unwrap();
        let body = handler.render();
        assert!(!body.contains_key("formatter"));
        assert!(!body.contains_key("filters"));
        assert_eq!(body["stream"], "stderr");
    }

    #[test]
    fn test_rotating_file_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/logs/app.log");

        let handler =
            RotatingFileHandlerConfig::new("file", Level::Warning, &path, 1024, 3).unwrap();
        assert!(tmp.path().join("nested/logs").is_dir());

        let body = handler.render();
        assert_eq!(body["class"], "logging.handlers.RotatingFileHandler");
        assert_eq!(body["maxBytes"], 1024);
        assert_eq!(body["backupCount"], 3);
        assert_eq!(body["filename"], path.to_string_lossy().into_owned());
        assert!(!body.contains_key("compression"));
    }

    #[test]
    fn test_rotating_file_compression() {
        let tmp = tempfile::tempdir().unwrap();
        let handler = RotatingFileHandlerConfig::new("f", Level::Info, tmp.path().join("a.log"), 0, 0)
            .unwrap()
            .with_compression("zip")
            .unwrap();
        assert_eq!(handler.render()["compression"], "zip");

        let err = handler.with_compression("7z").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_timed_rotating_validation() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("t.log");

        let handler =
            TimedRotatingFileHandlerConfig::new("t", Level::Info, &file, "Midnight", 1, 7).unwrap();
        assert_eq!(handler.when, "midnight");
        assert_eq!(handler.render()["interval"], 1);

        assert!(TimedRotatingFileHandlerConfig::new("t", Level::Info, &file, "fortnight", 1, 7).is_err());
        assert!(TimedRotatingFileHandlerConfig::new("t", Level::Info, &file, "h", 0, 7).is_err());
        assert_eq!(validate_when("w3").unwrap(), "W3");
    }

    #[test]
    fn test_socket_and_smtp_validation() {
        assert!(SocketHandlerConfig::new("s", Level::Info, "localhost", 0).is_err());
        assert!(SocketHandlerConfig::new("s", Level::Info, "", 9020).is_err());

        let smtp = SmtpHandlerConfig::new(
            "mail",
            Level::Error,
            "smtp.example.com",
            "app@example.com",
            vec!["ops@example.com".into()],
            "Failure",
        )
        .unwrap()
        .with_credentials("app", "secret")
        .with_secure(vec![]);
        let body = smtp.render();
        assert_eq!(body["class"], "logging.handlers.SMTPHandler");
        assert_eq!(body["credentials"], json!(["app", "secret"]));
        assert_eq!(body["secure"], json!([]));

        assert!(SmtpHandlerConfig::new("mail", Level::Error, "h", "f", vec![], "s").is_err());
    }

    #[test]
    fn test_queue_variants() {
        let listener = QueueListenerConfig::new(
            "listener",
            Level::Debug,
            "records",
            vec!["console".into(), "file".into()],
        )
        .unwrap();
        let handler: HandlerConfig = listener.into();
        assert_eq!(handler.name(), "listener");
        assert_eq!(handler.render_class(), "logging.handlers.QueueListener");
        assert_eq!(handler.render()["handlers"], json!(["console", "file"]));

        let queue: HandlerConfig = QueueHandlerConfig::new("q", Level::Debug, "records")
            .unwrap()
            .into();
        assert_eq!(queue.render()["queue"], "records");
    }

    #[test]
    fn test_empty_name_rejected() {
        let err = StreamHandlerConfig::new("  ", Level::Info).unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "handler.name"));
    }

    #[test]
    fn test_deserialize_tagged() {
        let yaml = r#"
type: stream
name: console
level: info
formatter: std
"#;
        let handler: HandlerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(handler.render_class(), "logging.StreamHandler");
        assert_eq!(handler.base().level, Level::Info);
        assert_eq!(handler.base().formatter.as_deref(), Some("std"));
        assert_eq!(handler.render()["stream"], "stdout");
    }

    #[test]
    fn test_deserialize_file_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("never/created/app.log");
        let yaml = format!(
            "type: file\nname: audit\nlevel: warning\nfilters: [no_health]\nfilename: '{}'\n",
            path.display()
        );

        let handler: HandlerConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(tmp.path().join("never/created").is_dir());
        assert_eq!(handler.base().filters, vec!["no_health"]);
        match handler {
            HandlerConfig::File(file) => assert_eq!(file.filename(), path.as_path()),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_deserialize_runs_constructor_checks() {
        let zero_port = "type: socket\nname: s\nlevel: info\nhost: localhost\nport: 0\n";
        assert!(serde_yaml::from_str::<HandlerConfig>(zero_port).is_err());

        let unnamed = "type: socket\nname: ''\nlevel: info\nhost: localhost\nport: 9020\n";
        assert!(serde_yaml::from_str::<HandlerConfig>(unnamed).is_err());

        let no_host = "type: socket\nname: s\nlevel: info\nhost: ''\nport: 9020\n";
        assert!(serde_yaml::from_str::<HandlerConfig>(no_host).is_err());

        let bad_when = r#"{"type": "timed-rotating-file", "name": "t", "level": "INFO",
            "filename": "t.log", "when": "fortnight", "interval": 1, "backupCount": 1}"#;
        assert!(serde_json::from_str::<HandlerConfig>(bad_when).is_err());

        let no_recipients = r#"{"type": "smtp", "name": "m", "level": "ERROR",
            "mailhost": "h", "fromaddr": "f", "toaddrs": [], "subject": "s"}"#;
        assert!(serde_json::from_str::<HandlerConfig>(no_recipients).is_err());
    }

    #[test]
    fn test_with_filename_reruns_guarantor() {
        let tmp = tempfile::tempdir().unwrap();
        let handler = FileHandlerConfig::new("f", Level::Info, tmp.path().join("a.log"))
            .unwrap()
            .with_filename(tmp.path().join("moved/b.log"))
            .unwrap();
        assert!(tmp.path().join("moved").is_dir());
        assert_eq!(handler.filename(), tmp.path().join("moved/b.log"));
        assert_eq!(handler.render()["filename"], path_value(handler.filename()));
    }
}
