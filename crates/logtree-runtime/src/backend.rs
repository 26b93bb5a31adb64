//! Installing a configuration tree as a `tracing` subscriber.
//!
//! Every handler in the tree becomes one `fmt` layer with its own writer and a
//! per-layer [`EnvFilter`]. Loggers do not exist as objects in `tracing`; they
//! are expressed as `target=level` directives on the filters of the handlers
//! they reach. Dotted logger names are mapped to `::` paths, so the logger
//! `app.db` routes events whose target is `app::db` (or below).
//!
//! # Example
//!
//! ```rust,ignore
//! use logtree_runtime::{BackendBuilder, TreeLoader};
//!
//! let tree = TreeLoader::new().base(app_tree).load()?;
//! let backend = BackendBuilder::from_tree(&tree).install()?;
//! tracing::info!(target: "app", "ready");
//! ```

use std::path::PathBuf;

use logtree_core::{ConfigurationTree, Level, ensure_parent_dir, validate_logger_name};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use crate::error::{RuntimeError, RuntimeResult};

/// Level used for the root when the tree does not set one.
pub const DEFAULT_ROOT_LEVEL: Level = Level::Warning;

/// A boxed per-handler layer.
pub type SinkLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Subscriber produced by [`BackendBuilder::build`].
pub type BackendSubscriber = Layered<Vec<SinkLayer>, Registry>;

// =============================================================================
// Records
// =============================================================================

/// Where a sink's output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkDestination {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
    /// A file that never rotates.
    File(PathBuf),
    /// A file rotated on a time schedule.
    Rolling {
        path: PathBuf,
        rotation: String,
        max_files: Option<usize>,
    },
    /// A network, mail or queue handler that no layer writes to.
    Unwired,
}

/// One handler as the backend saw it.
#[derive(Debug, Clone)]
pub struct SinkRecord {
    pub name: String,
    pub class: String,
    pub level: Level,
    /// The rendered formatter body the handler referenced, if it resolved.
    pub formatter: Option<Map<String, Value>>,
    /// Remaining handler fields (stream, filename, rotation settings, ...).
    pub settings: Map<String, Value>,
    pub destination: SinkDestination,
    /// The filter directives installed for this sink.
    pub directives: String,
}

impl SinkRecord {
    /// Whether a layer actually writes for this handler.
    pub fn is_wired(&self) -> bool {
        self.destination != SinkDestination::Unwired
    }
}

/// One logger as the backend saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerRecord {
    pub name: String,
    pub level: Level,
    pub handlers: Vec<String>,
    pub propagate: bool,
}

/// Record of what [`BackendBuilder`] installed.
///
/// Only this record is consulted by
/// [`reconstruct`](crate::introspect::reconstruct_from_active_backend); the
/// subscriber itself cannot be inspected.
#[derive(Debug, Clone)]
pub struct ActiveBackend {
    pub root_level: Level,
    pub root_handlers: Vec<String>,
    pub disable_existing_loggers: bool,
    pub propagate: bool,
    pub sinks: Vec<SinkRecord>,
    pub loggers: Vec<LoggerRecord>,
    /// Top-level tree keys the backend does not interpret.
    pub extra: Map<String, Value>,
}

impl ActiveBackend {
    /// Looks up a sink by handler name.
    pub fn sink(&self, name: &str) -> Option<&SinkRecord> {
        self.sinks.iter().find(|s| s.name == name)
    }

    /// Looks up a logger by name.
    pub fn logger(&self, name: &str) -> Option<&LoggerRecord> {
        self.loggers.iter().find(|l| l.name == name)
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Translates a [`ConfigurationTree`] into tracing layers.
pub struct BackendBuilder<'a> {
    tree: &'a ConfigurationTree,
}

impl<'a> BackendBuilder<'a> {
    /// Creates a builder for `tree`.
    pub fn from_tree(tree: &'a ConfigurationTree) -> Self {
        Self { tree }
    }

    /// Builds the subscriber without installing it.
    pub fn build(&self) -> RuntimeResult<(BackendSubscriber, ActiveBackend)> {
        let tree = self.tree;
        let root_level = tree.root.level.unwrap_or(DEFAULT_ROOT_LEVEL);
        let loggers = logger_records(tree, root_level);

        for name in &tree.root.handlers {
            if !tree.handlers.contains_key(name) {
                warn!(handler = %name, "Root refers to an unknown handler, skipping");
            }
        }
        for logger in &loggers {
            for name in &logger.handlers {
                if !tree.handlers.contains_key(name) {
                    warn!(logger = %logger.name, handler = %name, "Logger refers to an unknown handler, skipping");
                }
            }
        }

        let mut layers: Vec<SinkLayer> = Vec::new();
        let mut sinks = Vec::new();

        for (name, body) in &tree.handlers {
            let Some(body) = body.as_object() else {
                warn!(handler = %name, "Handler body is not a mapping, skipping");
                continue;
            };
            let is_root = tree.root.handlers.iter().any(|h| h == name);
            let mut record = sink_record(tree, name, body)?;
            record.directives = directives_for(name, record.level, is_root, root_level, &loggers);

            if let Some(writer) = open_writer(&record)? {
                let filter =
                    EnvFilter::try_new(&record.directives).map_err(|e| RuntimeError::Filter {
                        handler: name.clone(),
                        reason: e.to_string(),
                    })?;
                layers.push(sink_layer(&record, writer, filter));
            }
            debug!(
                handler = %name,
                class = %record.class,
                directives = %record.directives,
                wired = record.is_wired(),
                "Configured sink"
            );
            sinks.push(record);
        }

        if tree.disable_existing_loggers {
            debug!("disable_existing_loggers has no tracing counterpart, ignoring");
        }

        let backend = ActiveBackend {
            root_level,
            root_handlers: tree.root.handlers.clone(),
            disable_existing_loggers: tree.disable_existing_loggers,
            propagate: tree.propagate,
            sinks,
            loggers,
            extra: tree.extra.clone(),
        };
        Ok((tracing_subscriber::registry().with(layers), backend))
    }

    /// Builds the subscriber and sets it as the global default.
    pub fn install(&self) -> RuntimeResult<ActiveBackend> {
        let (subscriber, backend) = self.build()?;
        subscriber
            .try_init()
            .map_err(|e| RuntimeError::Init(e.to_string()))?;
        debug!(sinks = backend.sinks.len(), "Installed logging backend");
        Ok(backend)
    }
}

/// Installs `tree` as the global subscriber, warning instead of failing.
pub fn init_from_tree(tree: &ConfigurationTree) -> Option<ActiveBackend> {
    match BackendBuilder::from_tree(tree).install() {
        Ok(backend) => Some(backend),
        Err(e) => {
            eprintln!("logtree: failed to install logging backend: {e}");
            None
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Maps a dotted logger name onto a tracing target.
pub fn logger_target(name: &str) -> String {
    name.replace('.', "::")
}

fn parse_level(value: Option<&Value>, fallback: Level) -> Level {
    value
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(fallback)
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn logger_records(tree: &ConfigurationTree, root_level: Level) -> Vec<LoggerRecord> {
    tree.loggers
        .iter()
        .filter_map(|(name, body)| {
            if let Err(e) = validate_logger_name(name) {
                warn!(logger = %name, error = %e, "Logger name cannot be routed, skipping");
                return None;
            }
            let body = body.as_object()?;
            Some(LoggerRecord {
                name: name.clone(),
                level: parse_level(body.get("level"), root_level),
                handlers: string_list(body.get("handlers")),
                propagate: body
                    .get("propagate")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            })
        })
        .collect()
}

/// The stricter of two levels, as a directive level name.
fn stricter(a: Level, b: Level) -> String {
    let level = if a.severity() >= b.severity() { a } else { b };
    level.to_tracing_level().to_string().to_lowercase()
}

/// Builds the filter directives for one handler.
///
/// A root handler sees every target at the root level, loggers that
/// propagate at their own level, and non-propagating loggers only if they
/// list it. Other handlers see nothing but the loggers that list them.
fn directives_for(
    handler: &str,
    handler_level: Level,
    is_root: bool,
    root_level: Level,
    loggers: &[LoggerRecord],
) -> String {
    let mut directives = vec![if is_root {
        stricter(root_level, handler_level)
    } else {
        "off".to_string()
    }];

    for logger in loggers {
        let target = logger_target(&logger.name);
        let listed = logger.handlers.iter().any(|h| h == handler);
        if listed || (is_root && logger.propagate) {
            directives.push(format!("{target}={}", stricter(logger.level, handler_level)));
        } else if is_root {
            directives.push(format!("{target}=off"));
        }
    }
    directives.join(",")
}

fn sink_record(
    tree: &ConfigurationTree,
    name: &str,
    body: &Map<String, Value>,
) -> RuntimeResult<SinkRecord> {
    let class = body
        .get("class")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let level = parse_level(body.get("level"), Level::Trace);
    let formatter = match body.get("formatter").and_then(Value::as_str) {
        Some(reference) => {
            let found = tree.formatter(reference).cloned();
            if found.is_none() {
                warn!(handler = %name, formatter = %reference, "Unknown formatter, using default format");
            }
            found
        }
        None => None,
    };
    let settings: Map<String, Value> = body
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "class" | "level" | "formatter"))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let destination = destination_for(name, &class, &settings)?;
    Ok(SinkRecord {
        name: name.to_string(),
        class,
        level,
        formatter,
        settings,
        destination,
        directives: String::new(),
    })
}

fn file_path(name: &str, settings: &Map<String, Value>) -> RuntimeResult<PathBuf> {
    let raw = settings
        .get("filename")
        .and_then(Value::as_str)
        .ok_or_else(|| RuntimeError::Appender {
            handler: name.to_string(),
            reason: "missing filename".to_string(),
        })?;
    Ok(ensure_parent_dir(raw)?)
}

/// Picks a rotation for a `when` code. Seconds and weekdays have no exact
/// counterpart and fall back to the nearest coarser schedule.
fn rotation_for(name: &str, when: &str) -> &'static str {
    match when.to_ascii_uppercase().as_str() {
        "M" => "minutely",
        "H" => "hourly",
        "D" | "MIDNIGHT" => "daily",
        "S" => {
            warn!(handler = %name, "Per-second rotation is not supported, rotating minutely");
            "minutely"
        }
        other => {
            warn!(handler = %name, when = %other, "Unsupported rotation schedule, rotating daily");
            "daily"
        }
    }
}

fn destination_for(
    name: &str,
    class: &str,
    settings: &Map<String, Value>,
) -> RuntimeResult<SinkDestination> {
    let short = class.rsplit('.').next().unwrap_or(class);
    let destination = match short {
        "StreamHandler" => {
            match settings
                .get("stream")
                .and_then(Value::as_str)
                .unwrap_or("stdout")
            {
                "stderr" | "ext://sys.stderr" => SinkDestination::Stderr,
                "stdout" | "ext://sys.stdout" => SinkDestination::Stdout,
                other => {
                    warn!(handler = %name, stream = %other, "Unknown stream, writing to stdout");
                    SinkDestination::Stdout
                }
            }
        }
        "FileHandler" => SinkDestination::File(file_path(name, settings)?),
        "RotatingFileHandler" => {
            warn!(handler = %name, "Size-based rotation is not performed, writing without rotation");
            SinkDestination::File(file_path(name, settings)?)
        }
        "TimedRotatingFileHandler" => {
            let when = settings.get("when").and_then(Value::as_str).unwrap_or("H");
            if settings.get("interval").and_then(Value::as_u64).unwrap_or(1) != 1 {
                warn!(handler = %name, "Rotation interval is not supported, rotating every period");
            }
            SinkDestination::Rolling {
                path: file_path(name, settings)?,
                rotation: rotation_for(name, when).to_string(),
                max_files: settings
                    .get("backupCount")
                    .and_then(Value::as_u64)
                    .filter(|n| *n > 0)
                    .map(|n| n as usize),
            }
        }
        _ => {
            warn!(handler = %name, class = %class, "Handler type is not wired to an output");
            SinkDestination::Unwired
        }
    };
    Ok(destination)
}

fn open_appender(
    name: &str,
    path: &std::path::Path,
    rotation: Rotation,
    max_files: Option<usize>,
) -> RuntimeResult<RollingFileAppender> {
    let appender_err = |reason: String| RuntimeError::Appender {
        handler: name.to_string(),
        reason,
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| std::path::Path::new("."));
    let file_name = path
        .file_name()
        .and_then(|f| f.to_str())
        .ok_or_else(|| appender_err(format!("invalid file name: {}", path.display())))?;

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_name);
    if let Some(n) = max_files {
        builder = builder.max_log_files(n);
    }
    builder.build(dir).map_err(|e| appender_err(e.to_string()))
}

fn open_writer(record: &SinkRecord) -> RuntimeResult<Option<BoxMakeWriter>> {
    let writer = match &record.destination {
        SinkDestination::Stdout => BoxMakeWriter::new(std::io::stdout),
        SinkDestination::Stderr => BoxMakeWriter::new(std::io::stderr),
        SinkDestination::File(path) => {
            BoxMakeWriter::new(open_appender(&record.name, path, Rotation::NEVER, None)?)
        }
        SinkDestination::Rolling {
            path,
            rotation,
            max_files,
        } => {
            let rotation = match rotation.as_str() {
                "minutely" => Rotation::MINUTELY,
                "hourly" => Rotation::HOURLY,
                _ => Rotation::DAILY,
            };
            BoxMakeWriter::new(open_appender(&record.name, path, rotation, *max_files)?)
        }
        SinkDestination::Unwired => return Ok(None),
    };
    Ok(Some(writer))
}

/// Display switches derived from a format string's field references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FormatFields {
    time: bool,
    level: bool,
    target: bool,
    thread: bool,
    file: bool,
    line: bool,
}

impl FormatFields {
    /// Fields shown when no formatter is attached.
    const DEFAULT: Self = Self {
        time: true,
        level: true,
        target: true,
        thread: false,
        file: false,
        line: false,
    };

    fn from_format(format: &str) -> Self {
        // Matches `%(name)`, `{name` and `$name` references alike.
        let has = |field: &str| format.contains(field);
        Self {
            time: has("asctime") || has("created"),
            level: has("levelname") || has("levelno"),
            target: has("(name)") || has("{name") || has("$name") || has("module"),
            thread: has("thread"),
            file: has("filename") || has("pathname"),
            line: has("lineno"),
        }
    }

    fn for_record(record: &SinkRecord) -> Self {
        record
            .formatter
            .as_ref()
            .and_then(|f| f.get("format"))
            .and_then(Value::as_str)
            .map_or(Self::DEFAULT, Self::from_format)
    }
}

fn sink_layer(record: &SinkRecord, writer: BoxMakeWriter, filter: EnvFilter) -> SinkLayer {
    let fields = FormatFields::for_record(record);
    let ansi = matches!(
        record.destination,
        SinkDestination::Stdout | SinkDestination::Stderr
    );

    macro_rules! configure_layer {
        ($layer:expr) => {
            $layer
                .with_writer(writer)
                .with_ansi(ansi)
                .with_level(fields.level)
                .with_target(fields.target)
                .with_thread_names(fields.thread)
                .with_file(fields.file)
                .with_line_number(fields.line)
                .with_filter(filter)
                .boxed()
        };
    }

    if fields.time {
        configure_layer!(fmt::layer())
    } else {
        configure_layer!(fmt::layer().without_time())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn logger(name: &str, level: Level, handlers: &[&str], propagate: bool) -> LoggerRecord {
        LoggerRecord {
            name: name.to_string(),
            level,
            handlers: handlers.iter().map(|h| h.to_string()).collect(),
            propagate,
        }
    }

    #[test]
    fn test_logger_target() {
        assert_eq!(logger_target("app.db.pool"), "app::db::pool");
        assert_eq!(logger_target("app"), "app");
    }

    #[test]
    fn test_root_handler_directives() {
        let loggers = [
            logger("app", Level::Debug, &["console"], false),
            logger("lib", Level::Error, &[], true),
            logger("noisy", Level::Info, &["file"], false),
        ];
        let directives = directives_for("console", Level::Info, true, Level::Warning, &loggers);
        assert_eq!(directives, "warn,app=info,lib=error,noisy=off");
    }

    #[test]
    fn test_non_root_handler_directives() {
        let loggers = [
            logger("app.db", Level::Critical, &["file"], false),
            logger("other", Level::Debug, &[], true),
        ];
        let directives = directives_for("file", Level::Trace, false, Level::Info, &loggers);
        assert_eq!(directives, "off,app::db=error");
    }

    #[test]
    fn test_format_fields() {
        let fields = FormatFields::from_format("%(asctime)s %(name)s %(message)s");
        assert!(fields.time && fields.target);
        assert!(!fields.level && !fields.line);

        let brace = FormatFields::from_format("{levelname} {filename}:{lineno} {message}");
        assert!(brace.level && brace.file && brace.line);
        assert!(!brace.time && !brace.target);
    }

    #[test]
    fn test_destinations() {
        let stream = json!({"stream": "ext://sys.stderr"});
        let dest = destination_for("c", "logging.StreamHandler", stream.as_object().unwrap()).unwrap();
        assert_eq!(dest, SinkDestination::Stderr);

        let socket = json!({"host": "localhost", "port": 9020});
        let dest =
            destination_for("s", "logging.handlers.SocketHandler", socket.as_object().unwrap())
                .unwrap();
        assert_eq!(dest, SinkDestination::Unwired);

        let tmp = tempfile::tempdir().unwrap();
        let timed = json!({
            "filename": tmp.path().join("logs/app.log"),
            "when": "midnight",
            "interval": 1,
            "backupCount": 7
        });
        let dest = destination_for(
            "t",
            "logging.handlers.TimedRotatingFileHandler",
            timed.as_object().unwrap(),
        )
        .unwrap();
        assert_eq!(
            dest,
            SinkDestination::Rolling {
                path: tmp.path().join("logs/app.log"),
                rotation: "daily".to_string(),
                max_files: Some(7),
            }
        );
        assert!(tmp.path().join("logs").is_dir());
    }

    #[test]
    fn test_file_handler_without_filename() {
        let err = destination_for("f", "logging.FileHandler", &Map::new()).unwrap_err();
        assert!(matches!(err, RuntimeError::Appender { ref handler, .. } if handler == "f"));
    }

    #[test]
    fn test_unroutable_logger_names_are_skipped() {
        let mut tree = ConfigurationTree::default();
        tree.root.handlers = vec!["console".to_string()];
        tree.handlers.insert(
            "console".to_string(),
            json!({"class": "logging.StreamHandler", "level": "INFO"}),
        );
        tree.loggers.insert(
            "app,db=trace".to_string(),
            json!({"level": "DEBUG", "handlers": ["console"]}),
        );
        tree.loggers
            .insert("app".to_string(), json!({"level": "DEBUG", "handlers": ["console"]}));

        let (_subscriber, backend) = BackendBuilder::from_tree(&tree).build().unwrap();
        assert_eq!(backend.loggers.len(), 1);
        assert!(backend.logger("app").is_some());
        assert_eq!(backend.sink("console").unwrap().directives, "warn,app=info");
    }

    #[test]
    fn test_build_records_unknown_references() {
        let mut tree = ConfigurationTree::default();
        tree.root.handlers = vec!["missing".to_string()];
        tree.handlers.insert(
            "mail".to_string(),
            json!({"class": "logging.handlers.SMTPHandler", "level": "ERROR"}),
        );

        let (_subscriber, backend) = BackendBuilder::from_tree(&tree).build().unwrap();
        assert_eq!(backend.root_level, DEFAULT_ROOT_LEVEL);
        assert_eq!(backend.sinks.len(), 1);
        assert!(!backend.sink("mail").unwrap().is_wired());
    }
}
