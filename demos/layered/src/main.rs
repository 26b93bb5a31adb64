//! Layered Logging Demo
//!
//! Assembles an application tree, layers presets, config files and
//! `LOGTREE_*` environment variables over it, installs the result into
//! `tracing` and saves what was installed.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package logtree-layered-demo -- --log-dir ./logs --out ./logs/tree.json
//!
//! # Select logtree.production.toml next to logtree.toml
//! LOGTREE_PROFILE=production cargo run --package logtree-layered-demo
//!
//! # Override a logger from the environment
//! LOGTREE_LOGGERS__APP__LEVEL=error cargo run --package logtree-layered-demo
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use logtree::core::validate_references;
use logtree::prelude::*;
use tracing::{debug, error, info, warn};

/// Builds, layers, installs and saves a logging configuration tree.
#[derive(Parser)]
#[command(name = "logtree-layered-demo")]
#[command(about = "Layered logging configuration demo")]
struct Cli {
    /// Directory for log files
    #[arg(short, long, default_value = "logs")]
    log_dir: PathBuf,

    /// Configuration profile (default: LOGTREE_PROFILE or development)
    #[arg(short, long)]
    profile: Option<String>,

    /// Where to save the installed tree
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Replace an existing file at --out
    #[arg(long)]
    overwrite: bool,
}

// ============================================================================
// Tree
// ============================================================================

fn app_tree(log_dir: &std::path::Path) -> Result<ConfigurationTree> {
    let log_dir = logtree::core::ensure_dir(log_dir)?;

    let verbose = FormatterConfig::new(
        "verbose",
        "%(asctime)s %(name)s %(levelname)s %(filename)s:%(lineno)d %(message)s",
    )?
    .with_datefmt("%Y-%m-%d %H:%M:%S");
    let console = StreamHandlerConfig::new("console", Level::Info)?
        .with_stream("stderr")?
        .with_formatter("verbose");
    let audit = TimedRotatingFileHandlerConfig::new(
        "audit",
        Level::Info,
        log_dir.join("audit.log"),
        "midnight",
        1,
        7,
    )?
    .with_formatter("verbose");
    let alerts = SmtpHandlerConfig::new(
        "alerts",
        Level::Critical,
        "localhost",
        "app@example.com",
        vec!["ops@example.com".to_string()],
        "Application failure",
    )?;

    let app = LoggerConfig::new("app", Level::Debug)?.with_handler("console");
    let audit_logger = LoggerConfig::new("app.audit", Level::Info)?
        .with_handlers(["audit", "alerts"])
        .with_propagate(true);
    validate_logger(&audit_logger)?;

    Ok(assemble(
        &["console"],
        "warning",
        false,
        true,
        &[&verbose],
        &[&console, &audit, &alerts],
        &[&app, &audit_logger],
    )?)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let base = app_tree(&cli.log_dir)?;
    let mut loader = TreeLoader::new()
        .base(base)
        .with_current_dir()
        .with_user_config_dir()
        .preset(preset::rotating_file(cli.log_dir.join("app.log"), Level::Info)?);
    if let Some(profile) = &cli.profile {
        loader = loader.profile(profile);
    }
    let tree = loader.load()?;

    let backend = BackendBuilder::from_tree(&tree).install()?;
    info!(target: "app", sinks = backend.sinks.len(), "Logging installed");

    for dangling in validate_references(&tree) {
        warn!(target: "app", "{dangling}");
    }
    for sink in backend.sinks.iter().filter(|s| !s.is_wired()) {
        debug!(target: "app", handler = %sink.name, "Sink recorded without output");
    }
    info!(target: "app::audit", user = "demo", "Audit trail entry");
    error!(target: "third_party", "Only the root handlers see this");

    if let Some(out) = &cli.out {
        let snapshot = backend.reconstruct();
        let path = save_tree(&snapshot, out, cli.overwrite)?;
        info!(target: "app", path = %path.display(), "Saved installed tree");
    }

    Ok(())
}
