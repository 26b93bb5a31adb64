//! Routing events through a backend built from an assembled tree.

use logtree_core::prelude::*;
use logtree_runtime::{BackendBuilder, TreeLoader};
use serde_json::json;

fn file_tree(dir: &std::path::Path) -> ConfigurationTree {
    let plain = FormatterConfig::new("plain", "%(levelname)s %(message)s").unwrap();
    let app_file = FileHandlerConfig::new("app_file", Level::Debug, dir.join("logs/app.log"))
        .unwrap()
        .with_formatter("plain");
    let root_file = FileHandlerConfig::new("root_file", Level::Info, dir.join("logs/root.log"))
        .unwrap()
        .with_formatter("plain");
    let app = LoggerConfig::new("app.db", Level::Debug)
        .unwrap()
        .with_handler("app_file");

    assemble(
        &["root_file"],
        "warning",
        false,
        true,
        &[&plain],
        &[&app_file, &root_file],
        &[&app],
    )
    .unwrap()
}

#[test]
fn test_events_reach_listed_handlers_only() {
    let tmp = tempfile::tempdir().unwrap();
    let tree = file_tree(tmp.path());

    let (subscriber, backend) = BackendBuilder::from_tree(&tree).build().unwrap();
    tracing::subscriber::with_default(subscriber, || {
        tracing::debug!(target: "app::db", "pool opened");
        tracing::info!(target: "other", "ignored by root");
        tracing::warn!(target: "other", "disk almost full");
    });

    let app_log = std::fs::read_to_string(tmp.path().join("logs/app.log")).unwrap();
    let root_log = std::fs::read_to_string(tmp.path().join("logs/root.log")).unwrap();

    assert!(app_log.contains("pool opened"));
    assert!(!app_log.contains("disk almost full"));
    assert!(root_log.contains("disk almost full"));
    assert!(!root_log.contains("ignored by root"));
    // app.db does not propagate and does not list the root handler.
    assert!(!root_log.contains("pool opened"));

    assert_eq!(backend.sink("root_file").unwrap().directives, "warn,app::db=off");
}

#[test]
fn test_loaded_tree_round_trips_through_backend() {
    let tmp = tempfile::tempdir().unwrap();
    let overlay = json!({"loggers": {"app.db": {"level": "error"}}});

    let tree = TreeLoader::new()
        .base(file_tree(tmp.path()))
        .search_path(tmp.path())
        .without_env()
        .overlay(overlay)
        .load()
        .unwrap();
    assert_eq!(tree.logger("app.db").unwrap()["level"], "ERROR");

    let (_subscriber, backend) = BackendBuilder::from_tree(&tree).build().unwrap();
    let rebuilt = backend.reconstruct();

    assert_eq!(rebuilt.loggers, tree.loggers);
    assert_eq!(rebuilt.root, tree.root);
    assert_eq!(rebuilt.formatters.len(), 1);
    assert_eq!(
        rebuilt.handler("app_file").unwrap()["filename"],
        tree.handler("app_file").unwrap()["filename"]
    );
}
