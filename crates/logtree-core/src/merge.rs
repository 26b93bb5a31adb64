//! Deterministic deep merge.
//!
//! Combination rules, applied key by key:
//!
//! 1. keys only in the overlay are copied in;
//! 2. two mappings merge recursively;
//! 3. two lists concatenate, base first, duplicates kept;
//! 4. anything else (scalars, or mismatched kinds) takes the overlay value.
//!
//! [`deep_merge`] works on any JSON-shaped value and cannot fail. Merging into
//! a [`ConfigurationTree`] additionally checks that the result still has the
//! tree shape; [`merge_or_base`] and [`merge_all`] fall back to the base when
//! it does not.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::MergeFailure;
use crate::tree::{ConfigurationTree, TREE_VERSION};

/// Sections whose entries must stay mappings after a merge.
const ENTITY_SECTIONS: [&str; 3] = ["formatters", "handlers", "loggers"];

/// Merges `overlay` onto `base`, returning a new value.
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => Value::Object(merge_maps(base, overlay)),
        (Value::Array(base), Value::Array(overlay)) => {
            Value::Array(base.iter().chain(overlay).cloned().collect())
        }
        (_, overlay) => overlay.clone(),
    }
}

/// Mapping form of [`deep_merge`]. Base keys keep their position; new keys
/// are appended in overlay order.
pub fn merge_maps(base: &Map<String, Value>, overlay: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = base.clone();
    for (key, overlay_value) in overlay {
        let value = match merged.get(key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value.clone(),
        };
        merged.insert(key.clone(), value);
    }
    merged
}

impl ConfigurationTree {
    /// Merges a JSON-shaped fragment onto this tree.
    ///
    /// Fails when the overlay is not a mapping, names a version other than 1,
    /// or turns a section (or an entity inside one) into a non-mapping.
    pub fn merge(&self, overlay: &Value) -> Result<ConfigurationTree, MergeFailure> {
        let overlay = overlay
            .as_object()
            .ok_or_else(|| MergeFailure::new("<root>", format!("overlay is {}", kind(overlay))))?;

        if let Some(version) = overlay.get("version")
            && version.as_u64() != Some(u64::from(TREE_VERSION))
        {
            return Err(MergeFailure::new(
                "version",
                format!("overlay declares version {version}, only {TREE_VERSION} is supported"),
            ));
        }

        let base = match self.to_value() {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(MergeFailure::new(
                    "<root>",
                    format!("base serialized to {}", kind(&other)),
                ));
            }
            Err(e) => return Err(MergeFailure::new("<root>", e.to_string())),
        };

        let merged = merge_maps(&base, overlay);
        check_shape(&merged)?;

        let tree = ConfigurationTree::from_value(Value::Object(merged))
            .map_err(|e| MergeFailure::new("<root>", e.to_string()))?;
        debug!(keys = overlay.len(), "Merged overlay into configuration tree");
        Ok(tree)
    }

    /// Merges another full tree onto this one.
    pub fn merge_tree(&self, overlay: &ConfigurationTree) -> Result<ConfigurationTree, MergeFailure> {
        let overlay = overlay
            .to_value()
            .map_err(|e| MergeFailure::new("<root>", e.to_string()))?;
        self.merge(&overlay)
    }
}

fn check_shape(merged: &Map<String, Value>) -> Result<(), MergeFailure> {
    if let Some(root) = merged.get("root")
        && !root.is_object()
    {
        return Err(MergeFailure::new(
            "root",
            format!("expected a mapping, found {}", kind(root)),
        ));
    }

    for section in ENTITY_SECTIONS {
        let Some(value) = merged.get(section) else {
            continue;
        };
        let Some(entries) = value.as_object() else {
            return Err(MergeFailure::new(
                section,
                format!("expected a mapping, found {}", kind(value)),
            ));
        };
        if let Some((name, entry)) = entries.iter().find(|(_, entry)| !entry.is_object()) {
            return Err(MergeFailure::new(
                format!("{section}.{name}"),
                format!("expected a mapping, found {}", kind(entry)),
            ));
        }
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

/// Merges `overlay` onto `base`, keeping `base` if the merge fails.
///
/// The failure is logged at `warn`.
pub fn merge_or_base(base: &ConfigurationTree, overlay: &Value) -> ConfigurationTree {
    match base.merge(overlay) {
        Ok(tree) => tree,
        Err(failure) => {
            warn!(path = %failure.path, reason = %failure.reason, "Merge failed, keeping base tree");
            base.clone()
        }
    }
}

/// Result of folding several overlays onto a base.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The layered tree. Failed steps left the accumulated tree unchanged.
    pub tree: ConfigurationTree,
    /// `(overlay index, failure)` for every step that was skipped.
    pub failures: Vec<(usize, MergeFailure)>,
}

impl MergeOutcome {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn into_tree(self) -> ConfigurationTree {
        self.tree
    }
}

/// Folds `overlays` onto `base` left to right, one pass per overlay.
///
/// A failing overlay is logged and skipped; later overlays still apply.
pub fn merge_all<'a, I>(base: &ConfigurationTree, overlays: I) -> MergeOutcome
where
    I: IntoIterator<Item = &'a Value>,
{
    let mut tree = base.clone();
    let mut failures = Vec::new();

    for (index, overlay) in overlays.into_iter().enumerate() {
        match tree.merge(overlay) {
            Ok(merged) => tree = merged,
            Err(failure) => {
                warn!(
                    overlay = index,
                    path = %failure.path,
                    reason = %failure.reason,
                    "Skipping overlay that failed to merge"
                );
                failures.push((index, failure));
            }
        }
    }

    MergeOutcome { tree, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Level;
    use serde_json::json;

    #[test]
    fn test_lists_concatenate_without_dedup() {
        let merged = deep_merge(&json!({"h": ["a", "b"]}), &json!({"h": ["b", "c"]}));
        assert_eq!(merged, json!({"h": ["a", "b", "b", "c"]}));
    }

    #[test]
    fn test_nested_mappings_recurse() {
        let base = json!({"a": {"b": {"c": 1, "d": 2}}, "keep": true});
        let overlay = json!({"a": {"b": {"d": 3, "e": 4}}, "new": "x"});
        assert_eq!(
            deep_merge(&base, &overlay),
            json!({"a": {"b": {"c": 1, "d": 3, "e": 4}}, "keep": true, "new": "x"})
        );
    }

    #[test]
    fn test_kind_conflict_overlay_wins() {
        let base = json!({"a": {"x": 1}, "b": [1], "c": "s", "d": 1});
        let overlay = json!({"a": [2], "b": {"y": 2}, "c": null, "d": "one"});
        assert_eq!(deep_merge(&base, &overlay), overlay);
    }

    #[test]
    fn test_identity() {
        let x = json!({"a": {"b": [1, 2]}, "c": 3});
        assert_eq!(deep_merge(&x, &json!({})), x);
        assert_eq!(deep_merge(&json!({}), &x), x);
    }

    #[test]
    fn test_inputs_untouched() {
        let base = json!({"h": ["a"]});
        let overlay = json!({"h": ["b"]});
        let _ = deep_merge(&base, &overlay);
        assert_eq!(base, json!({"h": ["a"]}));
        assert_eq!(overlay, json!({"h": ["b"]}));
    }

    #[test]
    fn test_layering_order_matters() {
        let a = json!({"x": {"y": 1}});
        let b = json!({"x": {"z": 2}});
        let c = json!({"x": {"y": 3}});
        assert_eq!(
            deep_merge(&deep_merge(&a, &b), &c),
            deep_merge(&a, &deep_merge(&b, &c))
        );

        // A scalar in the middle layer breaks associativity.
        let d = json!({"x": [1]});
        let e = json!({"x": "flat"});
        let f = json!({"x": [2]});
        assert_eq!(deep_merge(&deep_merge(&d, &e), &f), json!({"x": [2]}));
        assert_eq!(deep_merge(&d, &deep_merge(&e, &f)), json!({"x": [1, 2]}));
    }

    fn base_tree() -> ConfigurationTree {
        ConfigurationTree::builder()
            .root(["console"], "info")
            .unwrap()
            .handler(&crate::RawSubtree::entry(
                "console",
                json!({"class": "logging.StreamHandler", "level": "INFO", "stream": "stdout"}),
            ))
            .build()
    }

    #[test]
    fn test_tree_merge_layers_sections() {
        let merged = base_tree()
            .merge(&json!({
                "root": {"handlers": ["file"], "level": "debug"},
                "handlers": {"console": {"level": "ERROR"}}
            }))
            .unwrap();

        assert_eq!(merged.root.handlers, vec!["console", "file"]);
        assert_eq!(merged.root.level, Some(Level::Debug));
        assert_eq!(merged.handler("console").unwrap()["level"], "ERROR");
        assert_eq!(merged.handler("console").unwrap()["stream"], "stdout");
        assert_eq!(merged.version(), 1);
    }

    #[test]
    fn test_tree_merge_carries_extra_top_level_keys() {
        let merged = ConfigurationTree::default()
            .merge(&json!({
                "filters": {"no_health": {"name": "health"}},
                "incremental": true
            }))
            .unwrap();
        assert_eq!(merged.extra["incremental"], true);
        assert_eq!(merged.extra["filters"]["no_health"]["name"], "health");

        let layered = merged
            .merge(&json!({"filters": {"only_app": {"name": "app"}}, "incremental": false}))
            .unwrap();
        let value = layered.to_value().unwrap();
        assert_eq!(value["incremental"], false);
        assert_eq!(value["filters"]["no_health"]["name"], "health");
        assert_eq!(value["filters"]["only_app"]["name"], "app");
        assert_eq!(ConfigurationTree::from_value(value).unwrap(), layered);
    }

    #[test]
    fn test_tree_merge_identity() {
        let tree = base_tree();
        assert_eq!(tree.merge(&json!({})).unwrap(), tree);
        assert_eq!(ConfigurationTree::default().merge_tree(&tree).unwrap().handlers, tree.handlers);
    }

    #[test]
    fn test_tree_merge_rejects_version_change() {
        let err = base_tree().merge(&json!({"version": 2})).unwrap_err();
        assert_eq!(err.path, "version");
        assert!(base_tree().merge(&json!({"version": 1})).is_ok());
    }

    #[test]
    fn test_tree_merge_rejects_broken_sections() {
        let err = base_tree().merge(&json!({"handlers": ["console"]})).unwrap_err();
        assert_eq!(err.path, "handlers");

        let err = base_tree()
            .merge(&json!({"handlers": {"console": "off"}}))
            .unwrap_err();
        assert_eq!(err.path, "handlers.console");

        let err = base_tree().merge(&json!(["not", "a", "mapping"])).unwrap_err();
        assert_eq!(err.path, "<root>");

        let err = base_tree().merge(&json!({"root": {"level": "loud"}})).unwrap_err();
        assert_eq!(err.path, "<root>");
    }

    #[test]
    fn test_merge_or_base_falls_back() {
        let base = base_tree();
        assert_eq!(merge_or_base(&base, &json!({"root": []})), base);
    }

    #[test]
    fn test_merge_all_skips_failed_steps() {
        let overlays = [
            json!({"loggers": {"app": {"level": "DEBUG", "handlers": ["console"], "propagate": false}}}),
            json!({"version": 7}),
            json!({"disable_existing_loggers": true}),
        ];
        let outcome = merge_all(&base_tree(), &overlays);

        assert!(!outcome.is_clean());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, 1);
        assert!(outcome.tree.logger("app").is_some());
        assert!(outcome.tree.disable_existing_loggers);
    }
}
