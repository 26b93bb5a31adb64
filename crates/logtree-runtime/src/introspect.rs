//! Rebuilding a configuration tree from an installed backend.
//!
//! The subscriber keeps no names for its formatters, so formatter identity is
//! recovered by comparing format strings: handlers whose formatters share a
//! format end up pointing at one entry, even if the original tree had two.
//! Formatters are renamed `formatter_0`, `formatter_1`, ... in the order the
//! handlers are visited.

use logtree_core::ConfigurationTree;
use serde_json::{Map, Value};

use crate::backend::ActiveBackend;

impl ActiveBackend {
    /// Rebuilds the tree this backend was installed from, as far as the
    /// record allows.
    pub fn reconstruct(&self) -> ConfigurationTree {
        let mut tree = ConfigurationTree::default();
        tree.disable_existing_loggers = self.disable_existing_loggers;
        tree.propagate = self.propagate;
        tree.root.handlers = self.root_handlers.clone();
        tree.root.level = Some(self.root_level);
        tree.extra = self.extra.clone();

        let mut known_formats: Vec<String> = Vec::new();

        for sink in &self.sinks {
            let mut body = Map::new();
            body.insert("class".into(), Value::from(sink.class.clone()));
            body.insert("level".into(), Value::from(sink.level.as_str()));

            if let Some(formatter) = &sink.formatter {
                let format = formatter
                    .get("format")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let index = match known_formats.iter().position(|f| *f == format) {
                    Some(index) => index,
                    None => {
                        known_formats.push(format);
                        let index = known_formats.len() - 1;
                        tree.formatters
                            .insert(formatter_name(index), Value::Object(formatter.clone()));
                        index
                    }
                };
                body.insert("formatter".into(), Value::from(formatter_name(index)));
            }

            body.extend(sink.settings.clone());
            tree.handlers.insert(sink.name.clone(), Value::Object(body));
        }

        for logger in &self.loggers {
            let mut body = Map::new();
            body.insert("level".into(), Value::from(logger.level.as_str()));
            body.insert("handlers".into(), Value::from(logger.handlers.clone()));
            body.insert("propagate".into(), Value::from(logger.propagate));
            tree.loggers.insert(logger.name.clone(), Value::Object(body));
        }

        tree
    }
}

fn formatter_name(index: usize) -> String {
    format!("formatter_{index}")
}

/// Rebuilds a tree from what `backend` recorded at installation.
pub fn reconstruct_from_active_backend(backend: &ActiveBackend) -> ConfigurationTree {
    backend.reconstruct()
}
