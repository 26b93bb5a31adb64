//! Layered tree loading using figment.
//!
//! Every source is read into a JSON-shaped fragment on its own and folded onto
//! the base tree with the deep merge from `logtree-core`, so lists concatenate
//! and mappings recurse the same way regardless of where a fragment came from.
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: enables `logtree.toml`
//! - `yaml-config`: enables `logtree.yaml` / `logtree.yml`
//!
//! JSON files (`logtree.json`) are always recognised.
//!
//! # Layering Order (lowest to highest)
//!
//! 1. Programmatic base tree
//! 2. Main config file (`logtree.toml` / `logtree.yaml` / `logtree.json`)
//! 3. Profile-specific file (`logtree.{profile}.toml`, ...)
//! 4. Environment variables (`LOGTREE_*`)
//! 5. Programmatic overlays and presets, in the order they were added
//!
//! # Environment Variable Mapping
//!
//! Variables use the `LOGTREE_` prefix with `__` as the nesting separator.
//! Keys are lower-cased.
//!
//! - `LOGTREE_ROOT__LEVEL=debug` → `root.level = "debug"`
//! - `LOGTREE_DISABLE_EXISTING_LOGGERS=true` → `disable_existing_loggers = true`
//! - `LOGTREE_LOGGERS__APP__LEVEL=error` → `loggers.app.level = "error"`
//! - `LOGTREE_ROOT__HANDLERS=[console,file]` → `root.handlers = ["console", "file"]`
//!
//! List-valued keys need the bracket syntax; a bare `console` is a string and
//! does not fit `root.handlers`. Each variable is layered on its own, in key
//! order, so a variable that does not fit the tree is skipped with a warning
//! without discarding the others.
//!
//! # Example
//!
//! ```rust,ignore
//! use logtree_runtime::TreeLoader;
//!
//! let tree = TreeLoader::new()
//!     .base(app_tree)
//!     .profile("production")
//!     .preset(logtree_core::preset::console(Level::Info)?)
//!     .load()?;
//! ```

use std::path::{Path, PathBuf};

use figment::Figment;
#[cfg(feature = "toml-config")]
use figment::providers::Toml;
#[cfg(feature = "yaml-config")]
use figment::providers::Yaml;
use figment::providers::{Env, Format, Json};
use logtree_core::{ConfigurationTree, Preset, merge_all, normalize_levels};
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::error::{RuntimeError, RuntimeResult};

/// Prefix of recognised environment variables.
pub const ENV_PREFIX: &str = "LOGTREE_";

/// Configuration profile selecting environment-specific overlay files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Profile {
    /// Development profile (default).
    #[default]
    Development,
    /// Production profile.
    Production,
    /// Custom profile name.
    Custom(String),
}

impl Profile {
    /// Returns the profile name as a string.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Custom(name) => name,
        }
    }

    /// Parses a profile name, accepting `dev`/`prod` shorthands.
    pub fn parse(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "development" | "dev" => Self::Development,
            other => Self::Custom(other.to_string()),
        }
    }

    /// Reads `LOGTREE_PROFILE`, defaulting to Development.
    pub fn from_env() -> Self {
        std::env::var(format!("{ENV_PREFIX}PROFILE"))
            .map(|p| Self::parse(&p))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builds a [`ConfigurationTree`] from a base tree and layered sources.
pub struct TreeLoader {
    /// Tree every source is merged onto.
    base: ConfigurationTree,
    /// Configuration profile.
    profile: Profile,
    /// Search paths for configuration files.
    search_paths: Vec<PathBuf>,
    /// Whether to load environment variables.
    load_env: bool,
    /// Specific config file to load (overrides search).
    config_file: Option<PathBuf>,
    /// Programmatic fragments applied last.
    overlays: Vec<Value>,
}

impl Default for TreeLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeLoader {
    /// Creates a loader starting from the empty skeleton.
    pub fn new() -> Self {
        Self {
            base: ConfigurationTree::default(),
            profile: Profile::from_env(),
            search_paths: Vec::new(),
            load_env: true,
            config_file: None,
            overlays: Vec::new(),
        }
    }

    /// Sets the tree all sources are layered onto.
    pub fn base(mut self, tree: ConfigurationTree) -> Self {
        self.base = tree;
        self
    }

    /// Sets the configuration profile.
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.profile = Profile::parse(profile.as_ref());
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.search_paths.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds current directory to search paths.
    pub fn with_current_dir(self) -> Self {
        if let Ok(cwd) = std::env::current_dir() {
            self.search_path(cwd)
        } else {
            self
        }
    }

    /// Adds user config directory to search paths.
    pub fn with_user_config_dir(self) -> Self {
        if let Some(config_dir) = dirs::config_dir() {
            self.search_path(config_dir.join("logtree"))
        } else {
            self
        }
    }

    /// Sets a specific configuration file to load (skips the search).
    pub fn file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Enables loading environment variables (default: true).
    pub fn with_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.load_env = false;
        self
    }

    /// Adds a fragment applied after files and environment.
    pub fn overlay(mut self, fragment: Value) -> Self {
        self.overlays.push(fragment);
        self
    }

    /// Adds a preset's fragment applied after files and environment.
    pub fn preset(mut self, preset: Preset) -> Self {
        debug!(preset = %preset.name, "Queued preset");
        self.overlays.push(preset.fragment);
        self
    }

    /// Layers every source and canonicalizes level names.
    ///
    /// A fragment that would break the tree shape is skipped with a warning;
    /// unreadable sources and unknown level names are errors.
    pub fn load(self) -> RuntimeResult<ConfigurationTree> {
        let mut fragments = Vec::new();

        if let Some(path) = &self.config_file {
            if !path.exists() {
                return Err(RuntimeError::FileNotFound(path.clone()));
            }
            info!(path = %path.display(), "Loading configuration file");
            fragments.push(read_file(path)?);
        } else {
            fragments.extend(self.search_files()?);
        }

        if self.load_env {
            trace!("Loading environment variables with {ENV_PREFIX} prefix");
            fragments.extend(read_env());
        }

        fragments.extend(self.overlays);

        let outcome = merge_all(&self.base, &fragments);
        if !outcome.is_clean() {
            debug!(
                skipped = outcome.failures.len(),
                "Some configuration fragments were not applied"
            );
        }

        let mut tree = outcome.into_tree();
        normalize_levels(&mut tree)?;

        debug!(
            profile = %self.profile,
            handlers = tree.handlers.len(),
            loggers = tree.loggers.len(),
            "Configuration tree loaded"
        );
        Ok(tree)
    }

    /// Resolves the effective list of search paths.
    fn resolve_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            let mut paths = Vec::new();
            if let Ok(cwd) = std::env::current_dir() {
                paths.push(cwd);
            }
            if let Some(config_dir) = dirs::config_dir() {
                paths.push(config_dir.join("logtree"));
            }
            paths
        } else {
            self.search_paths.clone()
        }
    }

    /// Finds the first base file across search paths plus its profile variant.
    fn search_files(&self) -> RuntimeResult<Vec<Value>> {
        for search_path in self.resolve_search_paths() {
            for ext in enabled_extensions() {
                let base_path = search_path.join(format!("logtree.{ext}"));
                if !base_path.exists() {
                    continue;
                }
                info!(path = %base_path.display(), "Loading configuration file");
                let mut fragments = vec![read_file(&base_path)?];

                let profile_path =
                    search_path.join(format!("logtree.{}.{ext}", self.profile.as_str()));
                if profile_path.exists() {
                    debug!(path = %profile_path.display(), "Loading profile-specific config");
                    fragments.push(read_file(&profile_path)?);
                }
                return Ok(fragments);
            }
        }

        debug!("No configuration file found, using base tree");
        Ok(Vec::new())
    }
}

/// File extensions searched, in priority order.
fn enabled_extensions() -> Vec<&'static str> {
    let mut exts = Vec::new();
    #[cfg(feature = "toml-config")]
    exts.push("toml");
    #[cfg(feature = "yaml-config")]
    exts.extend(["yaml", "yml"]);
    exts.push("json");
    exts
}

/// Reads one file into a fragment, dispatching on its extension.
fn read_file(path: &Path) -> RuntimeResult<Value> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
    let figment = match ext {
        #[cfg(feature = "toml-config")]
        "toml" => Figment::from(Toml::file(path)),
        #[cfg(feature = "yaml-config")]
        "yaml" | "yml" => Figment::from(Yaml::file(path)),
        "json" => Figment::from(Json::file(path)),
        _ => return Err(RuntimeError::UnsupportedFormat(ext.to_string())),
    };
    figment
        .extract::<Value>()
        .map_err(|e| RuntimeError::extract(path.display().to_string(), e))
}

/// Reads each `LOGTREE_*` variable into its own fragment, sorted by key.
fn read_env() -> Vec<Value> {
    let mut keys: Vec<String> = Env::prefixed(ENV_PREFIX)
        .ignore(&["profile"])
        .iter()
        .map(|(key, _)| key.as_str().to_string())
        .collect();
    keys.sort();
    keys.dedup();

    keys.iter()
        .filter_map(|key| {
            let env = Env::prefixed(ENV_PREFIX).only(&[key.as_str()]).split("__");
            match Figment::from(env).extract::<Value>() {
                Ok(value) if value.is_object() => Some(value),
                Ok(_) => None,
                Err(e) => {
                    warn!(variable = %format!("{ENV_PREFIX}{key}"), error = %e, "Ignoring unreadable environment variable");
                    None
                }
            }
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
