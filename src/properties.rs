//! Process-wide system properties and the switches read from them.
//!
//! `SystemProperties` is a shared string map standing in for JVM-style
//! system properties. The override switches (`merge.config.resource`,
//! `merge.config.file`) are read from it at every load, and every other entry
//! forms the property overlay of the default configuration. Keys that are not
//! valid paths are skipped with a warning.
//!
//! Each handle is cheap to clone and shares its map. `SystemProperties::global()`
//! is the process-wide instance; `SystemProperties::new()` creates an isolated
//! one so tests can run side by side.

use crate::config::ConfigTree;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::warn;

/// Switch naming the bundle resource to merge over the defaults.
pub const RESOURCE_SWITCH: &str = "merge.config.resource";

/// Switch naming the filesystem path to merge over everything else.
pub const FILE_SWITCH: &str = "merge.config.file";

/// Shared, thread-safe string property map.
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    inner: Arc<RwLock<BTreeMap<String, String>>>,
}

impl SystemProperties {
    /// Create an isolated, empty property map.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide property map.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<SystemProperties> = OnceLock::new();
        GLOBAL.get_or_init(SystemProperties::new).clone()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Set a property, returning the previous value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<String> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }

    pub fn clear(&self) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Copy of every property, sorted by key.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace every property with a previously taken snapshot.
    pub fn restore(&self, snapshot: BTreeMap<String, String>) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// All properties as a tree, dotted keys expanded.
    ///
    /// Keys that are not valid paths (e.g. `a..b`) are skipped with a warning
    /// rather than failing the whole overlay.
    pub fn to_tree(&self) -> ConfigTree {
        self.to_tree_without(&[])
    }

    /// Like [`to_tree`](Self::to_tree), leaving out the `excluded` keys.
    pub fn to_tree_without(&self, excluded: &[&str]) -> ConfigTree {
        let snapshot = self.snapshot();
        let mut pairs = Vec::with_capacity(snapshot.len());
        for (key, value) in snapshot {
            if excluded.contains(&key.as_str()) {
                continue;
            }
            if let Err(e) = crate::config::parse_path(&key) {
                warn!(property = %key, error = %e, "ignoring system property with invalid key");
                continue;
            }
            pairs.push((key, Value::String(value)));
        }
        // Every key was validated above.
        ConfigTree::from_dotted_pairs(pairs).unwrap_or_default()
    }
}

/// Read-only view of the external switches.
pub trait Switches: Send + Sync {
    /// Current value of a switch, if set.
    fn switch(&self, name: &str) -> Option<String>;
}

impl Switches for SystemProperties {
    fn switch(&self, name: &str) -> Option<String> {
        self.get(name)
    }
}

impl Switches for BTreeMap<String, String> {
    fn switch(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Switches read from system properties, falling back to the environment.
///
/// The environment variable name is the switch upper-cased with dots turned
/// into underscores: `merge.config.file` → `MERGE_CONFIG_FILE`.
#[derive(Debug, Clone)]
pub struct PropertySwitches {
    properties: SystemProperties,
    env_fallback: bool,
}

impl PropertySwitches {
    pub fn new(properties: SystemProperties) -> Self {
        Self {
            properties,
            env_fallback: false,
        }
    }

    pub fn with_env_fallback(mut self, enabled: bool) -> Self {
        self.env_fallback = enabled;
        self
    }

    pub fn properties(&self) -> &SystemProperties {
        &self.properties
    }
}

impl Switches for PropertySwitches {
    fn switch(&self, name: &str) -> Option<String> {
        if let Some(value) = self.properties.get(name) {
            return Some(value);
        }
        if self.env_fallback {
            return std::env::var(env_var_name(name)).ok();
        }
        None
    }
}

/// Environment variable consulted for a switch.
pub fn env_var_name(switch: &str) -> String {
    switch.replace('.', "_").to_ascii_uppercase()
}
