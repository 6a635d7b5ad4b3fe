//! Configuration loader with switch-selected overrides.
//!
//! Every [`MergableConfigLoader::load`] call re-reads the default tree and
//! folds in up to two overrides, lowest to highest priority:
//! 1. **Defaults** - the parser's default tree (reference, application,
//!    environment and system properties)
//! 2. **Resource** - named by `merge.config.resource`
//! 3. **File** - named by `merge.config.file`
//!
//! A resource that does not resolve is an error. A file path that is missing
//! or names a directory is skipped.

use super::parser::{ConfigParser, DefaultConfigParser, ParserOptions};
use super::tree::ConfigTree;
use crate::error::Result;
use crate::properties::{FILE_SWITCH, PropertySwitches, RESOURCE_SWITCH, Switches};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Override source for one channel.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OverrideSpec {
    #[default]
    None,
    ResourcePath(String),
    FilePath(PathBuf),
}

impl OverrideSpec {
    /// Resource override from a raw switch value; unset or empty means none.
    pub fn resource(value: Option<String>) -> Self {
        match value {
            Some(path) if !path.trim().is_empty() => OverrideSpec::ResourcePath(path),
            _ => OverrideSpec::None,
        }
    }

    /// File override from a raw switch value; unset or empty means none.
    ///
    /// Surrounding whitespace is dropped, as for resource names.
    pub fn file(value: Option<String>) -> Self {
        match value.as_deref().map(str::trim) {
            Some(path) if !path.is_empty() => OverrideSpec::FilePath(PathBuf::from(path)),
            _ => OverrideSpec::None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, OverrideSpec::None)
    }
}

/// Both override channels for a single load.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Overrides {
    pub resource: OverrideSpec,
    pub file: OverrideSpec,
}

impl Overrides {
    /// Read both channels from `switches`.
    pub fn from_switches(switches: &dyn Switches) -> Self {
        Self {
            resource: OverrideSpec::resource(switches.switch(RESOURCE_SWITCH)),
            file: OverrideSpec::file(switches.switch(FILE_SWITCH)),
        }
    }
}

/// Anything that can produce a freshly merged configuration.
pub trait MergableConfigFactory: Send + Sync {
    fn load(&self) -> Result<ConfigTree>;
}

/// Loads the default tree and applies the resource and file overrides.
///
/// `load` holds an internal lock for its whole duration because it resets
/// and repopulates the parser's shared cache.
pub struct MergableConfigLoader {
    parser: Arc<dyn ConfigParser>,
    switches: Arc<dyn Switches>,
    lock: Mutex<()>,
}

impl MergableConfigLoader {
    pub fn new(parser: Arc<dyn ConfigParser>, switches: Arc<dyn Switches>) -> Self {
        Self {
            parser,
            switches,
            lock: Mutex::new(()),
        }
    }

    /// Loader over the global system properties and `./resources`.
    pub fn with_defaults() -> Self {
        Self::with_options(ParserOptions::default())
    }

    /// Loader whose switches are read from the same properties the parser overlays.
    pub fn with_options(options: ParserOptions) -> Self {
        let switches = PropertySwitches::new(options.properties.clone())
            .with_env_fallback(options.switch_env_fallback);
        Self::new(
            Arc::new(DefaultConfigParser::new(options)),
            Arc::new(switches),
        )
    }

    pub fn parser(&self) -> &Arc<dyn ConfigParser> {
        &self.parser
    }

    /// The overrides the switches currently select.
    pub fn current_overrides(&self) -> Overrides {
        Overrides::from_switches(self.switches.as_ref())
    }

    /// Load with the overrides currently selected by the switches.
    pub fn load(&self) -> Result<ConfigTree> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let overrides = self.current_overrides();
        self.load_locked(&overrides)
    }

    /// Load with explicitly supplied overrides instead of reading the switches.
    pub fn load_with(&self, overrides: &Overrides) -> Result<ConfigTree> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.load_locked(overrides)
    }

    fn load_locked(&self, overrides: &Overrides) -> Result<ConfigTree> {
        self.parser.invalidate_cache();
        let default_tree = self.parser.load_default()?;
        let merged = self.merge_resource(default_tree, &overrides.resource)?;
        self.merge_file(merged, &overrides.file)
    }

    fn merge_resource(&self, fallback: ConfigTree, spec: &OverrideSpec) -> Result<ConfigTree> {
        let OverrideSpec::ResourcePath(path) = spec else {
            return Ok(fallback);
        };
        let overlay = self.parser.parse_resource(path)?;
        info!(resource = %path, "merging resource override");
        Ok(overlay.with_fallback(&fallback))
    }

    fn merge_file(&self, fallback: ConfigTree, spec: &OverrideSpec) -> Result<ConfigTree> {
        let OverrideSpec::FilePath(path) = spec else {
            return Ok(fallback);
        };
        if !path.exists() {
            debug!(path = %path.display(), "override file does not exist, skipping");
            return Ok(fallback);
        }
        if path.is_dir() {
            debug!(path = %path.display(), "override file is a directory, skipping");
            return Ok(fallback);
        }
        let overlay = self.parser.parse_file(path)?;
        info!(path = %path.display(), "merging file override");
        Ok(overlay.with_fallback(&fallback))
    }
}

impl Default for MergableConfigLoader {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl MergableConfigFactory for MergableConfigLoader {
    fn load(&self) -> Result<ConfigTree> {
        MergableConfigLoader::load(self)
    }
}
