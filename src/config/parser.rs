//! Default-tree provider and source parsing.
//!
//! The [`ConfigParser`] trait is the seam between the loader and whatever
//! actually reads configuration. [`DefaultConfigParser`] assembles the
//! default tree from:
//! 1. **Reference** - `reference.*` resource (lowest priority)
//! 2. **Application** - `application.*` resource
//! 3. **Environment** - `CONFIG_FORCE_*` variables, when enabled
//! 4. **System properties** - every entry of [`SystemProperties`] except the
//!    override switches (highest)
//!
//! The assembled tree is cached until [`ConfigParser::invalidate_cache`] is
//! called.

use super::merge::merge_all;
use super::sources::{ResourceLocator, parse_file_path};
use super::tree::ConfigTree;
use crate::error::{ConfigError, Result};
use crate::properties::{FILE_SWITCH, RESOURCE_SWITCH, SystemProperties};
use arc_swap::ArcSwapOption;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Parses configuration sources and supplies the process-default tree.
pub trait ConfigParser: Send + Sync {
    /// The default tree. Fails with a parse error on a malformed base source.
    fn load_default(&self) -> Result<ConfigTree>;

    /// Drop any cached default tree so the next `load_default` re-reads it.
    fn invalidate_cache(&self);

    /// Parse a bundle resource. Fails with `NotFound` if it does not resolve.
    fn parse_resource(&self, path: &str) -> Result<ConfigTree>;

    /// Parse a file whose existence the caller already checked.
    fn parse_file(&self, path: &Path) -> Result<ConfigTree>;
}

/// Options for [`DefaultConfigParser`].
#[derive(Debug, Clone)]
pub struct ParserOptions {
    /// Where resources are looked up
    pub locator: ResourceLocator,
    /// Base name of the application resource
    pub base_name: String,
    /// Base name of the reference resource
    pub reference_name: String,
    /// Properties forming the top overlay
    pub properties: SystemProperties,
    /// Whether `env_prefix` variables override the application resource
    pub env_overrides: bool,
    pub env_prefix: String,
    /// Whether unset switches are read from `MERGE_CONFIG_*` variables
    pub switch_env_fallback: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            locator: ResourceLocator::new().with_root(default_resource_root()),
            base_name: "application".to_string(),
            reference_name: "reference".to_string(),
            properties: SystemProperties::global(),
            env_overrides: false,
            env_prefix: "CONFIG_FORCE_".to_string(),
            switch_env_fallback: false,
        }
    }
}

fn default_resource_root() -> PathBuf {
    PathBuf::from("resources")
}

/// Filesystem- and resource-backed parser with a cached default tree.
pub struct DefaultConfigParser {
    options: ParserOptions,
    cache: ArcSwapOption<ConfigTree>,
}

impl DefaultConfigParser {
    pub fn new(options: ParserOptions) -> Self {
        Self {
            options,
            cache: ArcSwapOption::empty(),
        }
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    /// Whether a default tree is currently cached.
    pub fn is_cached(&self) -> bool {
        self.cache.load().is_some()
    }

    /// Parse `name.*` if present, otherwise an empty tree.
    fn parse_optional(&self, name: &str) -> Result<ConfigTree> {
        match self.options.locator.find_any(name)? {
            Some(resource) => {
                debug!(resource = %resource.name, origin = %resource.origin, "loaded base resource");
                resource.parse()
            }
            None => {
                debug!(resource = %name, "base resource absent");
                Ok(ConfigTree::empty())
            }
        }
    }

    fn build_default(&self) -> Result<ConfigTree> {
        let reference = self.parse_optional(&self.options.reference_name)?;
        let application = self.parse_optional(&self.options.base_name)?;

        let env = if self.options.env_overrides {
            env_overlay(&self.options.env_prefix, std::env::vars())
        } else {
            ConfigTree::empty()
        };

        // The override switches select sources; they are not settings.
        let properties = self
            .options
            .properties
            .to_tree_without(&[RESOURCE_SWITCH, FILE_SWITCH]);

        Ok(merge_all([reference, application, env, properties]))
    }
}

impl Default for DefaultConfigParser {
    fn default() -> Self {
        Self::new(ParserOptions::default())
    }
}

impl ConfigParser for DefaultConfigParser {
    fn load_default(&self) -> Result<ConfigTree> {
        if let Some(cached) = self.cache.load_full() {
            return Ok((*cached).clone());
        }
        let tree = self.build_default()?;
        self.cache.store(Some(Arc::new(tree.clone())));
        Ok(tree)
    }

    fn invalidate_cache(&self) {
        self.cache.store(None);
    }

    fn parse_resource(&self, path: &str) -> Result<ConfigTree> {
        self.options.locator.resolve(path)?.parse()
    }

    fn parse_file(&self, path: &Path) -> Result<ConfigTree> {
        parse_file_path(path)
    }
}

/// Build the environment overlay from variables starting with `prefix`.
///
/// The rest of the name maps to a path: `_` → `.`, `__` → `-`, `___` → `_`.
/// `CONFIG_FORCE_service_one_size=5` sets `service.one.size`. Names that do
/// not map to a valid path are skipped.
pub fn env_overlay<I>(prefix: &str, vars: I) -> ConfigTree
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut pairs = Vec::new();
    for (name, value) in vars {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        match env_name_to_path(rest) {
            Ok(path) => pairs.push((path, Value::String(value))),
            Err(e) => warn!(variable = %name, error = %e, "ignoring environment override"),
        }
    }
    ConfigTree::from_dotted_pairs(pairs).unwrap_or_default()
}

fn env_name_to_path(name: &str) -> Result<String> {
    let mut path = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '_' {
            path.push(ch);
            continue;
        }
        let mut run = 1;
        while chars.peek() == Some(&'_') {
            chars.next();
            run += 1;
        }
        match run {
            1 => path.push('.'),
            2 => path.push('-'),
            3 => path.push('_'),
            _ => {
                return Err(ConfigError::bad_path(
                    name,
                    format!("{} consecutive underscores", run),
                ));
            }
        }
    }
    super::tree::parse_path(&path)?;
    Ok(path)
}
