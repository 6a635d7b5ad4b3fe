//! Layered configuration with switch-selected overrides.
//!
//! Consolidates configuration from four tiers, lowest to highest priority:
//! 1. **Defaults** - `reference.*` then `application.*` resources
//! 2. **Overlay** - `CONFIG_FORCE_*` environment variables (opt-in) and
//!    system properties
//! 3. **Resource** - the resource named by `merge.config.resource`
//! 4. **File** - the file named by `merge.config.file`
//!
//! ## Merge Strategy
//! - Objects: deep merge key by key, at any depth
//! - Lists, scalars and nulls: the higher tier replaces the lower one
//!
//! ## Switches
//! - `merge.config.resource` - Resource path; must resolve when set
//! - `merge.config.file` - Filesystem path; skipped when missing or a directory

mod loader;
mod merge;
mod parser;
mod sources;
mod tree;
mod typed;
pub mod units;

pub use loader::{MergableConfigFactory, MergableConfigLoader, OverrideSpec, Overrides};
pub use merge::{deep_merge, merge_all, with_fallback};
pub use parser::{ConfigParser, DefaultConfigParser, ParserOptions, env_overlay};
pub use sources::{
    Format, ResolvedResource, ResourceLocator, ResourceOrigin, parse_file_path, parse_properties,
    parse_str,
};
pub use tree::{ConfigTree, parse_path, render_path, value_type_name};
