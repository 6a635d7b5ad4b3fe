//! Overridable configuration loading.
//!
//! Loads a default configuration tree and merges optional resource and file
//! overrides over it, selected at runtime by system-property switches.

pub mod config;
pub mod error;
pub mod logging;
pub mod properties;

pub use config::{ConfigTree, MergableConfigFactory, MergableConfigLoader};
pub use error::{ConfigError, Result};
pub use properties::SystemProperties;
