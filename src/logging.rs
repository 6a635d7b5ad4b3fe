//! Logging setup for applications embedding the loader.
//!
//! The library itself only emits `tracing` events: switch resolution and
//! skipped overrides at debug, applied overrides at info. This module installs
//! a `tracing_subscriber` fmt subscriber writing to stdout, stderr or a file.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    /// Append to a file
    File(PathBuf),
}

impl LogTarget {
    /// Parse a target spec: `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a file name.
    pub fn parse(spec: &str) -> Self {
        match spec {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(PathBuf::from(filename)),
        }
    }
}

/// Build the filter: `RUST_LOG` when set, otherwise `level`.
fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install a global subscriber for `target`.
///
/// Calling this again once a subscriber is installed is a no-op.
pub fn init_logging(level: Level, target: &LogTarget) -> Result<()> {
    if tracing::dispatcher::has_been_set() {
        tracing::debug!("global subscriber already installed");
        return Ok(());
    }

    let installed = match target {
        LogTarget::Off => return Ok(()),
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(build_filter(level))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(build_filter(level))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(build_filter(level))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    if installed.is_err() {
        tracing::debug!("global subscriber already installed");
    }
    Ok(())
}
