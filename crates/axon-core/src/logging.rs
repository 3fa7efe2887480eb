//! Subscriber setup for processes that embed Axon.
//!
//! The runtime itself only emits `tracing` events: workflow construction at
//! `info`, configuration and pool activity at `debug`, one event per executed
//! unit at `trace`. Binaries, benches and tests install a subscriber here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{CoreError, Result};

/// Verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Every unit execution.
    Trace,
    /// Parameter dispatch, pool hits, unit appends.
    Debug,
    /// Workflow construction.
    Info,
    /// Warnings.
    Warn,
    /// Errors.
    Error,
    /// Nothing.
    Off,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Off => "off",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// Multi-line output with span context.
    Pretty,
    /// Newline-delimited JSON.
    Json,
}

/// Logging configuration, usually embedded in a host application's config.
///
/// ```json
/// { "level": "warn", "targets": { "axon_workflow": "trace" }, "format": "json" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default threshold for every target.
    pub level: LogLevel,
    /// Per-target thresholds, e.g. `axon_units` or `axon_core::memory_pool`.
    pub targets: BTreeMap<String, LogLevel>,
    /// Output format.
    pub format: LogFormat,
    /// Include thread ids; useful with batch execution.
    pub thread_ids: bool,
    /// Include file and line of each event.
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            targets: BTreeMap::new(),
            format: LogFormat::default(),
            thread_ids: false,
            source_location: false,
        }
    }
}

impl LoggingConfig {
    /// Set the default threshold.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Override the threshold for one target.
    pub fn with_target(mut self, target: impl Into<String>, level: LogLevel) -> Self {
        self.targets.insert(target.into(), level);
        self
    }

    /// Set the output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Trace every Axon crate, warn elsewhere, with threads and locations.
    pub fn verbose() -> Self {
        Self {
            thread_ids: true,
            source_location: true,
            ..Self::default()
        }
        .with_level(LogLevel::Warn)
        .with_target("axon_core", LogLevel::Trace)
        .with_target("axon_units", LogLevel::Trace)
        .with_target("axon_workflow", LogLevel::Trace)
    }

    /// The `EnvFilter` directive string for this config, e.g.
    /// `warn,axon_workflow=trace`.
    pub fn directives(&self) -> String {
        let mut directives = vec![self.level.to_string()];
        directives.extend(
            self.targets
                .iter()
                .map(|(target, level)| format!("{target}={level}")),
        );
        directives.join(",")
    }

    fn filter(&self) -> Result<EnvFilter> {
        if let Ok(filter) = EnvFilter::try_from_default_env() {
            return Ok(filter);
        }
        EnvFilter::try_new(self.directives())
            .map_err(|e| CoreError::Configuration(format!("invalid log filter: {e}")))
    }
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG`, when set and valid, replaces the configured thresholds.
/// Returns `Ok(false)` when another subscriber is already installed, which
/// makes repeated calls from tests harmless.
///
/// ```no_run
/// use axon_core::logging::{init_logging, LoggingConfig};
///
/// init_logging(&LoggingConfig::verbose())?;
/// # Ok::<(), axon_core::CoreError>(())
/// ```
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let filter = config.filter()?;
    let registry = tracing_subscriber::registry().with(filter);
    let layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(config.thread_ids)
        .with_file(config.source_location)
        .with_line_number(config.source_location);

    let installed = match config.format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
    Ok(installed.is_ok())
}
