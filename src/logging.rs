// src/logging.rs

//! Logging setup for `buildgate` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BUILDGATE_LOG` environment variable (e.g. "info", "debug")
//! 3. `debug = true` in the config file selects `debug`
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that stdout only carries dispatch verdicts.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

/// Explicit diagnostic toggle taken from the `debug` config field.
///
/// Every component that emits diagnostic messages holds a copy of this and
/// logs through [`diag!`](crate::diag).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Diagnostics {
    enabled: bool,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }
}

/// Emit a `debug!` event only when the given [`Diagnostics`] is enabled.
#[macro_export]
macro_rules! diag {
    ($diag:expr, $($arg:tt)+) => {
        if $diag.enabled() {
            ::tracing::debug!($($arg)+);
        }
    };
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>, config_debug: bool) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("BUILDGATE_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(if config_debug {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            }),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
