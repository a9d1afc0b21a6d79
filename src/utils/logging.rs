//! Logging setup
//!
//! Events go through `tracing`; this module installs the global
//! `tracing-subscriber` formatter. `RUST_LOG`, when set, takes precedence
//! over the configured level.

use std::fmt;
use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level accepted on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!(
                "unknown log level '{}', expected trace, debug, info, warn or error",
                other
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_directive())
    }
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Minimum level for every target
    pub level: LogLevel,
    /// Emit a span and event per HTTP request (tower-http emits these at debug)
    pub request_traces: bool,
    /// Print the module path of each event
    pub include_target: bool,
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            request_traces: false,
            include_target: false,
            ansi_colors: true,
        }
    }
}

impl LogConfig {
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Debug level, request traces and targets; for local troubleshooting
    pub fn verbose() -> Self {
        Self {
            level: LogLevel::Debug,
            request_traces: true,
            include_target: true,
            ansi_colors: true,
        }
    }

    /// Filter directives equivalent to this config, in `RUST_LOG` syntax
    pub fn directives(&self) -> String {
        let mut directives = self.level.as_directive().to_string();
        if self.request_traces && self.level.to_tracing_level() < Level::DEBUG {
            directives.push_str(",tower_http=debug");
        }
        directives
    }
}

/// Install the global subscriber
///
/// Fails if a global subscriber has already been installed or `RUST_LOG`
/// does not parse.
pub fn init_logging(config: &LogConfig) -> Result<(), String> {
    let filter = match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(env) if !env.trim().is_empty() => EnvFilter::try_new(env),
        _ => EnvFilter::try_new(config.directives()),
    }
    .map_err(|e| format!("Invalid log filter: {}", e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .compact()
        .try_init()
        .map_err(|e| format!("Failed to initialize logging: {}", e))
}
