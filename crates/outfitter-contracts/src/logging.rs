//! Logger adapter and tracing setup
//!
//! Handlers log through the [`Logger`] trait carried on the
//! [`HandlerContext`](crate::HandlerContext). The default backend forwards to
//! `tracing`; surfaces may wrap it (the MCP server also forwards to the client).

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, prelude::*};

use crate::error::OutfitterError;

/// Log severity, ordered from most to least verbose
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for LogLevel {
    type Err = OutfitterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(OutfitterError::validation(format!("Invalid log level: {s}"))),
        }
    }
}

/// Structured logging capability handed to handlers
///
/// The core only calls through this trait; backends are supplied by
/// [`create_logger`] or by a surface binder.
pub trait Logger: Send + Sync {
    /// Emit one event.
    fn log(&self, level: LogLevel, message: &str, fields: &Map<String, Value>);

    fn trace(&self, message: &str) {
        self.log(LogLevel::Trace, message, &Map::new());
    }

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message, &Map::new());
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message, &Map::new());
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message, &Map::new());
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message, &Map::new());
    }
}

/// Settings for [`create_logger`]
#[derive(Debug, Clone, Default)]
pub struct LoggerConfig {
    /// Logger name, recorded on every event
    pub name: String,
    /// Minimum level; `None` silences the logger
    pub level: Option<LogLevel>,
    /// Fields bound to every event (e.g. `requestId`)
    pub fields: Map<String, Value>,
}

impl LoggerConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: Some(LogLevel::Info),
            fields: Map::new(),
        }
    }

    pub fn level(mut self, level: Option<LogLevel>) -> Self {
        self.level = level;
        self
    }

    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Build the default tracing-backed logger.
pub fn create_logger(config: LoggerConfig) -> Arc<dyn Logger> {
    Arc::new(TracingLogger {
        name: config.name,
        level: config.level,
        fields: config.fields,
    })
}

/// [`Logger`] that emits `tracing` events
#[derive(Debug, Clone)]
pub struct TracingLogger {
    name: String,
    level: Option<LogLevel>,
    fields: Map<String, Value>,
}

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str, fields: &Map<String, Value>) {
        match self.level {
            Some(min) if level >= min => {}
            _ => return,
        }

        let mut merged = self.fields.clone();
        merged.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())));
        let fields = Value::Object(merged);
        let logger = self.name.as_str();

        match level {
            LogLevel::Trace => tracing::trace!(logger, %fields, "{message}"),
            LogLevel::Debug => tracing::debug!(logger, %fields, "{message}"),
            LogLevel::Info => tracing::info!(logger, %fields, "{message}"),
            LogLevel::Warn => tracing::warn!(logger, %fields, "{message}"),
            LogLevel::Error => tracing::error!(logger, %fields, "{message}"),
        }
    }
}

/// Install the process-wide tracing subscriber.
///
/// Output goes to stderr; stdout belongs to command output and protocol
/// frames. `RUST_LOG` takes precedence over `default_directive`, and
/// `verbose` raises the default to `debug`.
pub fn init_tracing(
    verbose: bool,
    default_directive: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let fallback = if verbose { "debug" } else { default_directive };

    let fmt_layer = tracing_fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .with_level(true)
        .compact();

    let filter_layer =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(fallback))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
