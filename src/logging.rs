//! Structured logging setup.
//!
//! Events go to stderr so generated output piped from stdout stays clean.
//! `RUST_LOG`, when set, takes precedence over `CLIENTGEN_LOG_LEVEL`.
//!
//! | Variable                         | Default  |
//! |----------------------------------|----------|
//! | `CLIENTGEN_LOG_LEVEL`            | `info`   |
//! | `CLIENTGEN_LOG_FORMAT`           | `pretty` |
//! | `CLIENTGEN_LOG_TARGET_FILTER`    | unset    |
//! | `CLIENTGEN_LOG_ASYNC`            | `false`  |
//! | `CLIENTGEN_LOG_INCLUDE_LOCATION` | `false`  |

use anyhow::{Context, Result};
use std::env;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// JSON for machines, pretty for terminals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// trace/debug/info/warn/error
    pub log_level: String,
    pub format: LogFormat,
    /// Extra `target=level` directives, comma-separated
    pub target_filter: Option<String>,
    /// Write through a background thread
    pub async_logging: bool,
    /// Include file:line in events
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Pretty,
            target_filter: None,
            async_logging: false,
            include_location: false,
        }
    }
}

impl LogConfig {
    pub fn from_env() -> Self {
        let flag = |name: &str| {
            env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false)
        };
        Self {
            log_level: env::var("CLIENTGEN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::parse(
                &env::var("CLIENTGEN_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
            ),
            target_filter: env::var("CLIENTGEN_LOG_TARGET_FILTER").ok(),
            async_logging: flag("CLIENTGEN_LOG_ASYNC"),
            include_location: flag("CLIENTGEN_LOG_INCLUDE_LOCATION"),
        }
    }

    /// Raise the level to `debug` unless it is already more verbose.
    pub fn verbose(mut self) -> Self {
        if parse_level(&self.log_level) < Level::DEBUG {
            self.log_level = "debug".to_string();
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let level = parse_level(&self.log_level);
        let mut filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
        if let Some(targets) = &self.target_filter {
            for directive in targets.split(',').map(str::trim).filter(|d| !d.is_empty()) {
                match directive.parse() {
                    Ok(directive) => filter = filter.add_directive(directive),
                    Err(_) => eprintln!("Warning: invalid log filter directive: {directive}"),
                }
            }
        }
        filter
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging_with_config(config: &LogConfig) -> Result<()> {
    let registry = tracing_subscriber::registry().with(config.env_filter());

    let (writer, guard) = if config.async_logging {
        let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
        (tracing_subscriber::fmt::writer::BoxMakeWriter::new(writer), Some(guard))
    } else {
        (
            tracing_subscriber::fmt::writer::BoxMakeWriter::new(std::io::stderr),
            None,
        )
    };

    let fmt_layer = match config.format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
        LogFormat::Pretty => tracing_subscriber::fmt::layer()
            .pretty()
            .with_target(false)
            .with_file(config.include_location)
            .with_line_number(config.include_location)
            .with_writer(writer)
            .boxed(),
    };

    registry
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize logging")?;

    // Keep the background writer alive for the life of the process.
    if let Some(guard) = guard {
        std::mem::forget(guard);
    }
    Ok(())
}
