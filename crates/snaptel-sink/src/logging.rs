//! Subscriber setup for processes embedding a sink.
//!
//! The sink only emits `tracing` events (worker start/stop, drain totals,
//! abandoned snapshots, store panics). Worker events carry the sink name and
//! are printed with the worker's thread name.
//!
//! `RUST_LOG` wins when set. Otherwise `SNAPTEL_LOG` picks the level for the
//! snaptel crates and `SNAPTEL_LOG_FORMAT` picks `human` or `jsonl`.

use std::io::IsTerminal;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Targets covered by the default directive.
const TARGETS: [&str; 2] = ["snaptel_sink", "snaptel_types"];

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    /// One JSON object per line.
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "human" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogConfig {
    pub level: LevelFilter,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: LevelFilter::INFO,
            format: LogFormat::Human,
        }
    }
}

impl LogConfig {
    /// Read `SNAPTEL_LOG` and `SNAPTEL_LOG_FORMAT`; unparsable values keep the default.
    pub fn from_env() -> Self {
        Self::from_values(
            std::env::var("SNAPTEL_LOG").ok().as_deref(),
            std::env::var("SNAPTEL_LOG_FORMAT").ok().as_deref(),
        )
    }

    fn from_values(level: Option<&str>, format: Option<&str>) -> Self {
        let mut config = LogConfig::default();
        if let Some(level) = level.and_then(|v| v.parse().ok()) {
            config.level = level;
        }
        if let Some(format) = format.and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        config
    }

    pub fn with_level(mut self, level: LevelFilter) -> Self {
        self.level = level;
        self
    }

    /// `snaptel_sink=<level>,snaptel_types=<level>`.
    pub fn directive(&self) -> String {
        TARGETS
            .iter()
            .map(|target| format!("{}={}", target, self.level))
            .collect::<Vec<_>>()
            .join(",")
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()))
    }
}

/// Install a global stderr subscriber.
///
/// Returns `false` if one was already installed; the existing one is left alone.
pub fn init_logging(config: &LogConfig) -> bool {
    let registry = tracing_subscriber::registry().with(config.filter());
    match config.format {
        LogFormat::Human => registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_thread_names(true)
                    .with_ansi(std::io::stderr().is_terminal()),
            )
            .try_init()
            .is_ok(),
        LogFormat::Jsonl => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_thread_names(true),
            )
            .try_init()
            .is_ok(),
    }
}
