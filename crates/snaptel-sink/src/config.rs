//! Sink configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, SinkError};

/// Default idle wait between drain passes, in microseconds.
pub const DEFAULT_POLL_INTERVAL_US: u64 = 100;

/// Default worker thread name.
pub const DEFAULT_THREAD_NAME: &str = "snaptel-sink";

/// Upper bound on the idle wait; stop is observed within one interval.
const MAX_POLL_INTERVAL_US: u64 = 1_000_000;

/// What happens to snapshots still queued when stop is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownPolicy {
    /// Store everything accepted before stop (default).
    #[default]
    Drain,
    /// Discard whatever is still queued.
    Abandon,
}

/// Configuration for an [`AsyncSink`](crate::AsyncSink).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Idle wait between drain passes.
    pub poll_interval_us: u64,

    /// Name given to the worker thread.
    pub thread_name: String,

    /// Shutdown behaviour for queued snapshots.
    pub shutdown: ShutdownPolicy,
}

impl Default for SinkConfig {
    fn default() -> Self {
        SinkConfig {
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            shutdown: ShutdownPolicy::Drain,
        }
    }
}

impl SinkConfig {
    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SinkConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Set the idle wait between drain passes.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_us = u64::try_from(interval.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// Set the worker thread name.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }

    /// Set the shutdown policy.
    pub fn with_shutdown(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown = policy;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_us == 0 {
            return Err(SinkError::InvalidConfig(
                "poll_interval_us must be greater than zero".to_string(),
            ));
        }
        if self.poll_interval_us > MAX_POLL_INTERVAL_US {
            return Err(SinkError::InvalidConfig(format!(
                "poll_interval_us must be at most {} (got {})",
                MAX_POLL_INTERVAL_US, self.poll_interval_us
            )));
        }
        if self.thread_name.trim().is_empty() {
            return Err(SinkError::InvalidConfig(
                "thread_name must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
