//! Error types for sink setup.
//!
//! Delivery itself never errors: `push` reports a rejected snapshot as `false`,
//! and storage failures stay inside the concrete store.

use thiserror::Error;

/// Errors that can occur while configuring or starting a sink.
#[derive(Error, Debug)]
pub enum SinkError {
    /// The worker thread could not be spawned
    #[error("failed to spawn sink worker '{name}': {source}")]
    Spawn {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration rejected by validation
    #[error("invalid sink configuration: {0}")]
    InvalidConfig(String),
}

/// Result type alias for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;
