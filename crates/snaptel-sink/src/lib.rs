//! Snapshot telemetry sink.
//!
//! This crate provides:
//! - [`AsyncSink`]: non-blocking multi-producer queue drained by one worker thread
//! - [`SnapshotStore`] capability with in-memory, counting and closure stores
//! - [`Snapshot`] values tagged with their channel's schema hash
//! - JSON-backed [`SinkConfig`] and `tracing` subscriber setup

pub mod config;
pub mod error;
pub mod logging;
pub mod sink;
pub mod snapshot;
pub mod store;

pub use config::{ShutdownPolicy, SinkConfig, DEFAULT_POLL_INTERVAL_US, DEFAULT_THREAD_NAME};
pub use error::{Result, SinkError};
pub use logging::{init_logging, LogConfig, LogFormat};
pub use sink::{AsyncSink, SinkState, SinkStats};
pub use snapshot::Snapshot;
pub use store::{ChannelCount, CountingStore, FnStore, MemoryStore, SnapshotStore};

pub use snaptel_types::{Field, Schema};
