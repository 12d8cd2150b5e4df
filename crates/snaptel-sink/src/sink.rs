//! Asynchronous snapshot sink.
//!
//! Producers on any thread call [`AsyncSink::push`], which never blocks and
//! never touches storage. A single dedicated worker thread drains the queue
//! into a [`SnapshotStore`], idling for the configured poll interval when the
//! queue is empty.
//!
//! ## Lifecycle
//!
//! `Running` (from construction) -> `Stopping` (stop requested) -> `Stopped`
//! (worker joined). There is no pause or restart. Stop is idempotent and runs
//! automatically on drop.
//!
//! ## Shutdown
//!
//! A push either observes the stop request and is rejected (`false`), or it was
//! admitted before stop and the worker waits for its send to land before the
//! final pass. Under [`ShutdownPolicy::Drain`] every accepted
//! snapshot reaches the store. Under [`ShutdownPolicy::Abandon`] whatever is
//! still queued is discarded and counted.

use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::{ShutdownPolicy, SinkConfig};
use crate::error::{Result, SinkError};
use crate::snapshot::Snapshot;
use crate::store::SnapshotStore;

/// Lifecycle state of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkState {
    Running,
    Stopping,
    Stopped,
}

impl SinkState {
    fn from_u8(v: u8) -> Self {
        match v {
            STATE_RUNNING => SinkState::Running,
            STATE_STOPPING => SinkState::Stopping,
            _ => SinkState::Stopped,
        }
    }
}

const STATE_RUNNING: u8 = 0;
const STATE_STOPPING: u8 = 1;
const STATE_STOPPED: u8 = 2;

/// Set in `Shared::admitted` once stop begins; the low bits count admitted pushes.
const CLOSED: u64 = 1 << 63;

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// Snapshots accepted by `push`.
    pub pushed: u64,
    /// Pushes refused because the sink was stopping.
    pub rejected: u64,
    /// Snapshots handed to the store.
    pub stored: u64,
    /// Snapshots discarded at shutdown.
    pub abandoned: u64,
    /// Store calls that panicked.
    pub store_panics: u64,
}

impl SinkStats {
    /// Accepted snapshots not yet stored or discarded.
    pub fn pending(&self) -> u64 {
        self.pushed
            .saturating_sub(self.stored + self.abandoned + self.store_panics)
    }
}

#[derive(Default)]
struct Shared {
    state: AtomicU8,
    admitted: AtomicU64,
    /// Admitted pushes whose send has returned.
    sent: AtomicU64,
    /// Admitted count captured when `CLOSED` was set.
    admitted_at_close: AtomicU64,
    pushed: AtomicU64,
    rejected: AtomicU64,
    stored: AtomicU64,
    abandoned: AtomicU64,
    store_panics: AtomicU64,
}

impl Shared {
    fn is_stopping(&self) -> bool {
        self.state.load(Ordering::SeqCst) != STATE_RUNNING
    }
}

/// Non-blocking, multi-producer front end to a single storage worker.
pub struct AsyncSink<T: Send + 'static = Snapshot> {
    tx: Sender<T>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    name: String,
}

impl<T: Send + 'static> AsyncSink<T> {
    /// Start a sink with the default configuration.
    pub fn new<S: SnapshotStore<T>>(store: S) -> Result<Self> {
        Self::with_config(store, &SinkConfig::default())
    }

    /// Start a sink; the worker thread is running when this returns.
    pub fn with_config<S: SnapshotStore<T>>(store: S, config: &SinkConfig) -> Result<Self> {
        config.validate()?;

        let (tx, rx) = mpsc::channel();
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let poll_interval = config.poll_interval();
        let policy = config.shutdown;

        let handle = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || run_worker(store, rx, &worker_shared, poll_interval, policy))
            .map_err(|source| SinkError::Spawn {
                name: config.thread_name.clone(),
                source,
            })?;

        info!(
            sink = %config.thread_name,
            poll_interval_us = config.poll_interval_us,
            shutdown = ?policy,
            "sink worker started"
        );

        Ok(AsyncSink {
            tx,
            shared,
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
            name: config.thread_name.clone(),
        })
    }

    /// Queue a snapshot for the worker.
    ///
    /// Never blocks. Returns `false` if the sink is stopping or stopped.
    pub fn push(&self, snapshot: T) -> bool {
        let shared = &*self.shared;
        if shared.admitted.fetch_add(1, Ordering::SeqCst) & CLOSED != 0 {
            shared.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let accepted = self.tx.send(snapshot).is_ok();
        if accepted {
            shared.pushed.fetch_add(1, Ordering::Relaxed);
        } else {
            shared.rejected.fetch_add(1, Ordering::Relaxed);
        }
        shared.sent.fetch_add(1, Ordering::SeqCst);
        accepted
    }

    /// Stop the worker and wait for it to exit.
    ///
    /// Safe to call repeatedly and from several threads; every caller returns
    /// only once the worker has been joined, after which the store is never
    /// called again. Called from the worker itself (inside a store), it only
    /// flags the stop.
    pub fn request_stop(&self) {
        let shared = &*self.shared;
        let prev = shared.admitted.fetch_or(CLOSED, Ordering::SeqCst);
        if prev & CLOSED == 0 {
            shared.admitted_at_close.store(prev, Ordering::SeqCst);
            shared.state.store(STATE_STOPPING, Ordering::SeqCst);
        }

        // Requested from inside the store. Another caller may already hold the
        // lock while joining this thread, so return before touching it; the
        // loop exits on its own.
        if thread::current().id() == self.worker_id {
            return;
        }

        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = worker.take() else {
            return;
        };
        if handle.join().is_err() {
            error!(sink = %self.name, "sink worker panicked");
        }
        shared.state.store(STATE_STOPPED, Ordering::SeqCst);

        let stats = self.stats();
        info!(
            sink = %self.name,
            stored = stats.stored,
            rejected = stats.rejected,
            abandoned = stats.abandoned,
            "sink worker stopped"
        );
    }

    pub fn state(&self) -> SinkState {
        SinkState::from_u8(self.shared.state.load(Ordering::SeqCst))
    }

    pub fn is_running(&self) -> bool {
        self.state() == SinkState::Running
    }

    pub fn stats(&self) -> SinkStats {
        let shared = &*self.shared;
        SinkStats {
            pushed: shared.pushed.load(Ordering::Relaxed),
            rejected: shared.rejected.load(Ordering::Relaxed),
            stored: shared.stored.load(Ordering::Relaxed),
            abandoned: shared.abandoned.load(Ordering::Relaxed),
            store_panics: shared.store_panics.load(Ordering::Relaxed),
        }
    }

    /// Worker thread name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T: Send + 'static> Drop for AsyncSink<T> {
    fn drop(&mut self) {
        self.request_stop();
    }
}

fn run_worker<T, S: SnapshotStore<T>>(
    mut store: S,
    rx: Receiver<T>,
    shared: &Shared,
    poll_interval: Duration,
    policy: ShutdownPolicy,
) {
    let stop_early = policy == ShutdownPolicy::Abandon;
    loop {
        drain(&mut store, &rx, shared, stop_early);
        if shared.is_stopping() {
            break;
        }
        match rx.recv_timeout(poll_interval) {
            Ok(snapshot) => deliver(&mut store, snapshot, shared),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    // Pushes admitted before stop may still be sending.
    let admitted = shared.admitted_at_close.load(Ordering::SeqCst);
    while shared.sent.load(Ordering::SeqCst) < admitted {
        thread::yield_now();
    }

    match policy {
        ShutdownPolicy::Drain => {
            let drained = drain(&mut store, &rx, shared, false);
            debug!(drained, "final drain pass complete");
        }
        ShutdownPolicy::Abandon => {
            let discarded = rx.try_iter().count() as u64;
            if discarded > 0 {
                shared.abandoned.fetch_add(discarded, Ordering::Relaxed);
                warn!(discarded, "discarding queued snapshots at shutdown");
            }
        }
    }

    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| store.finish())) {
        error!(panic = %panic_message(&*payload), "store panicked while finishing");
    }
}

/// One drain pass: store everything currently queued.
///
/// With `stop_early` the pass ends as soon as stop is requested.
fn drain<T, S: SnapshotStore<T>>(
    store: &mut S,
    rx: &Receiver<T>,
    shared: &Shared,
    stop_early: bool,
) -> u64 {
    let mut count = 0;
    while !(stop_early && shared.is_stopping()) {
        let Ok(snapshot) = rx.try_recv() else {
            break;
        };
        deliver(store, snapshot, shared);
        count += 1;
    }
    count
}

fn deliver<T, S: SnapshotStore<T>>(store: &mut S, snapshot: T, shared: &Shared) {
    match panic::catch_unwind(AssertUnwindSafe(|| store.store_snapshot(snapshot))) {
        Ok(()) => {
            shared.stored.fetch_add(1, Ordering::Relaxed);
        }
        Err(payload) => {
            shared.store_panics.fetch_add(1, Ordering::Relaxed);
            error!(panic = %panic_message(&*payload), "store panicked; snapshot dropped");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
