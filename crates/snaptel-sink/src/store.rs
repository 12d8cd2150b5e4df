//! Storage capability plugged into an [`AsyncSink`](crate::AsyncSink).
//!
//! A store is called only from the sink's worker thread, one snapshot at a
//! time, so implementations need no internal synchronization for themselves.
//! They must not block indefinitely, and they handle their own failures:
//! nothing a store reports can stop the worker loop.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::snapshot::Snapshot;

/// Persists or forwards snapshots.
pub trait SnapshotStore<T = Snapshot>: Send + 'static {
    /// Handle one snapshot.
    fn store_snapshot(&mut self, snapshot: T);

    /// Called once on the worker after the final drain pass.
    fn finish(&mut self) {}
}

impl<T, S> SnapshotStore<T> for Box<S>
where
    S: SnapshotStore<T> + ?Sized,
{
    fn store_snapshot(&mut self, snapshot: T) {
        (**self).store_snapshot(snapshot);
    }

    fn finish(&mut self) {
        (**self).finish();
    }
}

/// Adapts a closure into a store.
pub struct FnStore<F>(F);

impl<F> FnStore<F> {
    pub fn new(f: F) -> Self {
        FnStore(f)
    }
}

impl<T, F> SnapshotStore<T> for FnStore<F>
where
    F: FnMut(T) + Send + 'static,
{
    fn store_snapshot(&mut self, snapshot: T) {
        (self.0)(snapshot);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Keeps every snapshot in memory, in arrival order.
///
/// Clones share the same buffer, so a clone kept by the caller observes what
/// the worker stored.
pub struct MemoryStore<T> {
    items: Arc<Mutex<Vec<T>>>,
    finished: Arc<Mutex<bool>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        MemoryStore {
            items: Arc::new(Mutex::new(Vec::new())),
            finished: Arc::new(Mutex::new(false)),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.items).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.items).is_empty()
    }

    /// Remove and return everything stored so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *lock(&self.items))
    }

    /// Whether the owning sink has shut down.
    pub fn is_finished(&self) -> bool {
        *lock(&self.finished)
    }
}

impl<T: Clone> MemoryStore<T> {
    /// Copy of everything stored so far.
    pub fn snapshots(&self) -> Vec<T> {
        lock(&self.items).clone()
    }
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        MemoryStore {
            items: Arc::clone(&self.items),
            finished: Arc::clone(&self.finished),
        }
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> SnapshotStore<T> for MemoryStore<T> {
    fn store_snapshot(&mut self, snapshot: T) {
        lock(&self.items).push(snapshot);
    }

    fn finish(&mut self) {
        *lock(&self.finished) = true;
    }
}

/// Counts snapshots and payload bytes per channel, discarding the data.
#[derive(Clone, Default)]
pub struct CountingStore {
    counts: Arc<Mutex<HashMap<String, ChannelCount>>>,
}

/// Totals for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelCount {
    pub snapshots: u64,
    pub payload_bytes: u64,
    /// Hash of the schema seen most recently on this channel.
    pub schema_hash: u64,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, name: &str) -> Option<ChannelCount> {
        lock(&self.counts).get(name).copied()
    }

    /// Snapshots across all channels.
    pub fn total(&self) -> u64 {
        lock(&self.counts).values().map(|c| c.snapshots).sum()
    }
}

impl SnapshotStore<Snapshot> for CountingStore {
    fn store_snapshot(&mut self, snapshot: Snapshot) {
        let mut counts = lock(&self.counts);
        let entry = counts.entry(snapshot.channel_name).or_default();
        entry.snapshots += 1;
        entry.payload_bytes += snapshot.payload.len() as u64;
        entry.schema_hash = snapshot.schema_hash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use snaptel_types::{Field, Schema};

    #[test]
    fn test_memory_store_clones_share_buffer() {
        let observer = MemoryStore::<u32>::new();
        let mut store = observer.clone();
        store.store_snapshot(1);
        store.store_snapshot(2);
        assert_eq!(observer.snapshots(), vec![1, 2]);
        assert!(!observer.is_finished());
        store.finish();
        assert!(observer.is_finished());
        assert_eq!(observer.take(), vec![1, 2]);
        assert!(observer.is_empty());
    }

    #[test]
    fn test_fn_store() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let mut store = FnStore::new(move |s: String| sink_seen.lock().unwrap().push(s));
        store.store_snapshot("a".to_string());
        assert_eq!(*seen.lock().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_boxed_store_forwards() {
        let observer = MemoryStore::<u8>::new();
        let mut boxed: Box<dyn SnapshotStore<u8>> = Box::new(observer.clone());
        boxed.store_snapshot(9);
        boxed.finish();
        assert_eq!(observer.snapshots(), vec![9]);
        assert!(observer.is_finished());
    }

    #[test]
    fn test_counting_store() {
        let schema = Schema::new("gps").with_field(Field::of::<f64>("lat"));
        let counter = CountingStore::new();
        let mut store = counter.clone();
        store.store_snapshot(Snapshot::new(&schema, vec![0; 8]));
        store.store_snapshot(Snapshot::new(&schema, vec![0; 8]));

        let gps = counter.channel("gps").unwrap();
        assert_eq!(gps.snapshots, 2);
        assert_eq!(gps.payload_bytes, 16);
        assert_eq!(gps.schema_hash, schema.hash());
        assert_eq!(counter.total(), 2);
        assert!(counter.channel("lidar").is_none());
    }
}
