//! Snapshot cells and counters.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;

/// A shared, atomically replaceable value.
///
/// Cloning the handle shares the underlying cell. `get` is wait-free and
/// returns the snapshot current at the time of the call; a later `set` does
/// not affect snapshots already handed out.
pub struct Threadsafe<T> {
    inner: Arc<ArcSwap<T>>,
}

impl<T> Threadsafe<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ArcSwap::from_pointee(value)),
        }
    }

    /// Current snapshot.
    pub fn get(&self) -> Arc<T> {
        self.inner.load_full()
    }

    /// Replace the whole stored value.
    pub fn set(&self, value: T) {
        self.inner.store(Arc::new(value));
    }
}

impl<T: Clone> Threadsafe<T> {
    /// Deep copy of the current snapshot, for copy-mutate-set updates.
    pub fn get_copy(&self) -> T {
        T::clone(&self.get())
    }
}

impl<T> Clone for Threadsafe<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Default> Default for Threadsafe<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for Threadsafe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Threadsafe").field(&self.get()).finish()
    }
}

/// Monotonic counter shared between the pipeline and its readers.
#[derive(Debug, Clone, Default)]
pub struct Counter {
    inner: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.inner.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}
