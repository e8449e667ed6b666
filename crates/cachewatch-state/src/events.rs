//! Bounded log of availability transitions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use cachewatch_core::Event;

use crate::store::Threadsafe;

/// Most-recent-first event log holding at most `max` events.
///
/// `add` is a copy-mutate-set update; callers must not add events from
/// more than one task at a time.
#[derive(Debug, Clone)]
pub struct Events {
    events: Threadsafe<Vec<Event>>,
    next_index: Arc<AtomicU64>,
    max: usize,
}

impl Events {
    pub fn new(max: usize) -> Self {
        Self {
            events: Threadsafe::default(),
            next_index: Arc::new(AtomicU64::new(0)),
            max: max.max(1),
        }
    }

    /// Record an event, assigning it the next index.
    pub fn add(&self, mut event: Event) {
        event.index = self.next_index.fetch_add(1, Ordering::Relaxed);
        debug!(
            index = event.index,
            hostname = %event.hostname,
            available = event.available,
            "availability event"
        );

        let mut events = self.events.get_copy();
        events.insert(0, event);
        events.truncate(self.max);
        self.events.set(events);
    }

    /// Current events, most-recent-first.
    pub fn get(&self) -> Arc<Vec<Event>> {
        self.events.get()
    }

    pub fn max(&self) -> usize {
        self.max
    }
}
