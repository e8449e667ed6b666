//! cachewatch-state: shared state for the cache health pipeline.
//!
//! Every store is a snapshot cell: readers `get()` an immutable `Arc<T>`,
//! writers build a complete new value and `set()` it. A reader therefore
//! sees either the value before a batch or the value after it, never a
//! partially applied batch.
//!
//! # Architecture
//!
//! ```text
//! Threadsafe<T>  (arc-swap cell, Clone handle)
//!   ├── ResultHistory        cache → [CacheResult], most-recent-first
//!   ├── DurationMap          cache → last inter-poll duration
//!   ├── CacheAvailableStatuses
//!   ├── CrStatesStore
//!   ├── MonitorConfigStore
//!   └── TopologyStore
//! Counter                    atomic, increment-only
//! Events                     bounded availability event log
//! ```
//!
//! Stores have no field-level mutation. Writers are serialized by the
//! pipeline (single writer per store), so no additional locking is done.

pub mod events;
pub mod store;

use std::collections::HashMap;
use std::time::Duration;

use cachewatch_core::{
    CacheAvailableStatus, CacheName, CacheResult, CrStates, MonitorConfig, TopologyData,
};

pub use events::Events;
pub use store::{Counter, Threadsafe};

/// Per-cache health result history, most-recent-first.
pub type History = HashMap<CacheName, Vec<CacheResult>>;

pub type ResultHistory = Threadsafe<History>;
pub type DurationMap = Threadsafe<HashMap<CacheName, Duration>>;
pub type CacheAvailableStatuses = Threadsafe<HashMap<CacheName, CacheAvailableStatus>>;
pub type CrStatesStore = Threadsafe<CrStates>;
pub type MonitorConfigStore = Threadsafe<MonitorConfig>;
pub type TopologyStore = Threadsafe<TopologyData>;
