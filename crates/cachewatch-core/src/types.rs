//! Shared types used across cachewatch crates.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hostname of a cache in the fleet.
pub type CacheName = String;

/// Identifier of a single poll issued by a poller.
pub type PollId = u64;

// ── Poll results ──────────────────────────────────────────────────

/// Raw counters as reported by a cache's stats endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawStats {
    /// One-minute load average.
    #[serde(default)]
    pub load_avg: f64,
    /// Cumulative bytes sent on the primary interface.
    #[serde(default)]
    pub bytes_out: u64,
    /// Cumulative bytes received on the primary interface.
    #[serde(default)]
    pub bytes_in: u64,
    /// Link speed of the primary interface in megabits per second.
    #[serde(default)]
    pub interface_speed_mbps: u64,
}

/// Metrics derived from a result, possibly as a delta against the
/// previous result for the same cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub load_avg: f64,
    pub bytes_out: u64,
    pub bytes_in: u64,
    /// Outbound throughput since the previous result.
    pub kbps_out: f64,
    /// Interface capacity.
    pub max_kbps_out: f64,
}

/// The outcome of polling one cache once.
///
/// This is the retained part of a poll: history entries are `CacheResult`
/// values. The completion handle travels alongside it on the input stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheResult {
    pub id: CacheName,
    pub poll_id: PollId,
    /// Poll failure reported by the poller, if any.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub stats: RawStats,
    /// Filled in by the vitals computation for error-free results.
    #[serde(default)]
    pub vitals: Vitals,
    /// Arrival time, unix milliseconds.
    pub time_ms: u64,
}

impl CacheResult {
    /// A successful result stamped with the current time.
    pub fn new(id: impl Into<CacheName>, poll_id: PollId, stats: RawStats) -> Self {
        Self {
            id: id.into(),
            poll_id,
            error: None,
            stats,
            vitals: Vitals::default(),
            time_ms: epoch_millis(),
        }
    }

    /// A failed result stamped with the current time.
    pub fn failed(id: impl Into<CacheName>, poll_id: PollId, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            poll_id,
            error: Some(error.into()),
            stats: RawStats::default(),
            vitals: Vitals::default(),
            time_ms: epoch_millis(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ── Availability ──────────────────────────────────────────────────

/// Availability verdict for one cache, as produced by the availability
/// computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheAvailableStatus {
    pub available: bool,
    /// Operational status label, e.g. "available" or "unavailable".
    pub status: String,
    /// Human readable reason for the verdict.
    pub why: String,
    /// Poll that produced this verdict.
    pub last_poll_id: PollId,
}

/// Entry of the CRStates cache map published to routers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IsAvailable {
    pub is_available: bool,
}

/// Per-cache availability as published to routers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrStates {
    #[serde(default)]
    pub caches: HashMap<CacheName, IsAvailable>,
}

/// An availability transition recorded in the event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic index assigned by the event log.
    pub index: u64,
    /// Unix seconds.
    pub time: u64,
    pub hostname: CacheName,
    /// Label of the computation that raised the event, e.g. "health".
    #[serde(rename = "type")]
    pub event_type: String,
    pub available: bool,
    pub description: String,
}

/// Current unix time in milliseconds.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Current unix time in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
