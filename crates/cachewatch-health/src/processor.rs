//! Result processor: applies one batch of health results to the shared
//! stores.
//!
//! Not safe to call concurrently: it reads history and durations, builds
//! new values, and sets them back. The manager task is its only caller.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, error, info};

use cachewatch_core::{CacheName, CacheResult, MonitorConfig, PollId};

use crate::availability::{AvailabilityCalculator, AvailabilityContext};
use crate::history::prune_history;
use crate::manager::HealthStores;
use crate::poll::PollResult;
use crate::vitals::VitalsCalculator;

/// Label recorded on availability events raised from health results.
const HEALTH_LABEL: &str = "health";

/// Applies batches of health results to the shared stores.
pub struct ResultProcessor {
    stores: HealthStores,
    vitals: Arc<dyn VitalsCalculator>,
    availability: Arc<dyn AvailabilityCalculator>,
    /// When each cache's last result finished processing. Local to the
    /// processor, never shared.
    end_times: HashMap<CacheName, Instant>,
}

impl ResultProcessor {
    pub fn new(
        stores: HealthStores,
        vitals: Arc<dyn VitalsCalculator>,
        availability: Arc<dyn AvailabilityCalculator>,
    ) -> Self {
        Self {
            stores,
            vitals,
            availability,
            end_times: HashMap::new(),
        }
    }

    /// Process one batch.
    ///
    /// Every result in the batch receives its completion signal before this
    /// returns, including when a vitals or availability computation panics.
    pub fn process(&mut self, batch: Vec<PollResult>) {
        if batch.is_empty() {
            return;
        }

        let mut guard = PollFinishGuard::with_capacity(batch.len());
        let mut results = Vec::with_capacity(batch.len());
        for poll in batch {
            guard.push(&poll.result, poll.finished);
            results.push(poll.result);
        }

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.apply(&mut results)));
        if let Err(payload) = outcome {
            error!(
                results = results.len(),
                panic = panic_message(payload.as_ref()),
                "health result batch processing panicked"
            );
        }
        // `guard` drops here and signals every poll in the batch.
    }

    fn apply(&mut self, results: &mut [CacheResult]) {
        // One snapshot of each input for the whole batch.
        let topology = self.stores.topology.get();
        let monitor_config = self.stores.monitor_config.get();
        let mut history = self.stores.history.get_copy();

        for result in results.iter_mut() {
            self.stores.fetch_count.inc();
            if result.is_error() {
                self.stores.error_count.inc();
            }

            let previous = history.get(&result.id).and_then(|h| h.first());
            if result.error.is_none() {
                self.vitals.get_vitals(result, previous, &monitor_config);
            }

            let max_history = max_history(&monitor_config, &result.id);
            let entries = history.entry(result.id.clone()).or_default();
            *entries = prune_history(result.clone(), entries, max_history);
        }

        self.availability.calc_availability(AvailabilityContext {
            results,
            label: HEALTH_LABEL,
            filter: None,
            monitor_config: &monitor_config,
            topology: &topology,
            statuses: &self.stores.statuses,
            local_states: &self.stores.local_states,
            events: &self.stores.events,
        });

        self.stores.history.set(history);

        let mut durations = self.stores.durations.get_copy();
        for result in results.iter() {
            let now = Instant::now();
            if let Some(last) = self.end_times.get(&result.id) {
                durations.insert(result.id.clone(), now.duration_since(*last));
            }
            self.end_times.insert(result.id.clone(), now);
        }
        self.stores.durations.set(durations);
    }
}

/// Resolve the history bound for a cache: server → profile → parameters.
fn max_history(config: &MonitorConfig, cache: &str) -> usize {
    let count = config.history_count(cache);
    if count < 1 {
        info!(cache, history_count = count, "history count below 1, using 1");
        return 1;
    }
    usize::try_from(count).unwrap_or(usize::MAX)
}

/// Signals completion for every poll it holds when dropped.
struct PollFinishGuard {
    pending: Vec<PendingPoll>,
}

struct PendingPoll {
    cache: CacheName,
    poll_id: PollId,
    finished: oneshot::Sender<PollId>,
}

impl PollFinishGuard {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
        }
    }

    fn push(&mut self, result: &CacheResult, finished: oneshot::Sender<PollId>) {
        self.pending.push(PendingPoll {
            cache: result.id.clone(),
            poll_id: result.poll_id,
            finished,
        });
    }
}

impl Drop for PollFinishGuard {
    fn drop(&mut self) {
        for poll in self.pending.drain(..) {
            debug!(cache = %poll.cache, poll_id = poll.poll_id, "poll finished");
            // The poller may have given up waiting; nothing to do then.
            let _ = poll.finished.send(poll.poll_id);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}
