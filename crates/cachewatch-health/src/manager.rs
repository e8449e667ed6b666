//! Health result manager: the background task that batches health
//! results and drives the result processor.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use cachewatch_core::Config;
use cachewatch_state::{
    CacheAvailableStatuses, Counter, CrStatesStore, DurationMap, Events, MonitorConfigStore,
    ResultHistory, TopologyStore,
};

use crate::availability::{AvailabilityCalculator, ThresholdAvailability};
use crate::error::HealthError;
use crate::poll::PollResult;
use crate::processor::ResultProcessor;
use crate::vitals::{DeltaVitals, VitalsCalculator};

/// Shared stores the health pipeline reads and writes.
///
/// Cloning shares the underlying stores. `history` and `durations` are
/// written only by the manager; `statuses`, `local_states` and `events`
/// only by the availability computation it invokes; `topology` and
/// `monitor_config` only by whoever owns configuration.
#[derive(Debug, Clone)]
pub struct HealthStores {
    pub topology: TopologyStore,
    pub monitor_config: MonitorConfigStore,
    pub history: ResultHistory,
    pub durations: DurationMap,
    pub statuses: CacheAvailableStatuses,
    pub local_states: CrStatesStore,
    pub events: Events,
    pub fetch_count: Counter,
    pub error_count: Counter,
}

impl HealthStores {
    /// Empty stores with an event log of `max_events`.
    pub fn new(max_events: usize) -> Self {
        Self {
            topology: TopologyStore::default(),
            monitor_config: MonitorConfigStore::default(),
            history: ResultHistory::default(),
            durations: DurationMap::default(),
            statuses: CacheAvailableStatuses::default(),
            local_states: CrStatesStore::default(),
            events: Events::new(max_events),
            fetch_count: Counter::new(),
            error_count: Counter::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_events)
    }
}

/// Owns the health result channel for the lifetime of the process.
pub struct HealthResultManager {
    stores: HealthStores,
    flush_interval: Duration,
    vitals: Arc<dyn VitalsCalculator>,
    availability: Arc<dyn AvailabilityCalculator>,
}

impl HealthResultManager {
    /// Create a manager using [`DeltaVitals`] and [`ThresholdAvailability`].
    pub fn new(stores: HealthStores, flush_interval: Duration) -> Self {
        Self {
            stores,
            flush_interval,
            vitals: Arc::new(DeltaVitals),
            availability: Arc::new(ThresholdAvailability),
        }
    }

    /// Create a manager with the flush interval from `config`.
    pub fn from_config(stores: HealthStores, config: &Config) -> Result<Self, HealthError> {
        Ok(Self::new(stores, config.health_flush_interval()?))
    }

    /// Replace the vitals computation.
    pub fn with_vitals(mut self, vitals: Arc<dyn VitalsCalculator>) -> Self {
        self.vitals = vitals;
        self
    }

    /// Replace the availability computation.
    pub fn with_availability(mut self, availability: Arc<dyn AvailabilityCalculator>) -> Self {
        self.availability = availability;
        self
    }

    /// Spawn the manager task.
    ///
    /// The task runs until every sender of `results` has been dropped; the
    /// batch in progress at that point is still processed and signaled.
    /// Batches are processed on the blocking pool, so slow vitals or
    /// availability computations never stall the async workers.
    pub fn start(self, results: mpsc::Receiver<PollResult>) -> JoinHandle<()> {
        let processor = ResultProcessor::new(self.stores, self.vitals, self.availability);
        let flush_interval = self.flush_interval;

        info!(
            flush_interval_ms = flush_interval.as_millis() as u64,
            "health result manager started"
        );

        tokio::spawn(async move {
            listen(results, processor, flush_interval).await;
        })
    }
}

/// Read at least one result, then keep reading while more are queued. An
/// empty channel processes the batch right away; a channel that never
/// empties is processed once the flush interval has passed, so continuous
/// input cannot starve processing. An interval too large to schedule means
/// no deadline: the batch then closes when the channel empties.
async fn listen(
    mut results: mpsc::Receiver<PollResult>,
    mut processor: ResultProcessor,
    flush_interval: Duration,
) {
    while let Some(first) = results.recv().await {
        let mut batch = vec![first];
        let flush_at = Instant::now().checked_add(flush_interval);

        loop {
            if flush_at.is_some_and(|at| Instant::now() >= at) {
                info!(
                    results = batch.len(),
                    "health result manager flushing queued results"
                );
                break;
            }
            match results.try_recv() {
                Ok(result) => batch.push(result),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        debug!(results = batch.len(), "processing health result batch");
        let processed = tokio::task::spawn_blocking(move || {
            processor.process(batch);
            processor
        })
        .await;
        processor = match processed {
            Ok(processor) => processor,
            Err(err) => {
                error!(
                    error = %err,
                    "health result batch task failed, health result manager stopped"
                );
                return;
            }
        };
    }

    info!("health result channel closed, health result manager stopped");
}
