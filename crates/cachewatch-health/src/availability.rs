//! Availability computation seam and the default threshold implementation.
//!
//! The availability computation is the only place a cache moves between
//! available and unavailable. It runs once per batch, inside the result
//! processor's serialized window, so it may update the status store, the
//! local CRStates, and the event log with plain copy-mutate-set.

use tracing::{info, warn};

use cachewatch_core::{
    epoch_secs, CacheAvailableStatus, CacheResult, Event, IsAvailable, MonitorConfig,
    ProfileParameters, TopologyData,
};
use cachewatch_state::{CacheAvailableStatuses, CrStatesStore, Events};

/// Selects which caches an availability pass considers.
pub trait ResultFilter: Send + Sync {
    fn use_cache(&self, cache: &str) -> bool;
}

impl<F> ResultFilter for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn use_cache(&self, cache: &str) -> bool {
        self(cache)
    }
}

/// Everything an availability pass may read or write.
pub struct AvailabilityContext<'a> {
    /// The batch, in arrival order, with vitals already computed.
    pub results: &'a [CacheResult],
    /// Source label recorded on raised events, e.g. "health".
    pub label: &'a str,
    /// `None` considers every cache in the batch.
    pub filter: Option<&'a dyn ResultFilter>,
    pub monitor_config: &'a MonitorConfig,
    pub topology: &'a TopologyData,
    pub statuses: &'a CacheAvailableStatuses,
    pub local_states: &'a CrStatesStore,
    pub events: &'a Events,
}

/// Classifies a batch of results into per-cache availability.
///
/// Must be synchronous and must terminate.
pub trait AvailabilityCalculator: Send + Sync {
    fn calc_availability(&self, ctx: AvailabilityContext<'_>);
}

/// Marks a cache unavailable when its poll failed or its vitals exceed
/// the thresholds of its profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThresholdAvailability;

impl AvailabilityCalculator for ThresholdAvailability {
    fn calc_availability(&self, ctx: AvailabilityContext<'_>) {
        let mut statuses = ctx.statuses.get_copy();
        let mut states = ctx.local_states.get_copy();

        for result in ctx.results {
            if let Some(filter) = ctx.filter {
                if !filter.use_cache(&result.id) {
                    continue;
                }
            }

            let (available, why) = evaluate(result, ctx.monitor_config.parameters(&result.id));

            // A cache seen for the first time only raises an event if it is down.
            let changed = match statuses.get(&result.id) {
                Some(prev) => prev.available != available,
                None => !available,
            };

            if changed {
                if available {
                    info!(cache = %result.id, label = ctx.label, "cache marked available");
                } else {
                    warn!(
                        cache = %result.id,
                        label = ctx.label,
                        %why,
                        delivery_services = ?ctx.topology.delivery_services_for(&result.id),
                        "cache marked unavailable"
                    );
                }
                ctx.events.add(Event {
                    index: 0,
                    time: epoch_secs(),
                    hostname: result.id.clone(),
                    event_type: ctx.label.to_string(),
                    available,
                    description: why.clone(),
                });
            }

            let status = if available { "available" } else { "unavailable" };
            statuses.insert(
                result.id.clone(),
                CacheAvailableStatus {
                    available,
                    status: status.to_string(),
                    why,
                    last_poll_id: result.poll_id,
                },
            );
            states
                .caches
                .insert(result.id.clone(), IsAvailable { is_available: available });
        }

        ctx.statuses.set(statuses);
        ctx.local_states.set(states);
    }
}

fn evaluate(result: &CacheResult, params: Option<&ProfileParameters>) -> (bool, String) {
    if let Some(err) = &result.error {
        return (false, format!("poll error: {err}"));
    }

    if let Some(params) = params {
        if let Some(max) = params.health_threshold_load_avg {
            if result.vitals.load_avg > max {
                return (
                    false,
                    format!("load average {:.2} exceeds {max:.2}", result.vitals.load_avg),
                );
            }
        }
        // An unknown interface speed leaves available bandwidth unknown.
        if let Some(min) = params.health_threshold_available_kbps {
            if result.vitals.max_kbps_out > 0.0 {
                let available_kbps = result.vitals.max_kbps_out - result.vitals.kbps_out;
                if available_kbps < min {
                    return (
                        false,
                        format!("available bandwidth {available_kbps:.0} kbps below {min:.0} kbps"),
                    );
                }
            }
        }
    }

    (true, "healthy".to_string())
}
