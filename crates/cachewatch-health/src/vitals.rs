//! Vitals computation seam and the default delta-based implementation.

use tracing::debug;

use cachewatch_core::{CacheResult, MonitorConfig};

/// Derives vitals for an error-free result.
///
/// Called once per result from inside the processor's serialized window.
/// Implementations must terminate and must not block on the pipeline.
pub trait VitalsCalculator: Send + Sync {
    fn get_vitals(
        &self,
        result: &mut CacheResult,
        previous: Option<&CacheResult>,
        config: &MonitorConfig,
    );
}

/// Copies gauges from the raw stats and derives outbound throughput from
/// the byte counter delta against the previous result.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeltaVitals;

impl VitalsCalculator for DeltaVitals {
    fn get_vitals(
        &self,
        result: &mut CacheResult,
        previous: Option<&CacheResult>,
        _config: &MonitorConfig,
    ) {
        let stats = &result.stats;
        result.vitals.load_avg = stats.load_avg;
        result.vitals.bytes_out = stats.bytes_out;
        result.vitals.bytes_in = stats.bytes_in;
        result.vitals.max_kbps_out = stats.interface_speed_mbps as f64 * 1000.0;
        result.vitals.kbps_out = 0.0;

        let Some(prev) = previous.filter(|p| !p.is_error()) else {
            return;
        };

        if result.time_ms <= prev.time_ms {
            debug!(cache = %result.id, "previous result is not older, skipping throughput");
            return;
        }
        if stats.bytes_out < prev.stats.bytes_out {
            debug!(cache = %result.id, "byte counter went backwards, skipping throughput");
            return;
        }

        let elapsed_secs = (result.time_ms - prev.time_ms) as f64 / 1000.0;
        let bits = (stats.bytes_out - prev.stats.bytes_out) as f64 * 8.0;
        result.vitals.kbps_out = bits / 1000.0 / elapsed_secs;
    }
}
