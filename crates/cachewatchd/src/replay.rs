//! Replay recorded poll results through the health pipeline.
//!
//! Each cache gets its own producer task that submits that cache's results
//! in file order and waits for every completion before sending the next,
//! the way a live poller would.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::Serialize;
use tracing::{debug, info};

use cachewatch_core::{
    CacheAvailableStatus, CacheName, CacheResult, Config, CrStates, Event, MonitorConfig, PollId,
    TopologyData,
};
use cachewatch_health::{result_channel, HealthResultManager, HealthStores};

/// Configuration the replay runs with.
#[derive(Debug, Clone, Default)]
pub struct ReplayInputs {
    pub config: Config,
    pub monitor_config: MonitorConfig,
    pub topology: TopologyData,
}

impl ReplayInputs {
    pub fn load(
        config: Option<&Path>,
        monitor: &Path,
        topology: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let config = match config {
            Some(path) => Config::from_file(path)
                .with_context(|| format!("loading daemon config {}", path.display()))?,
            None => Config::default(),
        };
        let monitor_config = MonitorConfig::from_file(monitor)
            .with_context(|| format!("loading monitor config {}", monitor.display()))?;
        let topology = match topology {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("reading topology {}", path.display()))?;
                toml::from_str(&content)
                    .with_context(|| format!("parsing topology {}", path.display()))?
            }
            None => TopologyData::default(),
        };

        Ok(Self {
            config,
            monitor_config,
            topology,
        })
    }
}

/// State of the pipeline after a replay.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub fetch_count: u64,
    pub error_count: u64,
    /// Poll ids retained per cache, most-recent-first.
    pub history: BTreeMap<CacheName, Vec<PollId>>,
    pub durations_ms: BTreeMap<CacheName, u64>,
    pub statuses: BTreeMap<CacheName, CacheAvailableStatus>,
    pub local_states: CrStates,
    pub events: Vec<Event>,
}

/// Read a JSON-lines file of poll results.
pub fn read_results(path: &Path) -> anyhow::Result<Vec<CacheResult>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading results {}", path.display()))?;
    parse_results(&content)
}

/// Parse JSON-lines poll results, skipping blank lines.
pub fn parse_results(content: &str) -> anyhow::Result<Vec<CacheResult>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(n, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid poll result on line {}", n + 1))
        })
        .collect()
}

/// Run every result through a fresh pipeline and report the final state.
pub async fn run(
    inputs: ReplayInputs,
    results: Vec<CacheResult>,
) -> anyhow::Result<ReplayReport> {
    let stores = HealthStores::from_config(&inputs.config);
    stores.monitor_config.set(inputs.monitor_config);
    stores.topology.set(inputs.topology);

    let (sender, rx) = result_channel(inputs.config.result_channel_capacity);
    let manager = HealthResultManager::from_config(stores.clone(), &inputs.config)?.start(rx);

    let mut per_cache: BTreeMap<CacheName, Vec<CacheResult>> = BTreeMap::new();
    for result in results {
        per_cache.entry(result.id.clone()).or_default().push(result);
    }
    info!(caches = per_cache.len(), "replaying poll results");

    let mut pollers = Vec::with_capacity(per_cache.len());
    for (cache, results) in per_cache {
        let sender = sender.clone();
        pollers.push(tokio::spawn(async move {
            for result in results {
                let poll_id = sender.submit(result).await?;
                debug!(%cache, poll_id, "poll acknowledged");
            }
            anyhow::Ok(())
        }));
    }
    // The manager stops once the last poller is done with its sender.
    drop(sender);

    for poller in pollers {
        poller.await.context("poller task failed")??;
    }
    manager.await.context("health result manager task failed")?;

    Ok(report(&stores))
}

fn report(stores: &HealthStores) -> ReplayReport {
    let history = stores
        .history
        .get()
        .iter()
        .map(|(cache, entries)| (cache.clone(), entries.iter().map(|r| r.poll_id).collect()))
        .collect();
    let durations_ms = stores
        .durations
        .get()
        .iter()
        .map(|(cache, d)| (cache.clone(), d.as_millis() as u64))
        .collect();
    let statuses = stores
        .statuses
        .get()
        .iter()
        .map(|(cache, status)| (cache.clone(), status.clone()))
        .collect();

    ReplayReport {
        fetch_count: stores.fetch_count.get(),
        error_count: stores.error_count.get(),
        history,
        durations_ms,
        statuses,
        local_states: stores.local_states.get_copy(),
        events: stores.events.get().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MONITOR_TOML: &str = r#"
[traffic_server.edge-1]
profile = "EDGE"

[traffic_server.edge-2]
profile = "EDGE"

[profile.EDGE.parameters]
history_count = 2
health_threshold_load_avg = 10.0
"#;

    const RESULTS: &str = r#"
{"id":"edge-1","poll_id":1,"time_ms":1000,"stats":{"load_avg":1.0,"bytes_out":0}}
{"id":"edge-2","poll_id":2,"time_ms":1000,"error":"connection refused"}
{"id":"edge-1","poll_id":3,"time_ms":2000,"stats":{"load_avg":1.0,"bytes_out":1000}}

{"id":"edge-1","poll_id":4,"time_ms":3000,"stats":{"load_avg":1.0,"bytes_out":2000}}
"#;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_results_skips_blank_lines() {
        let results = parse_results(RESULTS).unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[1].error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn parse_results_reports_line_number() {
        let input = "{\"id\":\"edge-1\",\"poll_id\":1,\"time_ms\":1}\nnot json";
        let err = parse_results(input).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn load_inputs_from_files() {
        let config = write_file("health_flush_interval = \"5ms\"\nmax_events = 5\n");
        let monitor = write_file(MONITOR_TOML);
        let topology = write_file("[server_cachegroups]\nedge-1 = \"east\"\n");

        let inputs = ReplayInputs::load(
            Some(config.path()),
            monitor.path(),
            Some(topology.path()),
        )
        .unwrap();
        assert_eq!(inputs.config.max_events, 5);
        assert_eq!(inputs.monitor_config.history_count("edge-1"), 2);
        assert_eq!(inputs.topology.server_cachegroups["edge-1"], "east");
    }

    #[test]
    fn load_inputs_rejects_unknown_profile() {
        let monitor = write_file("[traffic_server.edge-1]\nprofile = \"NOPE\"\n");
        let err = ReplayInputs::load(None, monitor.path(), None).unwrap_err();
        assert!(format!("{err:#}").contains("unknown profile"));
    }

    #[tokio::test]
    async fn replay_reports_final_state() {
        let inputs = ReplayInputs {
            monitor_config: toml::from_str(MONITOR_TOML).unwrap(),
            ..ReplayInputs::default()
        };

        let report = run(inputs, parse_results(RESULTS).unwrap()).await.unwrap();

        assert_eq!(report.fetch_count, 4);
        assert_eq!(report.error_count, 1);
        assert_eq!(report.history["edge-1"], vec![4, 3]);
        assert_eq!(report.history["edge-2"], vec![2]);
        assert!(report.durations_ms.contains_key("edge-1"));
        assert!(!report.durations_ms.contains_key("edge-2"));
        assert!(report.statuses["edge-1"].available);
        assert!(!report.statuses["edge-2"].available);
        assert!(!report.local_states.caches["edge-2"].is_available);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].hostname, "edge-2");
    }
}
