//! End-to-end tests: concurrent pollers feeding the health result manager
//! while readers watch the published stores.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cachewatch_core::{
    CacheResult, MonitorConfig, Profile, ProfileParameters, RawStats, TrafficServer,
};
use cachewatch_health::{result_channel, HealthResultManager, HealthStores};

const CACHES: [&str; 4] = ["edge-1", "edge-2", "edge-3", "mid-1"];
const POLLS_PER_CACHE: u64 = 25;
const HISTORY_COUNT: i64 = 3;

fn monitor_config() -> MonitorConfig {
    let mut config = MonitorConfig::default();
    for cache in CACHES {
        config.traffic_server.insert(
            cache.to_string(),
            TrafficServer {
                profile: "EDGE".to_string(),
                cache_group: "east".to_string(),
            },
        );
    }
    config.profile.insert(
        "EDGE".to_string(),
        Profile {
            parameters: ProfileParameters {
                history_count: HISTORY_COUNT,
                health_threshold_load_avg: Some(10.0),
                health_threshold_available_kbps: None,
            },
        },
    );
    config
}

fn stats(load_avg: f64) -> RawStats {
    RawStats {
        load_avg,
        bytes_out: 0,
        bytes_in: 0,
        interface_speed_mbps: 1_000,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_pollers_are_all_completed() {
    let stores = HealthStores::new(100);
    stores.monitor_config.set(monitor_config());

    let (sender, rx) = result_channel(16);
    let manager = HealthResultManager::new(stores.clone(), Duration::from_millis(5)).start(rx);

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let stores = stores.clone();
        let done = done.clone();
        tokio::spawn(async move {
            while !done.load(Ordering::Relaxed) {
                let history = stores.history.get();
                for (cache, entries) in history.iter() {
                    assert!(!entries.is_empty(), "{cache} has an empty history");
                    assert!(entries.len() <= HISTORY_COUNT as usize);
                    assert!(
                        entries.windows(2).all(|w| w[0].poll_id > w[1].poll_id),
                        "{cache} history is not most-recent-first"
                    );
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let mut pollers = Vec::new();
    for (n, cache) in CACHES.into_iter().enumerate() {
        let sender = sender.clone();
        pollers.push(tokio::spawn(async move {
            let mut completed = 0;
            for i in 0..POLLS_PER_CACHE {
                let poll_id = (n as u64) * 1_000 + i;
                // Every fifth poll of the first cache fails, never the last one.
                let result = if n == 0 && i % 5 == 2 {
                    CacheResult::failed(cache, poll_id, "connection refused")
                } else {
                    CacheResult::new(cache, poll_id, stats(1.0))
                };
                let finished = sender.submit(result).await.unwrap();
                assert_eq!(finished, poll_id);
                completed += 1;
            }
            completed
        }));
    }
    drop(sender);

    let mut completed = 0;
    for poller in pollers {
        completed += poller.await.unwrap();
    }
    manager.await.unwrap();
    done.store(true, Ordering::Relaxed);
    reader.await.unwrap();

    let total = POLLS_PER_CACHE * CACHES.len() as u64;
    assert_eq!(completed, total);
    assert_eq!(stores.fetch_count.get(), total);
    assert_eq!(stores.error_count.get(), POLLS_PER_CACHE / 5);

    let history = stores.history.get();
    let durations = stores.durations.get();
    for (n, cache) in CACHES.into_iter().enumerate() {
        let ids: Vec<u64> = history[cache].iter().map(|r| r.poll_id).collect();
        let last = (n as u64) * 1_000 + POLLS_PER_CACHE - 1;
        assert_eq!(ids, vec![last, last - 1, last - 2]);
        assert!(durations.contains_key(cache));
    }

    // The last result of edge-1 succeeded, so it ends available.
    let statuses = stores.statuses.get();
    assert!(statuses["edge-1"].available);
    assert!(stores.local_states.get().caches["edge-1"].is_available);
    // Each failure and each recovery of edge-1 raised an event.
    assert_eq!(stores.events.get().len() as u64, 2 * (POLLS_PER_CACHE / 5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn overloaded_cache_is_marked_unavailable() {
    let stores = HealthStores::new(10);
    stores.monitor_config.set(monitor_config());

    let (sender, rx) = result_channel(4);
    let manager = HealthResultManager::new(stores.clone(), Duration::from_millis(5)).start(rx);

    sender
        .submit(CacheResult::new("edge-2", 1, stats(42.0)))
        .await
        .unwrap();

    let statuses = stores.statuses.get();
    assert!(!statuses["edge-2"].available);
    assert!(statuses["edge-2"].why.contains("load average"));
    let events = stores.events.get();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].hostname, "edge-2");

    drop(sender);
    manager.await.unwrap();
}
