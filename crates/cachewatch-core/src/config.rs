//! Daemon and monitor configuration parsing.
//!
//! Two TOML documents drive the pipeline:
//!
//! - [`Config`]: process-level settings such as the health flush interval.
//! - [`MonitorConfig`]: per-cache server entries and the profiles they
//!   reference. Replaced wholesale whenever the fleet configuration changes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::types::CacheName;

/// Errors raised while validating configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid duration {value:?} for {field}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("{field} {value:?} exceeds the maximum of {max:?}")]
    TooLarge {
        field: &'static str,
        value: String,
        max: Duration,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("server {server} references unknown profile {profile}")]
    UnknownProfile { server: String, profile: String },
}

// ── Daemon config ─────────────────────────────────────────────────

/// Longest accepted health flush interval.
pub const MAX_HEALTH_FLUSH_INTERVAL: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum time a health result may wait before its batch is forced
    /// through (e.g. "20ms").
    #[serde(default = "default_health_flush_interval")]
    pub health_flush_interval: String,
    /// Number of availability events retained in the event log.
    #[serde(default = "default_max_events")]
    pub max_events: usize,
    /// Capacity of the health result channel.
    #[serde(default = "default_result_channel_capacity")]
    pub result_channel_capacity: usize,
}

fn default_health_flush_interval() -> String {
    "20ms".to_string()
}

fn default_max_events() -> usize {
    200
}

fn default_result_channel_capacity() -> usize {
    1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            health_flush_interval: default_health_flush_interval(),
            max_events: default_max_events(),
            result_channel_capacity: default_result_channel_capacity(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field that has a constrained range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.health_flush_interval()?;
        if self.max_events == 0 {
            return Err(ConfigError::Zero("max_events"));
        }
        if self.result_channel_capacity == 0 {
            return Err(ConfigError::Zero("result_channel_capacity"));
        }
        Ok(())
    }

    /// The parsed health flush interval, at most
    /// [`MAX_HEALTH_FLUSH_INTERVAL`].
    pub fn health_flush_interval(&self) -> Result<Duration, ConfigError> {
        let interval = parse_duration(&self.health_flush_interval).ok_or_else(|| {
            ConfigError::InvalidDuration {
                field: "health_flush_interval",
                value: self.health_flush_interval.clone(),
            }
        })?;
        if interval > MAX_HEALTH_FLUSH_INTERVAL {
            return Err(ConfigError::TooLarge {
                field: "health_flush_interval",
                value: self.health_flush_interval.clone(),
                max: MAX_HEALTH_FLUSH_INTERVAL,
            });
        }
        Ok(interval)
    }
}

// ── Monitor config ────────────────────────────────────────────────

/// Snapshot of the fleet configuration the health pipeline consults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Cache hostname → server entry.
    #[serde(default)]
    pub traffic_server: HashMap<CacheName, TrafficServer>,
    /// Profile name → profile.
    #[serde(default)]
    pub profile: HashMap<String, Profile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficServer {
    pub profile: String,
    #[serde(default)]
    pub cache_group: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub parameters: ProfileParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileParameters {
    /// Number of health results retained per cache. Values below 1 are
    /// treated as 1 by the result processor.
    #[serde(default)]
    pub history_count: i64,
    /// Load average above which a cache is marked unavailable.
    #[serde(default)]
    pub health_threshold_load_avg: Option<f64>,
    /// Minimum spare outbound bandwidth in kbps (interface capacity minus
    /// current outbound rate). Below it a cache is marked unavailable.
    #[serde(default)]
    pub health_threshold_available_kbps: Option<f64>,
}

impl MonitorConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: MonitorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (server, entry) in &self.traffic_server {
            if !self.profile.contains_key(&entry.profile) {
                return Err(ConfigError::UnknownProfile {
                    server: server.clone(),
                    profile: entry.profile.clone(),
                });
            }
        }
        Ok(())
    }

    /// Profile parameters for a cache, resolved through its server entry.
    pub fn parameters(&self, cache: &str) -> Option<&ProfileParameters> {
        let server = self.traffic_server.get(cache)?;
        self.profile.get(&server.profile).map(|p| &p.parameters)
    }

    /// Configured history count for a cache; 0 when the cache or its
    /// profile is unknown.
    pub fn history_count(&self, cache: &str) -> i64 {
        self.parameters(cache).map(|p| p.history_count).unwrap_or(0)
    }
}

/// Parse a duration string like "5s", "500ms", "1m". `None` when the
/// string is malformed or the value does not fit a `Duration`.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
