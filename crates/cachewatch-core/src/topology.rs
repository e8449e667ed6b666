//! Fleet topology: which caches belong to which cache groups and delivery
//! services. The health pipeline passes it through to the availability
//! computation without interpreting it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::CacheName;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopologyData {
    /// Cache → cache group.
    #[serde(default)]
    pub server_cachegroups: HashMap<CacheName, String>,
    /// Cache → server type, e.g. "EDGE" or "MID".
    #[serde(default)]
    pub server_types: HashMap<CacheName, String>,
    /// Delivery service → caches assigned to it.
    #[serde(default)]
    pub delivery_service_servers: HashMap<String, Vec<CacheName>>,
}

impl TopologyData {
    /// Delivery services a cache is assigned to, sorted.
    pub fn delivery_services_for(&self, cache: &str) -> Vec<&str> {
        let mut services: Vec<&str> = self
            .delivery_service_servers
            .iter()
            .filter(|(_, servers)| servers.iter().any(|s| s == cache))
            .map(|(ds, _)| ds.as_str())
            .collect();
        services.sort_unstable();
        services
    }
}
