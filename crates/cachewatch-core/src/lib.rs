pub mod config;
pub mod topology;
pub mod types;

pub use config::{
    Config, ConfigError, MonitorConfig, Profile, ProfileParameters, TrafficServer,
    MAX_HEALTH_FLUSH_INTERVAL,
};
pub use topology::TopologyData;
pub use types::*;
