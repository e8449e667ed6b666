//! Error types for the health pipeline.
//!
//! Nothing that happens while a batch is processed is reported as an error;
//! these cover the edges where a producer or the daemon talks to the
//! pipeline.

use thiserror::Error;

use cachewatch_core::{ConfigError, PollId};

#[derive(Debug, Error)]
pub enum HealthError {
    #[error("health result manager is not running")]
    ManagerStopped,

    #[error("poll {0} was dropped before completion")]
    PollDropped(PollId),

    #[error("invalid health configuration: {0}")]
    Config(#[from] ConfigError),
}
