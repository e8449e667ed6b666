//! cachewatch-health: health result ingestion for a CDN cache fleet.
//!
//! Pollers submit [`PollResult`]s on a channel and wait for their
//! completion signal. A single background task drains the channel into
//! batches and applies each batch to the shared stores.
//!
//! # Architecture
//!
//! ```text
//! pollers ──PollResult──▶ mpsc ──▶ HealthResultManager task
//!                                    ├── batch collector (flush interval)
//!                                    └── ResultProcessor::process(batch)
//!                                          ├── VitalsCalculator   (per result)
//!                                          ├── prune_history      (per result)
//!                                          ├── AvailabilityCalculator (per batch)
//!                                          ├── ResultHistory / DurationMap set
//!                                          └── PollFinishGuard → completion signals
//! ```
//!
//! # Batching
//!
//! The collector blocks for the first result of a batch, then drains
//! whatever else is already queued. It processes as soon as the channel is
//! empty, or when the flush interval elapses while results keep arriving,
//! so a saturated channel cannot starve processing.
//!
//! Only the manager task calls the processor, so batches never overlap and
//! the stores it writes have a single writer.

pub mod availability;
pub mod error;
pub mod history;
pub mod manager;
pub mod poll;
pub mod processor;
pub mod vitals;

pub use availability::{
    AvailabilityCalculator, AvailabilityContext, ResultFilter, ThresholdAvailability,
};
pub use error::HealthError;
pub use history::prune_history;
pub use manager::{HealthResultManager, HealthStores};
pub use poll::{result_channel, PollResult, ResultSender};
pub use processor::ResultProcessor;
pub use vitals::{DeltaVitals, VitalsCalculator};
