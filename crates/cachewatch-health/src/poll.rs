//! Poll results in flight and the completion rendezvous.

use tokio::sync::{mpsc, oneshot};

use cachewatch_core::{CacheResult, PollId};

use crate::error::HealthError;

/// A result submitted by a poller, paired with the handle the pipeline
/// uses to tell the poller its result has been fully processed.
#[derive(Debug)]
pub struct PollResult {
    pub result: CacheResult,
    pub finished: oneshot::Sender<PollId>,
}

impl PollResult {
    /// Wrap a result, returning the receiver the poller waits on.
    pub fn new(result: CacheResult) -> (Self, oneshot::Receiver<PollId>) {
        let (finished, rx) = oneshot::channel();
        (Self { result, finished }, rx)
    }
}

/// Create the health result channel.
pub fn result_channel(capacity: usize) -> (ResultSender, mpsc::Receiver<PollResult>) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (ResultSender { tx }, rx)
}

/// Producer handle for the health result channel.
///
/// Dropping every `ResultSender` closes the channel, which makes the
/// manager finish its current batch and stop.
#[derive(Debug, Clone)]
pub struct ResultSender {
    tx: mpsc::Sender<PollResult>,
}

impl ResultSender {
    /// Submit a result and wait until the pipeline has processed it.
    ///
    /// Returns the poll id echoed by the completion signal.
    pub async fn submit(&self, result: CacheResult) -> Result<PollId, HealthError> {
        let poll_id = result.poll_id;
        let (poll, finished) = PollResult::new(result);
        self.send(poll).await?;
        finished.await.map_err(|_| HealthError::PollDropped(poll_id))
    }

    /// Enqueue an already wrapped result without waiting for completion.
    pub async fn send(&self, poll: PollResult) -> Result<(), HealthError> {
        self.tx
            .send(poll)
            .await
            .map_err(|_| HealthError::ManagerStopped)
    }
}
