//! Full upload cycle: wake lock, upload, readiness polling.

use std::sync::Arc;
use std::time::Duration;

use datadrop_transfer::SelectedFile;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::coordinator::UploadCoordinator;
use crate::error::UploadError;
use crate::readiness::{DEFAULT_POLL_INTERVAL, ReadinessPoller, ReadinessUpdate};
use crate::transport::UploadTransport;
use crate::types::{DatasetMetadata, UploadEvent};
use crate::wake_lock::WakeLockGuard;

/// Result of a completed upload cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub dataset_id: String,
    /// Terminal readiness, or `None` when polling was cancelled.
    pub readiness: Option<ReadinessUpdate>,
}

/// Orchestrates one dataset upload from selection to readiness.
///
/// Events are delivered through the receiver returned by
/// [`take_events`](Self::take_events), which must be drained while the
/// pipeline runs. If the receiver was never taken, `run` drops it and events
/// are discarded.
pub struct DatasetPipeline {
    transport: Arc<dyn UploadTransport>,
    wake_lock: WakeLockGuard,
    poll_interval: Duration,
    events_tx: mpsc::Sender<UploadEvent>,
    events_rx: Option<mpsc::Receiver<UploadEvent>>,
    cancel: CancellationToken,
}

impl DatasetPipeline {
    pub fn new(transport: Arc<dyn UploadTransport>, wake_lock: WakeLockGuard) -> Self {
        let (events_tx, events_rx) = mpsc::channel(256);
        Self {
            transport,
            wake_lock,
            poll_interval: DEFAULT_POLL_INTERVAL,
            events_tx,
            events_rx: Some(events_rx),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Takes the event receiver. Can only be called once.
    pub fn take_events(&mut self) -> Option<mpsc::Receiver<UploadEvent>> {
        self.events_rx.take()
    }

    /// Returns a cancellation token for this cycle.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn wake_lock(&self) -> &WakeLockGuard {
        &self.wake_lock
    }

    /// Uploads `selection` and waits until the server settles the dataset.
    ///
    /// The wake lock is held for the whole cycle and released on every exit
    /// path. Polling starts only after the last chunk was accepted.
    pub async fn run(
        &mut self,
        selection: &[SelectedFile],
        metadata: DatasetMetadata,
        chunk_size: u64,
    ) -> Result<PipelineOutcome, UploadError> {
        // Nobody drains an untaken receiver; closing it keeps sends from blocking.
        if self.events_rx.take().is_some() {
            debug!("event receiver not taken, discarding events");
        }

        self.wake_lock.acquire().await;
        let result = self.run_cycle(selection, metadata, chunk_size).await;
        self.wake_lock.release().await;
        result
    }

    async fn run_cycle(
        &self,
        selection: &[SelectedFile],
        metadata: DatasetMetadata,
        chunk_size: u64,
    ) -> Result<PipelineOutcome, UploadError> {
        let transport = self.transport.as_ref();

        let mut coordinator = UploadCoordinator::new(
            transport,
            chunk_size,
            self.events_tx.clone(),
            self.cancel.clone(),
        );
        let handle = coordinator.run(selection, metadata).await?;

        let poller = ReadinessPoller::new(transport, self.events_tx.clone(), self.cancel.clone())
            .with_interval(self.poll_interval);
        let readiness = poller.run(&handle.id).await;

        if let Some(update) = &readiness {
            info!(dataset = %handle.id, state = %update.state, "dataset settled");
        }
        Ok(PipelineOutcome {
            dataset_id: handle.id,
            readiness,
        })
    }
}
