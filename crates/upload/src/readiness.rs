//! Dataset readiness tracking after the upload completes.
//!
//! [`Readiness`] is the pure transition table from polled server stages to
//! user-facing states. [`ReadinessPoller`] drives it on a timer until a
//! terminal state is reached.

use std::fmt;
use std::time::Duration;

use datadrop_protocol::DatasetStage;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::transport::UploadTransport;
use crate::types::UploadEvent;

/// Default delay between two status queries.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Readiness of an uploaded dataset as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Initial,
    Scanning,
    Scanned,
    Available,
    Deleted,
    Failed,
    Unknown,
}

impl ReadinessState {
    /// Terminal states end polling.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Available | Self::Deleted | Self::Failed | Self::Unknown
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "initial",
            Self::Scanning => "scanning",
            Self::Scanned => "scanned",
            Self::Available => "available",
            Self::Deleted => "deleted",
            Self::Failed => "failed",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A readiness state together with its display message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessUpdate {
    pub state: ReadinessState,
    pub message: String,
}

impl ReadinessUpdate {
    fn new(state: ReadinessState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

/// Readiness state machine.
///
/// Fed with every polled stage; yields an update only when the stage differs
/// from the previously observed one. Once terminal, further input is ignored.
#[derive(Debug, Clone)]
pub struct Readiness {
    state: ReadinessState,
    last_stage: DatasetStage,
}

impl Default for Readiness {
    fn default() -> Self {
        Self::new()
    }
}

impl Readiness {
    pub fn new() -> Self {
        Self {
            state: ReadinessState::Initial,
            last_stage: DatasetStage::Initial,
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    /// The update announced when tracking starts.
    pub fn initial_update(&self) -> ReadinessUpdate {
        ReadinessUpdate::new(ReadinessState::Initial, "Checking dataset for malware")
    }

    /// Applies a polled stage.
    pub fn observe(&mut self, stage: DatasetStage) -> Option<ReadinessUpdate> {
        if self.state.is_terminal() || stage == self.last_stage {
            return None;
        }

        let previous = self.state;
        let update = match &stage {
            DatasetStage::Initial => None,
            DatasetStage::Scanning => Some(ReadinessUpdate::new(
                ReadinessState::Scanning,
                "Checking dataset for malware",
            )),
            DatasetStage::Scanned => Some(ReadinessUpdate::new(
                ReadinessState::Scanned,
                "Preparing dataset for download",
            )),
            DatasetStage::Available => Some(ReadinessUpdate::new(
                ReadinessState::Available,
                "Dataset ready",
            )),
            // Removal straight after the upload means the scanner flagged it.
            DatasetStage::Deleted if previous == ReadinessState::Initial => Some(
                ReadinessUpdate::new(
                    ReadinessState::Deleted,
                    "Malware detected, the dataset was deleted",
                ),
            ),
            DatasetStage::Deleted => Some(ReadinessUpdate::new(
                ReadinessState::Deleted,
                "Something went wrong, the dataset was deleted",
            )),
            DatasetStage::Other(_) => Some(ReadinessUpdate::new(
                ReadinessState::Unknown,
                "Something went wrong, unknown state",
            )),
        };

        self.last_stage = stage;
        let update = update?;
        self.state = update.state;
        Some(update)
    }

    /// Records a failed status query. Always terminal.
    pub fn fail(&mut self, error: &str) -> Option<ReadinessUpdate> {
        if self.state.is_terminal() {
            return None;
        }
        self.state = ReadinessState::Failed;
        Some(ReadinessUpdate::new(
            ReadinessState::Failed,
            format!("Upload failed: {error}"),
        ))
    }
}

/// Polls the dataset status until a terminal readiness state.
pub struct ReadinessPoller<'a> {
    transport: &'a dyn UploadTransport,
    interval: Duration,
    events_tx: mpsc::Sender<UploadEvent>,
    cancel: CancellationToken,
}

impl<'a> ReadinessPoller<'a> {
    pub fn new(
        transport: &'a dyn UploadTransport,
        events_tx: mpsc::Sender<UploadEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            interval: DEFAULT_POLL_INTERVAL,
            events_tx,
            cancel,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Runs until a terminal state and returns it, or `None` if cancelled.
    ///
    /// The first query is issued one interval after the start; queries never
    /// overlap.
    pub async fn run(&self, dataset_id: &str) -> Option<ReadinessUpdate> {
        let mut readiness = Readiness::new();
        self.emit(readiness.initial_update()).await;

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    debug!(dataset = %dataset_id, "readiness polling cancelled");
                    return None;
                }
                _ = ticker.tick() => {}
            }

            let update = match self.transport.dataset_status(dataset_id).await {
                Ok(stage) => {
                    debug!(dataset = %dataset_id, stage = %stage, "status polled");
                    readiness.observe(stage)
                }
                Err(e) => {
                    warn!(dataset = %dataset_id, error = %e, "status query failed");
                    readiness.fail(&e.detail())
                }
            };

            let Some(update) = update else {
                continue;
            };
            self.emit(update.clone()).await;

            if update.state.is_terminal() {
                info!(dataset = %dataset_id, state = %update.state, "readiness settled");
                return Some(update);
            }
        }
    }

    async fn emit(&self, update: ReadinessUpdate) {
        let _ = self.events_tx.send(UploadEvent::Readiness(update)).await;
    }
}
