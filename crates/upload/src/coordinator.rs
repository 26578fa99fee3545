//! Sequential, resumable upload of one dataset.
//!
//! The coordinator creates the dataset record, then sends every file chunk by
//! chunk in plan order. Files the server already holds completely are
//! skipped, and partially received files resume after the last chunk the
//! server acknowledged.

use datadrop_transfer::{ChunkLayout, ChunkRange, ChunkReader, FileDescriptor, SelectedFile};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::UploadError;
use crate::transport::UploadTransport;
use crate::types::{
    DatasetHandle, DatasetMetadata, FileChunkAccount, UploadEvent, UploadPlan,
    UploadProgressSnapshot, UploadState,
};

/// Drives one dataset upload against an [`UploadTransport`].
pub struct UploadCoordinator<'a> {
    transport: &'a dyn UploadTransport,
    chunk_size: u64,
    state: UploadState,
    events_tx: mpsc::Sender<UploadEvent>,
    cancel: CancellationToken,
}

impl<'a> UploadCoordinator<'a> {
    /// Creates an idle coordinator. `chunk_size` comes from the server
    /// configuration.
    pub fn new(
        transport: &'a dyn UploadTransport,
        chunk_size: u64,
        events_tx: mpsc::Sender<UploadEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            chunk_size,
            state: UploadState::Idle,
            events_tx,
            cancel,
        }
    }

    pub fn state(&self) -> UploadState {
        self.state
    }

    /// Uploads `selection` as a new dataset.
    ///
    /// Validation failures return before any request and leave the
    /// coordinator idle. Every other failure is terminal: the state becomes
    /// [`UploadState::Failed`] and nothing further is sent.
    pub async fn run(
        &mut self,
        selection: &[SelectedFile],
        metadata: DatasetMetadata,
    ) -> Result<DatasetHandle, UploadError> {
        if self.chunk_size == 0 {
            return Err(UploadError::Validation("chunk size must be positive".into()));
        }
        let plan = UploadPlan::build(selection, metadata)?;

        match self.upload(selection, &plan).await {
            Ok(handle) => {
                self.set_state(UploadState::Completed).await;
                info!(dataset = %handle.id, files = handle.files.len(), "upload completed");
                Ok(handle)
            }
            Err(e) => {
                let err_msg = e.to_string();
                self.set_state(UploadState::Failed).await;
                let _ = self
                    .events_tx
                    .send(UploadEvent::Failed {
                        error: err_msg.clone(),
                    })
                    .await;
                error!(error = %err_msg, "upload failed");
                Err(e)
            }
        }
    }

    async fn upload(
        &mut self,
        selection: &[SelectedFile],
        plan: &UploadPlan,
    ) -> Result<DatasetHandle, UploadError> {
        // 1. Create the dataset record
        self.check_cancelled()?;
        self.set_state(UploadState::Creating).await;

        let mut handle = self
            .transport
            .create_dataset(plan)
            .await
            .map_err(|e| UploadError::DatasetCreationFailed(e.detail()))?;

        debug!(
            dataset = %handle.id,
            files = plan.files.len(),
            total_bytes = plan.total_bytes(),
            "dataset created"
        );
        let _ = self
            .events_tx
            .send(UploadEvent::DatasetCreated {
                dataset_id: handle.id.clone(),
            })
            .await;

        if handle.files.len() != plan.files.len() {
            return Err(UploadError::LayoutMismatch(format!(
                "server tracks {} files, plan has {}",
                handle.files.len(),
                plan.files.len()
            )));
        }

        // 2. Transfer files in plan order
        self.set_state(UploadState::Transferring).await;

        for (i, (file, descriptor)) in selection.iter().zip(&plan.files).enumerate() {
            let file_index = i + 1;
            let account = &mut handle.files[i];

            if account.is_complete() {
                debug!(file = %descriptor.path, "already on server, skipping");
                continue;
            }

            let layout = datadrop_transfer::plan(file_index, descriptor, self.chunk_size)?;
            if account.chunks_expected != layout.chunk_count() as u64 {
                return Err(UploadError::LayoutMismatch(format!(
                    "{}: server expects {} chunks, planned {}",
                    descriptor.path,
                    account.chunks_expected,
                    layout.chunk_count()
                )));
            }

            let mut reader = ChunkReader::open(file).await?;
            match &layout {
                ChunkLayout::Whole(range) => {
                    self.send_chunk(&handle.id, descriptor, &mut reader, range, account)
                        .await?;
                }
                ChunkLayout::Chunked(ranges) => {
                    let skip = account.chunks_received as usize;
                    if skip > 0 {
                        debug!(file = %descriptor.path, from_chunk = skip + 1, "resuming file");
                    }
                    for range in ranges.iter().skip(skip) {
                        self.send_chunk(&handle.id, descriptor, &mut reader, range, account)
                            .await?;
                    }
                }
            }
        }

        Ok(handle)
    }

    /// Reads one range, sends it and folds the response into `account`.
    async fn send_chunk(
        &self,
        dataset_id: &str,
        descriptor: &FileDescriptor,
        reader: &mut ChunkReader,
        range: &ChunkRange,
        account: &mut FileChunkAccount,
    ) -> Result<(), UploadError> {
        self.check_cancelled()?;

        let bytes = reader.read(range).await?;
        let receipt = self
            .transport
            .put_chunk(
                dataset_id,
                range.file_index,
                range.chunk_number,
                descriptor.basename(),
                bytes,
            )
            .await
            .map_err(|e| UploadError::ChunkRejected {
                path: descriptor.path.clone(),
                chunk: range.chunk_number,
                detail: e.detail(),
            })?;

        account.chunks_received = receipt
            .chunks_received_for_file
            .unwrap_or(range.chunk_number as u64);

        debug!(
            dataset = %dataset_id,
            file = %descriptor.path,
            chunk = range.chunk_number,
            received = account.chunks_received,
            "chunk accepted"
        );

        let current_file_name = if receipt.file_label.is_empty() {
            descriptor.path.clone()
        } else {
            receipt.file_label
        };
        let _ = self
            .events_tx
            .send(UploadEvent::Progress(UploadProgressSnapshot {
                dataset_progress: receipt.dataset_progress,
                file_progress: receipt.file_progress,
                current_file_name,
            }))
            .await;

        Ok(())
    }

    async fn set_state(&mut self, state: UploadState) {
        self.state = state;
        let _ = self.events_tx.send(UploadEvent::StateChanged(state)).await;
    }

    fn check_cancelled(&self) -> Result<(), UploadError> {
        if self.cancel.is_cancelled() {
            Err(UploadError::Cancelled)
        } else {
            Ok(())
        }
    }
}
