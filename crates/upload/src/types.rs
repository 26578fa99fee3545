//! Data types for the upload flow.

use datadrop_protocol::{
    CreateDatasetRequest, CreateDatasetResponse, DEFAULT_RETENTION_HOURS, MAX_RETENTION_HOURS,
    MIN_RETENTION_HOURS,
};
use datadrop_transfer::{FileDescriptor, SelectedFile, describe_selection};

use crate::error::UploadError;
use crate::readiness::ReadinessUpdate;

/// Dataset-level settings supplied by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetMetadata {
    pub label: String,
    pub retention_hours: u32,
    pub public: bool,
    pub hidden: bool,
}

impl Default for DatasetMetadata {
    fn default() -> Self {
        Self {
            label: String::new(),
            retention_hours: DEFAULT_RETENTION_HOURS,
            public: false,
            hidden: false,
        }
    }
}

/// Everything announced to the server when a dataset is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPlan {
    pub files: Vec<FileDescriptor>,
    pub metadata: DatasetMetadata,
}

impl UploadPlan {
    /// Builds a plan from a file selection, preserving its order.
    pub fn build(selection: &[SelectedFile], metadata: DatasetMetadata) -> Result<Self, UploadError> {
        if selection.is_empty() {
            return Err(UploadError::Validation(
                "select one or more files to upload".into(),
            ));
        }
        if !(MIN_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&metadata.retention_hours) {
            return Err(UploadError::Validation(format!(
                "retention time must be between {MIN_RETENTION_HOURS} and {MAX_RETENTION_HOURS} hours, got {}",
                metadata.retention_hours
            )));
        }
        let files =
            describe_selection(selection).map_err(|e| UploadError::Validation(e.to_string()))?;
        Ok(Self { files, metadata })
    }

    /// Returns `true` when the dataset will be listed and downloadable by
    /// anybody: public but not hidden.
    pub fn exposes_publicly(&self) -> bool {
        self.metadata.public && !self.metadata.hidden
    }

    /// Total number of bytes in the plan.
    pub fn total_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size_bytes).sum()
    }

    /// Converts the plan into the creation request body.
    pub fn to_request(&self) -> CreateDatasetRequest {
        CreateDatasetRequest {
            label: self.metadata.label.clone(),
            retention_time: self.metadata.retention_hours,
            hidden: self.metadata.hidden,
            public: self.metadata.public,
            files: self.files.iter().map(FileDescriptor::to_entry).collect(),
        }
    }
}

/// Server-side chunk accounting for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileChunkAccount {
    pub chunks_received: u64,
    pub chunks_expected: u64,
}

impl FileChunkAccount {
    pub fn is_complete(&self) -> bool {
        self.chunks_received >= self.chunks_expected
    }
}

/// A dataset created on the server, with its per-file chunk accounting.
///
/// The accounting is only ever refreshed from server responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetHandle {
    pub id: String,
    pub files: Vec<FileChunkAccount>,
}

impl From<CreateDatasetResponse> for DatasetHandle {
    fn from(resp: CreateDatasetResponse) -> Self {
        Self {
            id: resp.id,
            files: resp
                .files
                .into_iter()
                .map(|f| FileChunkAccount {
                    chunks_received: f.chunks_received,
                    chunks_expected: f.chunks_total,
                })
                .collect(),
        }
    }
}

/// What the server reported after accepting one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkReceipt {
    /// Chunks of the file the server now holds, when reported.
    pub chunks_received_for_file: Option<u64>,
    pub dataset_progress: f64,
    pub file_progress: f64,
    pub file_label: String,
}

/// Progress for display, rebuilt after every chunk response.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgressSnapshot {
    pub dataset_progress: f64,
    pub file_progress: f64,
    pub current_file_name: String,
}

/// Upload coordinator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadState {
    Idle,
    Creating,
    Transferring,
    Completed,
    Failed,
}

/// Event emitted while a dataset is uploaded and processed.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// The coordinator moved to a new state.
    StateChanged(UploadState),
    /// The dataset record was created.
    DatasetCreated { dataset_id: String },
    /// A chunk was accepted.
    Progress(UploadProgressSnapshot),
    /// The upload stopped on an error.
    Failed { error: String },
    /// The readiness state changed.
    Readiness(ReadinessUpdate),
}
