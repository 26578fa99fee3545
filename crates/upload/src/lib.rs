//! Resumable chunked dataset upload and readiness tracking.
//!
//! This crate implements the **upload engine** of the datadrop client. It
//! has no UI: callers hand in a file selection plus dataset metadata and
//! receive [`UploadEvent`]s while the pipeline runs.
//!
//! # Pipeline
//!
//! 1. **Create**: announce the dataset and its files to the server
//! 2. **Transfer**: send every file, chunk by chunk, resuming from the
//!    server's per-file chunk accounting
//! 3. **Readiness**: poll the dataset status until the server reports a
//!    terminal stage
//!
//! A wake lock is held for the whole cycle so the machine does not go to
//! sleep mid-transfer.

pub mod coordinator;
pub mod error;
pub mod pipeline;
pub mod readiness;
pub mod transport;
pub mod types;
pub mod wake_lock;

// Re-export primary types for convenience.
pub use coordinator::UploadCoordinator;
pub use error::{TransportError, UploadError, WakeLockError};
pub use pipeline::{DatasetPipeline, PipelineOutcome};
pub use readiness::{Readiness, ReadinessPoller, ReadinessState, ReadinessUpdate};
pub use transport::{HttpTransport, UploadTransport};
pub use types::{
    ChunkReceipt, DatasetHandle, DatasetMetadata, FileChunkAccount, UploadEvent, UploadPlan,
    UploadProgressSnapshot, UploadState,
};
pub use wake_lock::{HeldLock, InhibitWakeLock, NoopWakeLock, Visibility, WakeLock, WakeLockGuard};
