//! Wire types for the datadrop dataset API.
//!
//! Every request and response body the upload client exchanges with the
//! server lives here, together with the endpoint path builders and the
//! dataset lifecycle stages reported by the status endpoint.

pub mod constants;
pub mod messages;
pub mod types;

// Re-export primary types for convenience.
pub use constants::{
    DEFAULT_RETENTION_HOURS, Endpoint, MAX_RETENTION_HOURS, MIN_RETENTION_HOURS,
};
pub use messages::{
    ChunkUploadResponse, CreateDatasetRequest, CreateDatasetResponse, DatasetStatusResponse,
    ErrorResponse, FileChunkStatus, FileEntry, ServerConfig,
};
pub use types::{DatasetStage, retention_time_label};
