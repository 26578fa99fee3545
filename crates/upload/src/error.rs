//! Upload error types.

/// Errors produced by a single HTTP exchange with the server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A non-chunk request was answered with a non-success status.
    #[error("server rejected request ({status}): {detail}")]
    ServerRejected { status: u16, detail: String },

    /// A chunk upload was answered with a non-success status.
    #[error("server rejected chunk ({status}): {detail}")]
    ChunkRejected { status: u16, detail: String },
}

impl TransportError {
    /// Returns the message to show to a user, without the status prefix
    /// when the server supplied one.
    pub fn detail(&self) -> String {
        match self {
            TransportError::ServerRejected { detail, .. }
            | TransportError::ChunkRejected { detail, .. } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors that end an upload run.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The selection or metadata cannot be uploaded; nothing was sent.
    #[error("invalid upload: {0}")]
    Validation(String),

    #[error("dataset creation failed: {0}")]
    DatasetCreationFailed(String),

    #[error("chunk {chunk} of {path} rejected: {detail}")]
    ChunkRejected {
        path: String,
        chunk: usize,
        detail: String,
    },

    /// The server's chunk accounting does not match the local plan.
    #[error("chunk layout mismatch: {0}")]
    LayoutMismatch(String),

    #[error("transfer error: {0}")]
    Transfer(#[from] datadrop_transfer::TransferError),

    #[error("cancelled")]
    Cancelled,
}

/// Errors from acquiring a platform wake lock.
#[derive(Debug, thiserror::Error)]
pub enum WakeLockError {
    #[error("wake lock not supported: {0}")]
    Unsupported(String),

    #[error("failed to start inhibitor: {0}")]
    Spawn(#[from] std::io::Error),
}
