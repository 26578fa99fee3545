use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Request payloads
// ---------------------------------------------------------------------------

/// One file announced in a dataset creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    /// Relative, slash-separated path.
    pub path: String,
    /// MIME type as reported by the selection.
    #[serde(rename = "type")]
    pub mime_type: String,
    pub size: u64,
}

/// Creates a new dataset record (`POST /datasets`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatasetRequest {
    pub label: String,
    /// Retention time in hours.
    pub retention_time: u32,
    pub hidden: bool,
    pub public: bool,
    pub files: Vec<FileEntry>,
}

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// Server-side chunk accounting for one announced file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChunkStatus {
    #[serde(default)]
    pub chunks_received: u64,
    pub chunks_total: u64,
}

impl FileChunkStatus {
    /// Returns `true` when the server already holds every chunk of the file.
    pub fn is_complete(&self) -> bool {
        self.chunks_received >= self.chunks_total
    }
}

/// Response to a successful dataset creation (`201`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateDatasetResponse {
    pub id: String,
    /// Chunk accounting, in the same order as the request's `files`.
    #[serde(default)]
    pub files: Vec<FileChunkStatus>,
}

/// Response to a successful chunk upload (`200`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkUploadResponse {
    pub progress_dataset: f64,
    pub progress_file: f64,
    /// Display label of the file the chunk belongs to.
    #[serde(default)]
    pub file: String,
    /// Chunks of this file the server holds after this request, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunks_received: Option<u64>,
}

/// Response of `GET /datasets/{id}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStatusResponse {
    pub stage: String,
}

/// Error body returned with non-success statuses.
///
/// Validation failures carry `detail` (a string or a structured list);
/// the status endpoint reports `error`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorResponse {
    /// Returns the most specific human-readable message in the body.
    pub fn message(&self) -> Option<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.is_empty()) {
            return Some(error.clone());
        }
        match self.detail.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Null => None,
            serde_json::Value::Array(items) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| match item.get("msg").and_then(|m| m.as_str()) {
                        Some(msg) => msg.to_string(),
                        None => item.to_string(),
                    })
                    .collect();
                (!parts.is_empty()).then(|| parts.join("; "))
            }
            other => Some(other.to_string()),
        }
    }
}

/// Client settings served by `GET /config`.
///
/// Only `chunk_size` is interpreted; other fields are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Maximum number of bytes per chunk request.
    pub chunk_size: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
