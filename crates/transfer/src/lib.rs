//! File selection, chunk planning and byte-range reading.
//!
//! Everything here is independent of HTTP: the planner is a pure function
//! of a file size and the server's chunk size, and the readers slice exact
//! byte ranges out of a selected file for the upload engine.

mod planner;
mod scanner;
mod types;
mod validation;

pub use planner::{ChunkLayout, ChunkRange, ChunkReader, plan};
pub use scanner::{detect_mime_type, scan_directory, select_file};
pub use types::{FileContent, FileDescriptor, SelectedFile, describe_selection};
pub use validation::validate_upload_path;

/// Errors produced by the transfer crate.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("byte range {start}..{end} out of bounds for {path} ({size} bytes)")]
    RangeOutOfBounds {
        path: String,
        start: u64,
        end: u64,
        size: u64,
    },

    #[error("invalid path: {0}")]
    InvalidPath(String),
}
