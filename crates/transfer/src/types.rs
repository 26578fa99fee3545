use std::path::PathBuf;
use std::sync::Arc;

use datadrop_protocol::FileEntry;

use crate::TransferError;
use crate::validation::validate_upload_path;

/// Where the bytes of a selected file come from.
#[derive(Debug, Clone)]
pub enum FileContent {
    /// A file on the local filesystem.
    Disk(PathBuf),
    /// A buffer already held in memory.
    Memory(Arc<[u8]>),
}

/// A file as handed over by the caller's file selection.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    /// Bare file name, without any directory.
    pub name: String,
    /// Path relative to the selected directory.
    ///
    /// `None` when the selection mechanism exposes no relative paths at all,
    /// `Some("")` for a file picked on its own.
    pub relative_path: Option<String>,
    pub mime_type: String,
    pub size: u64,
    pub content: FileContent,
}

impl SelectedFile {
    /// Creates an in-memory selection entry.
    pub fn from_bytes(
        name: impl Into<String>,
        relative_path: Option<String>,
        mime_type: impl Into<String>,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        let data = data.into();
        Self {
            name: name.into(),
            relative_path,
            mime_type: mime_type.into(),
            size: data.len() as u64,
            content: FileContent::Memory(data),
        }
    }

    /// Returns the path under which the file is announced to the server.
    ///
    /// The relative path is used when present and non-empty, otherwise the
    /// bare name. Backslashes are normalized to `/`.
    pub fn upload_path(&self) -> String {
        let path = match self.relative_path.as_deref() {
            Some(rel) if !rel.is_empty() => rel,
            _ => self.name.as_str(),
        };
        path.replace('\\', "/")
    }
}

/// Immutable description of one file in an upload plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// Relative, slash-separated, non-empty path.
    pub path: String,
    pub mime_type: String,
    pub size_bytes: u64,
}

impl FileDescriptor {
    /// Returns the last path component, used as multipart field name.
    pub fn basename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// Converts the descriptor into its wire form.
    pub fn to_entry(&self) -> FileEntry {
        FileEntry {
            path: self.path.clone(),
            mime_type: self.mime_type.clone(),
            size: self.size_bytes,
        }
    }
}

/// Builds validated descriptors for a selection, preserving its order.
pub fn describe_selection(files: &[SelectedFile]) -> Result<Vec<FileDescriptor>, TransferError> {
    files
        .iter()
        .map(|file| {
            let path = file.upload_path();
            validate_upload_path(&path)?;
            Ok(FileDescriptor {
                path,
                mime_type: file.mime_type.clone(),
                size_bytes: file.size,
            })
        })
        .collect()
}
