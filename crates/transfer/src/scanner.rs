//! Building a file selection from the local filesystem.
//!
//! A picked directory is walked recursively and every file gets a relative
//! path that starts with the directory's own name, the way browser directory
//! pickers report it. Individually picked files carry an empty relative path.

use std::path::Path;

use tracing::debug;

use crate::TransferError;
use crate::types::{FileContent, SelectedFile};

/// Selects a single file.
pub fn select_file(path: &Path) -> Result<SelectedFile, TransferError> {
    let metadata = std::fs::metadata(path)?;
    if !metadata.is_file() {
        return Err(TransferError::InvalidPath(format!(
            "not a regular file: {}",
            path.display()
        )));
    }
    let name = file_name(path)?;
    Ok(SelectedFile {
        mime_type: detect_mime_type(&name),
        name,
        relative_path: Some(String::new()),
        size: metadata.len(),
        content: FileContent::Disk(path.to_path_buf()),
    })
}

/// Selects every file below `root`, ordered by relative path.
pub fn scan_directory(root: &Path) -> Result<Vec<SelectedFile>, TransferError> {
    let root_name = file_name(root)?;
    let mut files = Vec::new();
    walk_dir(root, root, &root_name, &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));

    debug!(root = %root.display(), files = files.len(), "directory scanned");
    Ok(files)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    root_name: &str,
    files: &mut Vec<SelectedFile>,
) -> Result<(), TransferError> {
    for entry in std::fs::read_dir(current)? {
        let entry = entry?;
        let path = entry.path();
        let metadata = entry.metadata()?;

        if metadata.is_dir() {
            walk_dir(root, &path, root_name, files)?;
        } else if metadata.is_file() {
            let rel_path = path.strip_prefix(root).map_err(std::io::Error::other)?;
            // Normalize to forward slashes.
            let rel_str = rel_path.to_string_lossy().replace('\\', "/");
            let name = file_name(&path)?;

            files.push(SelectedFile {
                mime_type: detect_mime_type(&name),
                name,
                relative_path: Some(format!("{root_name}/{rel_str}")),
                size: metadata.len(),
                content: FileContent::Disk(path),
            });
        }
    }

    Ok(())
}

fn file_name(path: &Path) -> Result<String, TransferError> {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| TransferError::InvalidPath(format!("no file name: {}", path.display())))
}

/// Guesses a MIME type from a file name's extension, falling back to
/// `application/octet-stream`.
pub fn detect_mime_type(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .to_string()
}
