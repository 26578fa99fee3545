use crate::TransferError;

/// Validates a slash-separated upload path announced to the server.
///
/// Rejects:
/// - Empty paths
/// - Absolute paths (leading `/`)
/// - Parent directory traversal (`..`)
/// - Windows drive prefixes (`C:`)
/// - Empty segments (`a//b`, trailing `/`)
pub fn validate_upload_path(file_path: &str) -> Result<(), TransferError> {
    if file_path.is_empty() {
        return Err(TransferError::InvalidPath("empty path".into()));
    }

    if file_path.starts_with('/') {
        return Err(TransferError::InvalidPath(format!(
            "absolute path not allowed: {file_path}"
        )));
    }

    for (i, segment) in file_path.split('/').enumerate() {
        match segment {
            "" => {
                return Err(TransferError::InvalidPath(format!(
                    "empty path segment: {file_path}"
                )));
            }
            ".." => {
                return Err(TransferError::InvalidPath(format!(
                    "parent directory traversal not allowed: {file_path}"
                )));
            }
            s if i == 0 && is_drive_prefix(s) => {
                return Err(TransferError::InvalidPath(format!(
                    "path prefix not allowed: {file_path}"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}

fn is_drive_prefix(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_path() {
        assert!(validate_upload_path("").is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_upload_path("../../../etc/passwd").is_err());
    }

    #[test]
    fn rejects_nested_parent_dir_traversal() {
        assert!(validate_upload_path("sub/../../../escape").is_err());
    }

    #[test]
    fn rejects_absolute_path() {
        assert!(validate_upload_path("/tmp/malicious").is_err());
    }

    #[test]
    fn rejects_drive_prefix() {
        assert!(validate_upload_path("C:/Windows/evil").is_err());
    }

    #[test]
    fn rejects_empty_segments() {
        assert!(validate_upload_path("a//b").is_err());
        assert!(validate_upload_path("dir/").is_err());
    }

    #[test]
    fn accepts_simple_filename() {
        assert!(validate_upload_path("report.csv").is_ok());
    }

    #[test]
    fn accepts_subdirectory_path() {
        assert!(validate_upload_path("survey/raw/2024.csv").is_ok());
    }

    #[test]
    fn accepts_dotfile_and_dotted_names() {
        assert!(validate_upload_path(".config/settings.json").is_ok());
        assert!(validate_upload_path("v1..2/notes.txt").is_ok());
    }
}
