use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Shortest retention time the server accepts, in hours.
pub const MIN_RETENTION_HOURS: u32 = 1;

/// Longest retention time the server accepts, in hours (30 days).
pub const MAX_RETENTION_HOURS: u32 = 720;

/// Retention time preselected for new datasets, in hours.
pub const DEFAULT_RETENTION_HOURS: u32 = 48;

/// Server endpoint used by the upload client.
///
/// `path()` returns the path relative to the server base URL, with the
/// dataset identifier percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint<'a> {
    /// `GET /config`: server-provided client settings.
    Config,
    /// `POST /datasets`: creates a dataset record.
    CreateDataset,
    /// `PUT /datasets/{id}/files/{file}/{chunk}`: uploads one chunk.
    FileChunk {
        dataset_id: &'a str,
        file_index: usize,
        chunk_number: usize,
    },
    /// `GET /datasets/{id}/status`: post-processing stage.
    DatasetStatus { dataset_id: &'a str },
    /// `GET /datasets/{id}`: download of a finished dataset.
    Download { dataset_id: &'a str },
}

impl Endpoint<'_> {
    /// Returns the request path for this endpoint.
    pub fn path(&self) -> String {
        match self {
            Endpoint::Config => "/config".into(),
            Endpoint::CreateDataset => "/datasets".into(),
            Endpoint::FileChunk {
                dataset_id,
                file_index,
                chunk_number,
            } => format!(
                "/datasets/{}/files/{file_index}/{chunk_number}",
                encode(dataset_id)
            ),
            Endpoint::DatasetStatus { dataset_id } => {
                format!("/datasets/{}/status", encode(dataset_id))
            }
            Endpoint::Download { dataset_id } => format!("/datasets/{}", encode(dataset_id)),
        }
    }

    /// Joins this endpoint onto `base_url`, tolerating a trailing slash.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}{}", base_url.trim_end_matches('/'), self.path())
    }
}

/// Everything except RFC 3986 unreserved characters.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

fn encode(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_path_is_one_based_as_given() {
        let ep = Endpoint::FileChunk {
            dataset_id: "abc123",
            file_index: 1,
            chunk_number: 3,
        };
        assert_eq!(ep.path(), "/datasets/abc123/files/1/3");
    }

    #[test]
    fn dataset_id_is_percent_encoded() {
        let ep = Endpoint::DatasetStatus {
            dataset_id: "a/b c",
        };
        assert_eq!(ep.path(), "/datasets/a%2Fb%20c/status");
    }

    #[test]
    fn uuid_dataset_id_stays_raw() {
        let id = "3f2c9a1e-7b4d-4e0a-9c1f-0d5e_v1.2~x";
        let ep = Endpoint::Download { dataset_id: id };
        assert_eq!(ep.path(), format!("/datasets/{id}"));
    }

    #[test]
    fn url_strips_trailing_slash() {
        assert_eq!(
            Endpoint::CreateDataset.url("http://localhost:8000/"),
            "http://localhost:8000/datasets"
        );
        assert_eq!(
            Endpoint::Config.url("http://localhost:8000"),
            "http://localhost:8000/config"
        );
    }

    #[test]
    fn retention_bounds_contain_default() {
        assert!((MIN_RETENTION_HOURS..=MAX_RETENTION_HOURS).contains(&DEFAULT_RETENTION_HOURS));
    }
}
