//! HTTP transport for the dataset API.
//!
//! [`UploadTransport`] is the seam between the upload engine and the network:
//! one method call is exactly one HTTP request, with no retry or batching.
//! [`HttpTransport`] implements it on top of `reqwest`; tests substitute
//! in-memory mocks.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use datadrop_protocol::{
    ChunkUploadResponse, CreateDatasetResponse, DatasetStage, DatasetStatusResponse, Endpoint,
    ErrorResponse, ServerConfig,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Response, StatusCode};
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::types::{ChunkReceipt, DatasetHandle, UploadPlan};

/// Future returned by every transport call.
pub type TransportFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Message shown when dataset creation fails on the server side.
const CREATE_FAILED: &str = "Failed to process file upload.";

/// Message shown when a chunk upload fails on the server side.
const CHUNK_FAILED: &str = "Failed to process file chunk.";

/// Abstract connection to the dataset server.
pub trait UploadTransport: Send + Sync {
    /// Fetches the server-provided client settings (`GET /config`).
    fn server_config(&self) -> TransportFuture<'_, ServerConfig>;

    /// Creates the dataset record (`POST /datasets`).
    ///
    /// Fails with [`TransportError::ServerRejected`] on a non-success status.
    fn create_dataset<'a>(&'a self, plan: &'a UploadPlan) -> TransportFuture<'a, DatasetHandle>;

    /// Uploads one chunk of one file (`PUT /datasets/{id}/files/{file}/{chunk}`).
    ///
    /// `file_index` and `chunk_number` are 1-based. `file_name` is the
    /// basename the bytes are sent under. Fails with
    /// [`TransportError::ChunkRejected`] on a non-success status.
    fn put_chunk<'a>(
        &'a self,
        dataset_id: &'a str,
        file_index: usize,
        chunk_number: usize,
        file_name: &'a str,
        bytes: Vec<u8>,
    ) -> TransportFuture<'a, ChunkReceipt>;

    /// Queries the post-processing stage (`GET /datasets/{id}/status`).
    fn dataset_status<'a>(&'a self, dataset_id: &'a str) -> TransportFuture<'a, DatasetStage>;
}

/// `reqwest`-based transport.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for the server at `base_url`.
    ///
    /// `timeout` bounds every single request; `None` leaves requests
    /// unbounded.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url))
    }

    /// Creates a transport around an existing client.
    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
        }
    }

    /// Returns the server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the download URL of a dataset.
    pub fn download_url(&self, dataset_id: &str) -> String {
        Endpoint::Download { dataset_id }.url(&self.base_url)
    }

    fn url(&self, endpoint: Endpoint<'_>) -> String {
        endpoint.url(&self.base_url)
    }
}

impl UploadTransport for HttpTransport {
    fn server_config(&self) -> TransportFuture<'_, ServerConfig> {
        Box::pin(async move {
            let resp = self.http.get(self.url(Endpoint::Config)).send().await?;
            let status = resp.status();
            if !status.is_success() {
                return Err(TransportError::ServerRejected {
                    status: status.as_u16(),
                    detail: error_detail(resp, "failed to load server config").await,
                });
            }
            Ok(serde_json::from_slice(&resp.bytes().await?)?)
        })
    }

    fn create_dataset<'a>(&'a self, plan: &'a UploadPlan) -> TransportFuture<'a, DatasetHandle> {
        Box::pin(async move {
            let body = plan.to_request();
            let resp = self
                .http
                .post(self.url(Endpoint::CreateDataset))
                .json(&body)
                .send()
                .await?;
            let status = resp.status();

            if !status.is_success() {
                return Err(TransportError::ServerRejected {
                    status: status.as_u16(),
                    detail: error_detail(resp, CREATE_FAILED).await,
                });
            }

            let created: CreateDatasetResponse = serde_json::from_slice(&resp.bytes().await?)?;
            debug!(dataset = %created.id, files = created.files.len(), "dataset created");
            Ok(created.into())
        })
    }

    fn put_chunk<'a>(
        &'a self,
        dataset_id: &'a str,
        file_index: usize,
        chunk_number: usize,
        file_name: &'a str,
        bytes: Vec<u8>,
    ) -> TransportFuture<'a, ChunkReceipt> {
        Box::pin(async move {
            let len = bytes.len();
            let part = Part::bytes(bytes).file_name(file_name.to_string());
            let form = Form::new().part(file_name.to_string(), part);
            let url = self.url(Endpoint::FileChunk {
                dataset_id,
                file_index,
                chunk_number,
            });

            trace!(dataset = %dataset_id, file_index, chunk = chunk_number, bytes = len, "PUT chunk");
            let resp = self.http.put(url).multipart(form).send().await?;
            let status = resp.status();

            if !status.is_success() {
                return Err(TransportError::ChunkRejected {
                    status: status.as_u16(),
                    detail: error_detail(resp, CHUNK_FAILED).await,
                });
            }

            let body: ChunkUploadResponse = serde_json::from_slice(&resp.bytes().await?)?;
            Ok(ChunkReceipt {
                chunks_received_for_file: body.chunks_received,
                dataset_progress: body.progress_dataset,
                file_progress: body.progress_file,
                file_label: body.file,
            })
        })
    }

    fn dataset_status<'a>(&'a self, dataset_id: &'a str) -> TransportFuture<'a, DatasetStage> {
        Box::pin(async move {
            let resp = self
                .http
                .get(self.url(Endpoint::DatasetStatus { dataset_id }))
                .send()
                .await?;
            let status = resp.status();

            if status != StatusCode::OK {
                return Err(TransportError::ServerRejected {
                    status: status.as_u16(),
                    detail: error_detail(resp, "status query failed").await,
                });
            }

            let body: DatasetStatusResponse = serde_json::from_slice(&resp.bytes().await?)?;
            Ok(DatasetStage::from(body.stage))
        })
    }
}

/// Extracts the error message of a non-success response.
///
/// 5xx bodies are not trusted to carry structured detail and always map to
/// `fallback`; 4xx bodies are searched for `error`/`detail`.
async fn error_detail(resp: Response, fallback: &str) -> String {
    if resp.status().is_server_error() {
        return fallback.to_string();
    }
    let status = resp.status();
    let body = resp.bytes().await.unwrap_or_default();
    serde_json::from_slice::<ErrorResponse>(&body)
        .ok()
        .and_then(|e| e.message())
        .unwrap_or_else(|| format!("{fallback} (HTTP {})", status.as_u16()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DatasetMetadata;
    use datadrop_transfer::SelectedFile;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Starts a mock HTTP server that answers one request with `status` and
    /// `body`. The join handle yields the raw request it received.
    async fn mock_server(status: u16, body: &str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let url = format!("http://127.0.0.1:{port}");
        let body = body.to_string();

        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let request = read_request(&mut stream).await;

            let resp = format!(
                "HTTP/1.1 {status} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                body.len(),
                body
            );
            let _ = stream.write_all(resp.as_bytes()).await;
            let _ = stream.shutdown().await;
            request
        });

        (url, handle)
    }

    /// Reads a full HTTP/1.1 request (headers plus Content-Length body).
    async fn read_request(stream: &mut tokio::net::TcpStream) -> String {
        let mut data = Vec::new();
        let mut buf = vec![0u8; 8192];
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            data.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&data);
            if let Some(head_end) = text.find("\r\n\r\n") {
                let content_length = text[..head_end]
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if data.len() >= head_end + 4 + content_length {
                    break;
                }
            }
        }
        String::from_utf8_lossy(&data).into_owned()
    }

    fn plan() -> UploadPlan {
        let files = vec![SelectedFile::from_bytes(
            "report.csv",
            Some(String::new()),
            "text/csv",
            b"a,b".to_vec(),
        )];
        UploadPlan::build(
            &files,
            DatasetMetadata {
                label: "quarterly".into(),
                ..Default::default()
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn create_dataset_posts_json_and_parses_handle() {
        let (url, server) = mock_server(
            201,
            r#"{"id":"ds-1","files":[{"chunks_received":0,"chunks_total":1}]}"#,
        )
        .await;
        let transport = HttpTransport::new(url, None).unwrap();

        let handle = transport.create_dataset(&plan()).await.unwrap();
        assert_eq!(handle.id, "ds-1");
        assert_eq!(handle.files[0].chunks_expected, 1);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /datasets HTTP/1.1"));
        assert!(request.contains(r#""label":"quarterly""#));
        assert!(request.contains(r#""retention_time":48"#));
        assert!(request.contains(r#""type":"text/csv""#));
    }

    #[tokio::test]
    async fn create_dataset_client_error_carries_detail() {
        let (url, _server) = mock_server(422, r#"{"detail":"label too long"}"#).await;
        let transport = HttpTransport::new(url, None).unwrap();

        let err = transport.create_dataset(&plan()).await.unwrap_err();
        match err {
            TransportError::ServerRejected { status, detail } => {
                assert_eq!(status, 422);
                assert_eq!(detail, "label too long");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn create_dataset_server_error_is_opaque() {
        let (url, _server) = mock_server(500, r#"{"detail":"stack trace here"}"#).await;
        let transport = HttpTransport::new(url, None).unwrap();

        let err = transport.create_dataset(&plan()).await.unwrap_err();
        assert_eq!(err.detail(), CREATE_FAILED);
    }

    #[tokio::test]
    async fn put_chunk_sends_multipart_under_basename() {
        let (url, server) = mock_server(
            200,
            r#"{"progress_dataset":50.0,"progress_file":100.0,"file":"report.csv"}"#,
        )
        .await;
        let transport = HttpTransport::new(url, None).unwrap();

        let receipt = transport
            .put_chunk("ds-1", 2, 3, "report.csv", b"CHUNKDATA".to_vec())
            .await
            .unwrap();
        assert_eq!(receipt.file_label, "report.csv");
        assert_eq!(receipt.chunks_received_for_file, None);
        assert!((receipt.dataset_progress - 50.0).abs() < f64::EPSILON);

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /datasets/ds-1/files/2/3 HTTP/1.1"));
        assert!(request.contains("multipart/form-data"));
        assert!(request.contains(r#"name="report.csv""#));
        assert!(request.contains("CHUNKDATA"));
    }

    #[tokio::test]
    async fn put_chunk_rejection() {
        let (url, _server) = mock_server(413, r#"{"detail":"chunk too large"}"#).await;
        let transport = HttpTransport::new(url, None).unwrap();

        let err = transport
            .put_chunk("ds", 1, 1, "a.bin", vec![1, 2, 3])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::ChunkRejected { status: 413, ref detail } if detail == "chunk too large"
        ));
    }

    #[tokio::test]
    async fn dataset_status_parses_stage() {
        let (url, server) = mock_server(200, r#"{"stage":"scanned"}"#).await;
        let transport = HttpTransport::new(url, None).unwrap();

        let stage = transport.dataset_status("abc").await.unwrap();
        assert_eq!(stage, DatasetStage::Scanned);
        let request = server.await.unwrap();
        assert!(request.starts_with("GET /datasets/abc/status HTTP/1.1"));
    }

    #[tokio::test]
    async fn dataset_status_error_text() {
        let (url, _server) = mock_server(404, r#"{"error":"unknown dataset"}"#).await;
        let transport = HttpTransport::new(url, None).unwrap();

        let err = transport.dataset_status("abc").await.unwrap_err();
        assert_eq!(err.detail(), "unknown dataset");
    }

    #[tokio::test]
    async fn server_config_reads_chunk_size() {
        let (url, _server) = mock_server(200, r#"{"chunk_size":5242880,"internal":false}"#).await;
        let transport = HttpTransport::new(format!("{url}/"), None).unwrap();

        let config = transport.server_config().await.unwrap();
        assert_eq!(config.chunk_size, 5_242_880);
    }

    #[test]
    fn download_url_joins_base() {
        let transport = HttpTransport::with_client(reqwest::Client::new(), "https://drop.example/");
        assert_eq!(transport.download_url("abc"), "https://drop.example/datasets/abc");
        assert_eq!(transport.base_url(), "https://drop.example/");
    }
}
