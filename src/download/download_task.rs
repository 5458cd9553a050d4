//!
//! # Fetch task
//! Retrieves one resource and stores it as one artifact. The same algorithm
//! runs under every scheduling strategy.
//!

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use bytes::Bytes;
use futures_util::StreamExt;
use log::{error, info, warn};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File};
use tokio::io::{self, AsyncWriteExt};
use url::Url;

use crate::download::config::RunnerConfig;
use crate::download::error::{FetchError, FetchErrorKind};
use crate::download::util::{create_http_request, file_name_from_url, partial_path};

/// An opaque resource identifier, consumed by exactly one task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    identifier: String,
}

impl FetchRequest {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into() }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn into_identifier(self) -> String {
        self.identifier
    }
}

/// Outcome of one fetch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FetchResult {
    Success {
        identifier: String,
        destination_path: PathBuf,
        elapsed: Duration,
        byte_count: u64,
    },
    Failure {
        identifier: String,
        error_kind: FetchErrorKind,
        message: String,
    },
}

impl FetchResult {
    pub fn failure(identifier: impl Into<String>, error_kind: FetchErrorKind, message: impl Into<String>) -> Self {
        FetchResult::Failure {
            identifier: identifier.into(),
            error_kind,
            message: message.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        match self {
            FetchResult::Success { identifier, .. } | FetchResult::Failure { identifier, .. } => identifier,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchResult::Success { .. })
    }

    pub fn error_kind(&self) -> Option<FetchErrorKind> {
        match self {
            FetchResult::Success { .. } => None,
            FetchResult::Failure { error_kind, .. } => Some(*error_kind),
        }
    }

    /// One log record per finished fetch
    pub fn log(&self) {
        match self {
            FetchResult::Success { destination_path, elapsed, byte_count, .. } => {
                info!(
                    "Download of {} finished in {:.2} seconds ({} bytes)",
                    destination_path.display(),
                    elapsed.as_secs_f64(),
                    byte_count
                );
            }
            FetchResult::Failure { identifier, error_kind, message } => {
                error!("Failed to download {} [{}]: {}", identifier, error_kind, message);
            }
        }
    }
}

/// Per-run settings every task reads
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub output_dir: PathBuf,
    pub chunk_size: NonZeroUsize,
    pub user_agent: String,
}

impl From<&RunnerConfig> for FetchOptions {
    fn from(config: &RunnerConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            chunk_size: config.chunk_size,
            user_agent: config.user_agent.clone(),
        }
    }
}

/// Run one fetch to completion. Never fails: every error becomes a `Failure`.
pub async fn fetch(client: &Client, request: FetchRequest, options: &FetchOptions) -> FetchResult {
    let start = Instant::now();
    let identifier = request.into_identifier();

    match download(client, &identifier, options).await {
        Ok((destination_path, byte_count)) => FetchResult::Success {
            identifier,
            destination_path,
            elapsed: start.elapsed(),
            byte_count,
        },
        Err(err) => {
            let error_kind = err.kind();
            FetchResult::failure(identifier, error_kind, err.to_string())
        }
    }
}

async fn download(client: &Client, identifier: &str, options: &FetchOptions) -> Result<(PathBuf, u64), FetchError> {
    let url = Url::parse(identifier)
        .map_err(|err| FetchError::InvalidIdentifier(format!("{}: {}", identifier, err)))?;
    let file_name = file_name_from_url(&url)
        .ok_or_else(|| FetchError::InvalidIdentifier(format!("{}: no file name in path", identifier)))?;

    let response = client
        .execute(create_http_request(url, &options.user_agent))
        .await
        .map_err(FetchError::from_send)?;

    if !response.status().is_success() {
        return Err(FetchError::RemoteRejected(response.status()));
    }

    let destination = options.output_dir.join(file_name);
    let partial = partial_path(&destination);

    let stored = match write_body(response, &partial, options.chunk_size).await {
        Ok(byte_count) => fs::rename(&partial, &destination)
            .await
            .map(|_| byte_count)
            .map_err(FetchError::from),
        Err(err) => Err(err),
    };

    match stored {
        Ok(byte_count) => Ok((destination, byte_count)),
        Err(err) => {
            remove_partial(&partial).await;
            Err(err)
        }
    }
}

/// Stream the body into `path` in pieces of at most `chunk_size` bytes
async fn write_body(response: Response, path: &Path, chunk_size: NonZeroUsize) -> Result<u64, FetchError> {
    let mut file = File::create(path).await?;
    let mut stream = response.bytes_stream();
    let mut written = 0;

    while let Some(item) = stream.next().await {
        let mut bytes: Bytes = item.map_err(FetchError::BodyReadFailed)?;
        while !bytes.is_empty() {
            let chunk = bytes.split_to(bytes.len().min(chunk_size.get()));
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
    }

    file.flush().await?;
    file.sync_all().await?;

    Ok(written)
}

async fn remove_partial(path: &Path) {
    if let Err(err) = fs::remove_file(path).await {
        if err.kind() != io::ErrorKind::NotFound {
            warn!("Failed to remove partial file {}: {}", path.display(), err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn options(dir: &Path, chunk_size: usize) -> FetchOptions {
        FetchOptions {
            output_dir: dir.to_path_buf(),
            chunk_size: NonZeroUsize::new(chunk_size).unwrap(),
            user_agent: "fetch-runner/test".to_string(),
        }
    }

    fn leftover_partials(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|entry| crate::download::util::is_partial_file(&entry.as_ref().unwrap().path()))
            .count()
    }

    #[tokio::test]
    async fn should_store_body() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..2048u32).map(|i| (i % 251) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .and(header("user-agent", "fetch-runner/test"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let identifier = format!("{}/a.jpg", server.uri());
        let result = fetch(&Client::new(), FetchRequest::new(identifier.clone()), &options(dir.path(), 1024)).await;

        match result {
            FetchResult::Success { identifier: id, destination_path, byte_count, .. } => {
                assert_eq!(id, identifier);
                assert_eq!(destination_path, dir.path().join("a.jpg"));
                assert_eq!(byte_count, 2048);
                assert_eq!(std::fs::read(&destination_path).unwrap(), body);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(leftover_partials(dir.path()), 0);
    }

    #[tokio::test]
    async fn odd_chunk_size_keeps_content() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..5000u32).map(|i| (i % 97) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/odd.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = fetch(
            &Client::new(),
            FetchRequest::new(format!("{}/odd.bin", server.uri())),
            &options(dir.path(), 7),
        )
        .await;

        assert!(result.is_success());
        assert_eq!(std::fs::read(dir.path().join("odd.bin")).unwrap(), body);
    }

    #[tokio::test]
    async fn should_reject_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = fetch(
            &Client::new(),
            FetchRequest::new(format!("{}/missing.jpg", server.uri())),
            &options(dir.path(), 1024),
        )
        .await;

        assert_eq!(result.error_kind(), Some(FetchErrorKind::RemoteRejected));
        assert!(!dir.path().join("missing.jpg").exists());
        assert_eq!(leftover_partials(dir.path()), 0);
    }

    #[tokio::test]
    async fn refused_connection_is_network_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = fetch(
            &Client::new(),
            FetchRequest::new("http://127.0.0.1:1/unreachable.jpg"),
            &options(dir.path(), 1024),
        )
        .await;

        assert_eq!(result.identifier(), "http://127.0.0.1:1/unreachable.jpg");
        assert_eq!(result.error_kind(), Some(FetchErrorKind::NetworkError));
        assert!(!dir.path().join("unreachable.jpg").exists());
    }

    #[tokio::test]
    async fn malformed_identifier_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let client = Client::new();

        let result = fetch(&client, FetchRequest::new("not a url"), &options(dir.path(), 1024)).await;
        assert_eq!(result.error_kind(), Some(FetchErrorKind::InvalidIdentifier));

        let result = fetch(&client, FetchRequest::new("http://127.0.0.1:1/"), &options(dir.path(), 1024)).await;
        assert_eq!(result.error_kind(), Some(FetchErrorKind::InvalidIdentifier));
    }

    #[tokio::test]
    async fn rename_failure_removes_partial() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/blocked.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8; 512]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("blocked.jpg")).unwrap();
        std::fs::write(dir.path().join("blocked.jpg").join("keep"), b"x").unwrap();

        let result = fetch(
            &Client::new(),
            FetchRequest::new(format!("{}/blocked.jpg", server.uri())),
            &options(dir.path(), 1024),
        )
        .await;

        assert_eq!(result.error_kind(), Some(FetchErrorKind::TransferInterrupted));
        assert!(dir.path().join("blocked.jpg").is_dir());
        assert_eq!(leftover_partials(dir.path()), 0);
    }

    #[tokio::test]
    async fn unwritable_partial_path_is_transfer_interrupted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![5u8; 256]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("gone");
        let result = fetch(
            &Client::new(),
            FetchRequest::new(format!("{}/a.jpg", server.uri())),
            &options(&gone, 1024),
        )
        .await;

        assert_eq!(result.error_kind(), Some(FetchErrorKind::TransferInterrupted));
        assert!(!gone.exists());
    }

    #[tokio::test]
    async fn longest_file_name_is_stored() {
        let server = MockServer::start().await;
        let file_name = format!("{}.jpg", "x".repeat(251));
        Mock::given(method("GET"))
            .and(path(format!("/{}", file_name)))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![3u8; 300]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let result = fetch(
            &Client::new(),
            FetchRequest::new(format!("{}/{}", server.uri(), file_name)),
            &options(dir.path(), 1024),
        )
        .await;

        assert!(result.is_success(), "{:?}", result);
        assert_eq!(std::fs::read(dir.path().join(&file_name)).unwrap().len(), 300);
        assert_eq!(leftover_partials(dir.path()), 0);
    }

    #[test]
    fn result_serializes_with_tag() {
        let result = FetchResult::failure("https://example.test/x.jpg", FetchErrorKind::RemoteRejected, "HTTP 404");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"outcome\":\"failure\""));

        let parsed: FetchResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, result);
    }
}
