use std::fmt;
use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised inside a single fetch task. They never leave the task:
/// each one is folded into a `FetchResult::Failure`.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Http request failed: {0}")]
    HttpRequestFailed(#[source] reqwest::Error),

    #[error("Remote rejected request: HTTP {0}")]
    RemoteRejected(StatusCode),

    #[error("Body read failed: {0}")]
    BodyReadFailed(#[source] reqwest::Error),

    #[error("IOError: {0}")]
    IOError(#[from] io::Error),
}

impl FetchError {
    /// Classify an error returned by `Client::execute`
    pub fn from_send(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::InvalidIdentifier(err.to_string())
        } else {
            FetchError::HttpRequestFailed(err)
        }
    }

    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::InvalidIdentifier(_) => FetchErrorKind::InvalidIdentifier,
            FetchError::HttpRequestFailed(_) => FetchErrorKind::NetworkError,
            FetchError::RemoteRejected(_) => FetchErrorKind::RemoteRejected,
            FetchError::BodyReadFailed(_) | FetchError::IOError(_) => FetchErrorKind::TransferInterrupted,
        }
    }
}

/// Why a fetch ended in failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FetchErrorKind {
    /// Connection could not be established or timed out
    NetworkError,
    /// The server answered with a non-2xx status
    RemoteRejected,
    /// Reading the body or writing the artifact failed after connecting
    TransferInterrupted,
    /// The URL does not parse or has no usable final path segment
    InvalidIdentifier,
    /// The worker thread or process died without handing back a result
    WorkerFailed,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FetchErrorKind::NetworkError => "NetworkError",
            FetchErrorKind::RemoteRejected => "RemoteRejected",
            FetchErrorKind::TransferInterrupted => "TransferInterrupted",
            FetchErrorKind::InvalidIdentifier => "InvalidIdentifier",
            FetchErrorKind::WorkerFailed => "WorkerFailed",
        };
        f.write_str(name)
    }
}

/// Errors that abort a whole run before any task is dispatched
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Failed to create output directory {}: {source}", path.display())]
    OutputDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve worker program: {0}")]
    WorkerProgram(#[source] io::Error),
}
