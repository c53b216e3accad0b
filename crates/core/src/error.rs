use std::path::PathBuf;
use thiserror::Error;

pub const SYNC_FAILED_MESSAGE: &str = "Failed to synchronize transcript using AI.";

#[derive(Error, Debug)]
pub enum SyncSubError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Cached segments at {path} are unreadable: {reason}")]
    CacheCorrupted { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, SyncSubError>;

/// Failures talking to the remote completion endpoint.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid API response: {0}")]
    InvalidApiResponse(serde_json::Value),

    #[error("Request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Uniform synchronization failure. Every cause renders to the same
/// user-facing message; the cause is kept for logs.
#[derive(Error, Debug)]
#[error("{}", SYNC_FAILED_MESSAGE)]
pub struct SyncError {
    #[source]
    pub cause: SyncFailure,
}

#[derive(Error, Debug)]
pub enum SyncFailure {
    #[error(transparent)]
    Completion(#[from] CompletionError),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No usable segments after validation ({returned} returned)")]
    NoUsableSegments { returned: usize },
}

impl From<SyncFailure> for SyncError {
    fn from(cause: SyncFailure) -> Self {
        Self { cause }
    }
}

impl From<CompletionError> for SyncError {
    fn from(err: CompletionError) -> Self {
        SyncFailure::from(err).into()
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncFailure::from(err).into()
    }
}

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to probe {path}: {reason}")]
    ProbeFailed { path: PathBuf, reason: String },
}
