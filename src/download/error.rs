use std::path::PathBuf;
use std::time::Duration;
use reqwest::StatusCode;
use thiserror::Error;
use tokio::io;

/// Errors surfaced by `prepare` / `execute`
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Target file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Chunk artifact already exists, remove it before downloading: {}", .0.display())]
    StaleArtifact(PathBuf),

    #[error("Remote resource does not support range requests: {url}")]
    RangeNotSupported { url: String },

    #[error("Size probe timed out after {timeout:?}: {url}")]
    ProbeTimeout { url: String, timeout: Duration },

    #[error("Size probe failed for {url}: {reason}")]
    ProbeFailed { url: String, reason: String },

    #[error("Download of part {part} failed: {source}")]
    FetchFailed {
        part: usize,
        #[source]
        source: FetchError,
    },

    #[error("Merge failed: {0}")]
    MergeFailed(#[from] MergeError),
}

/// Failure of a single chunk fetch
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Create artifact failed: {:?}", .0)]
    CreateArtifact(#[source] io::Error),

    #[error("Invalid byte range {start}-{end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("Http request failed: {:?}", .0)]
    Request(#[from] reqwest::Error),

    #[error("Unexpected response status: {0}")]
    UnexpectedStatus(StatusCode),

    #[error("Write artifact failed: {:?}", .0)]
    Copy(#[source] io::Error),

    #[error("Expected {expected} bytes, received {actual}")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("Fetch task panicked: {0}")]
    TaskPanicked(String),
}

/// Failure while reassembling artifacts
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Create output file {} failed: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Open artifact of part {part} failed: {source}")]
    OpenArtifact {
        part: usize,
        #[source]
        source: io::Error,
    },

    #[error("Append part {part} failed: {source}")]
    Append {
        part: usize,
        #[source]
        source: io::Error,
    },

    #[error("Remove artifact of part {part} failed: {source}")]
    RemoveArtifact {
        part: usize,
        #[source]
        source: io::Error,
    },

    #[error("Sync output file {} failed: {source}", path.display())]
    Sync {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
