use std::fmt;

use crate::resolve::ResolveError;

/// One picture reference queued for download. `index` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrievalJob {
    pub index: usize,
    pub total: usize,
    pub reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Start,
    Finished,
    /// The server answered with an empty body; nothing was kept on disk.
    NotSaved,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub file_index: usize,
    pub total_files: usize,
    pub url: String,
    pub kind: EventKind,
    pub error: Option<RetrievalError>,
    pub bytes_written: u64,
    /// Pause taken before the next download, sequential mode only.
    pub wait_ms: u64,
}

impl ProgressEvent {
    pub(crate) fn new(job: &RetrievalJob, url: impl Into<String>, kind: EventKind) -> Self {
        Self {
            file_index: job.index,
            total_files: job.total,
            url: url.into(),
            kind,
            error: None,
            bytes_written: 0,
            wait_ms: 0,
        }
    }

    pub(crate) fn failed(job: &RetrievalJob, url: impl Into<String>, error: RetrievalError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(job, url, EventKind::Error)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RetrievalError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for FetchError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    Network,
    /// Body could not be decompressed.
    Decode,
    Filesystem,
    Client,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::RedirectLimitExceeded => write!(f, "redirect limit exceeded"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Filesystem => write!(f, "filesystem error"),
            FailureKind::Client => write!(f, "client setup error"),
        }
    }
}
