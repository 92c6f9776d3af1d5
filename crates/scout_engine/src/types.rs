use std::fmt;

use chrono::{DateTime, Utc};

pub type ScanId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStage {
    Fetching,
    Normalizing,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanProgress {
    pub scan_id: ScanId,
    pub stage: ScanStage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    Progress(ScanProgress),
    ScanCompleted {
        scan_id: ScanId,
        result: Result<Vec<NormalizedEvent>, ScanError>,
    },
    /// Periodic wake-up from the ticker.
    Tick { now: DateTime<Utc> },
}

/// One event as returned by the extraction service, with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedEvent {
    pub title: String,
    pub location: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub source_url: String,
}

/// Raw listing text accepted from one forwarding path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBody {
    pub text: String,
    pub path_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ScanError {
    pub kind: FailureKind,
    pub message: String,
}

impl ScanError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MissingCredential,
    SourceUnreachable,
    NormalizationFailed,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::MissingCredential => write!(f, "missing credential"),
            FailureKind::SourceUnreachable => write!(f, "source unreachable"),
            FailureKind::NormalizationFailed => write!(f, "normalization failed"),
        }
    }
}

/// Why a single forwarding path was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFailure {
    HttpStatus(u16),
    Timeout,
    Network(String),
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Decode(String),
    /// Body did not start with `{` or `[`, e.g. an HTML error page.
    NotStructured,
}

impl fmt::Display for PathFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathFailure::HttpStatus(code) => write!(f, "http status {code}"),
            PathFailure::Timeout => write!(f, "timeout"),
            PathFailure::Network(message) => write!(f, "network error: {message}"),
            PathFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            PathFailure::Decode(message) => write!(f, "undecodable body: {message}"),
            PathFailure::NotStructured => write!(f, "body is not JSON"),
        }
    }
}
