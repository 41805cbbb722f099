use std::fmt;
use std::sync::Arc;

pub type JobId = u64;

/// The file payload of one job. Shared with the caller; the engine never
/// keeps a clone past the end of the upload.
#[derive(Clone)]
pub struct Upload {
    pub file_name: String,
    pub data: Arc<[u8]>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            file_name: file_name.into(),
            data: data.into(),
        }
    }
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Headers received; the job is now streaming.
    ResponseStarted {
        job_id: JobId,
        process_id: Option<String>,
    },
    /// Completed log lines, in arrival order.
    Lines { job_id: JobId, lines: Vec<String> },
    JobCompleted {
        job_id: JobId,
        result: Result<JobOutcome, EngineError>,
    },
    /// Answer to an awaited cancel request.
    CancelCompleted { job_id: JobId, report: CancelReport },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: EngineEvent);
}

pub struct ChannelEventSink {
    tx: std::sync::mpsc::Sender<EngineEvent>,
}

impl ChannelEventSink {
    pub fn new(tx: std::sync::mpsc::Sender<EngineEvent>) -> Self {
        Self { tx }
    }
}

impl EventSink for ChannelEventSink {
    fn emit(&self, event: EngineEvent) {
        let _ = self.tx.send(event);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The log stream ran to its end.
    Streamed { lines: usize },
    /// The backend answered with a single JSON document.
    Structured(StructuredResponse),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredResponse {
    Artifacts { enhance: String, refine: String },
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDelivery {
    Awaited,
    FireAndForget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReport {
    pub acknowledged: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct EngineError {
    pub kind: FailureKind,
    pub message: String,
}

impl EngineError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "request cancelled by user")
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == FailureKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    EmptyUpload,
    Network,
    Timeout,
    HttpStatus(u16),
    StreamRead,
    Decode,
    Io,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::EmptyUpload => write!(f, "empty upload"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::StreamRead => write!(f, "stream read error"),
            FailureKind::Decode => write!(f, "decode error"),
            FailureKind::Io => write!(f, "io error"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> EngineError {
    if err.is_timeout() {
        return EngineError::new(FailureKind::Timeout, err.to_string());
    }
    if err.is_builder() {
        return EngineError::new(FailureKind::InvalidUrl, err.to_string());
    }
    EngineError::new(FailureKind::Network, err.to_string())
}
