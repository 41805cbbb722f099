use thiserror::Error;

/// User-visible job failures. Each variant ends up in the single error slot.
///
/// Cancellation is deliberately absent: a cancelled job carries a notice,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// Rejected before any network activity.
    #[error("{0}")]
    Validation(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("server returned error: {status}")]
    Server { status: u16 },
    #[error("failed to read response stream: {0}")]
    StreamRead(String),
    #[error("malformed result: {0}")]
    Decode(String),
    /// Error text reported by the backend in a structured result.
    #[error("{0}")]
    Remote(String),
}
