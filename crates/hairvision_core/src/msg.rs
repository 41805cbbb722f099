use crate::{ArtifactSet, JobError, JobId, SelectedFile, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked (or cleared) the file to upload.
    FileSelected(Option<SelectedFile>),
    /// User flipped the local/remote toggle.
    TargetChanged(Target),
    /// User asked to start a job with the selected file.
    SubmitClicked,
    /// Response headers arrived; carries the server-issued `X-Process-ID`, if any.
    ResponseStarted {
        job_id: JobId,
        process_id: Option<String>,
    },
    /// Completed log lines from the stream, in arrival order.
    LinesReceived { job_id: JobId, lines: Vec<String> },
    /// The backend answered with a JSON result instead of a log stream.
    StructuredResult {
        job_id: JobId,
        result: StructuredResult,
    },
    /// The log stream ended normally.
    StreamFinished { job_id: JobId },
    /// Transport, status, stream or decode failure.
    JobFailed { job_id: JobId, error: JobError },
    /// One of the three cancellation triggers fired.
    Cancel(CancelTrigger),
    /// Outcome of an awaited out-of-band cancel request.
    CancelReported { job_id: JobId, report: CancelReport },
    /// Return to idle, clearing log, outcome and the current job.
    Reset,
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelTrigger {
    /// Explicit user action (cancel button, Ctrl-C).
    User,
    /// The view that owns the job is being torn down.
    Teardown,
    /// The hosting process/page is going away; no further work is guaranteed.
    Unload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StructuredResult {
    Artifacts(ArtifactSet),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelReport {
    pub acknowledged: bool,
    pub message: String,
}
