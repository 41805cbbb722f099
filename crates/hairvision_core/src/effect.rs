use crate::{JobId, SelectedFile, Target};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the multipart upload and start consuming the response.
    SubmitJob {
        job_id: JobId,
        file: SelectedFile,
        target: Target,
    },
    /// Trip the local cancellation token of the in-flight job.
    AbortJob { job_id: JobId },
    /// Ask the backend to stop the job identified by `process_id`.
    SendCancel {
        job_id: JobId,
        process_id: String,
        target: Target,
        delivery: CancelDelivery,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDelivery {
    /// Wait for the backend's answer and report it back as `Msg::CancelReported`.
    Awaited,
    /// Dispatch and forget; used when the host is going away.
    FireAndForget,
}
