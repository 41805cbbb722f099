use futures_util::StreamExt;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::demux::{pump_lines, PumpEnd};
use crate::settings::Backend;
use crate::submit::{BodyStream, JobSubmitter};
use crate::types::{
    EngineError, EngineEvent, EventSink, FailureKind, JobId, JobOutcome, StructuredResponse,
    Upload,
};

/// Largest JSON result body read into memory.
pub const MAX_STRUCTURED_BODY: usize = 64 * 1024;

#[derive(Debug, Deserialize)]
struct StructuredBody {
    enhance: Option<String>,
    refine: Option<String>,
    error: Option<String>,
}

/// Runs one job from upload to the end of its response.
///
/// Emits `ResponseStarted` once headers arrive, then `Lines` batches while a
/// text stream is read. A JSON response is read whole and returned as a
/// structured outcome without any line events. Once `cancel` fires the job
/// stops at the next await point and returns a `Cancelled` error; no event
/// is emitted for data that arrives afterwards.
pub async fn run_job(
    submitter: &dyn JobSubmitter,
    job_id: JobId,
    upload: Upload,
    backend: Backend,
    cancel: &CancellationToken,
    sink: &dyn EventSink,
) -> Result<JobOutcome, EngineError> {
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(EngineError::cancelled()),
        response = submitter.submit(job_id, upload, backend) => response?,
    };
    if cancel.is_cancelled() {
        return Err(EngineError::cancelled());
    }

    let tag = engine_logging::job_tag(job_id, response.process_id.as_deref());
    engine_logging::engine_info!("{tag} response started on {} backend", backend.label());
    sink.emit(EngineEvent::ResponseStarted {
        job_id,
        process_id: response.process_id.clone(),
    });

    if response.is_json() {
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(EngineError::cancelled()),
            body = collect_body(response.body) => body?,
        };
        let structured = parse_structured(&body)?;
        engine_logging::engine_debug!("{tag} structured response: {structured:?}");
        return Ok(JobOutcome::Structured(structured));
    }

    let result = pump_lines(response.body, cancel, |lines| {
        sink.emit(EngineEvent::Lines { job_id, lines });
    })
    .await;
    match result {
        Ok(lines) => {
            engine_logging::engine_info!("{tag} stream finished after {lines} lines");
            Ok(JobOutcome::Streamed { lines })
        }
        Err(PumpEnd::Cancelled) => {
            engine_logging::engine_info!("{tag} stream abandoned");
            Err(EngineError::cancelled())
        }
        Err(PumpEnd::Read(message)) => Err(EngineError::new(FailureKind::StreamRead, message)),
    }
}

async fn collect_body(mut body: BodyStream) -> Result<Vec<u8>, EngineError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        let chunk = chunk?;
        if bytes.len() + chunk.len() > MAX_STRUCTURED_BODY {
            return Err(EngineError::new(
                FailureKind::Decode,
                format!("structured response exceeds {MAX_STRUCTURED_BODY} bytes"),
            ));
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}

pub(crate) fn parse_structured(body: &[u8]) -> Result<StructuredResponse, EngineError> {
    let parsed: StructuredBody = serde_json::from_slice(body)
        .map_err(|err| EngineError::new(FailureKind::Decode, err.to_string()))?;
    if let Some(error) = parsed.error {
        return Ok(StructuredResponse::Error(error));
    }
    match (parsed.enhance, parsed.refine) {
        (Some(enhance), Some(refine)) => Ok(StructuredResponse::Artifacts { enhance, refine }),
        _ => Err(EngineError::new(
            FailureKind::Decode,
            "response names neither an error nor both artifacts",
        )),
    }
}
