use std::sync::{mpsc, Arc};
use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn, job_tag};
use hairvision_core::{
    ArtifactSet, CancelDelivery, CancelReport, Effect, JobError, Msg, StructuredResult, Target,
};
use hairvision_engine::{
    Backend, EngineError, EngineEvent, EngineHandle, EngineSettings, EventSink, FailureKind,
    JobOutcome, StructuredResponse, Upload,
};

/// Executes core effects against the engine and feeds engine events back
/// into the message loop.
pub struct EffectRunner {
    engine: EngineHandle,
}

impl EffectRunner {
    pub fn new(settings: EngineSettings, msg_tx: mpsc::Sender<Msg>) -> Result<Self, EngineError> {
        let engine = EngineHandle::new(settings, Arc::new(MsgSink { msg_tx }))?;
        Ok(Self { engine })
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::SubmitJob {
                    job_id,
                    file,
                    target,
                } => {
                    engine_info!(
                        "{} SubmitJob file={} bytes={} target={}",
                        job_tag(job_id, None),
                        file.name,
                        file.len(),
                        target.label()
                    );
                    let upload = Upload {
                        file_name: file.name,
                        data: file.data,
                    };
                    self.engine.submit(job_id, upload, map_target(target));
                }
                Effect::AbortJob { job_id } => {
                    engine_debug!("{} AbortJob", job_tag(job_id, None));
                    self.engine.abort(job_id);
                }
                Effect::SendCancel {
                    job_id,
                    process_id,
                    target,
                    delivery,
                } => {
                    engine_info!(
                        "{} SendCancel delivery={:?}",
                        job_tag(job_id, Some(&process_id)),
                        delivery
                    );
                    self.engine.cancel(
                        job_id,
                        process_id,
                        map_target(target),
                        map_delivery(delivery),
                    );
                }
            }
        }
    }

    /// Waits up to `grace` for cancel requests still in flight, then stops.
    pub fn shutdown(&mut self, grace: Duration) {
        self.engine.shutdown(grace);
    }
}

struct MsgSink {
    msg_tx: mpsc::Sender<Msg>,
}

impl EventSink for MsgSink {
    fn emit(&self, event: EngineEvent) {
        if let Some(msg) = map_event(event) {
            let _ = self.msg_tx.send(msg);
        }
    }
}

pub fn map_target(target: Target) -> Backend {
    match target {
        Target::Local => Backend::Local,
        Target::Remote => Backend::Remote,
    }
}

fn map_delivery(delivery: CancelDelivery) -> hairvision_engine::CancelDelivery {
    match delivery {
        CancelDelivery::Awaited => hairvision_engine::CancelDelivery::Awaited,
        CancelDelivery::FireAndForget => hairvision_engine::CancelDelivery::FireAndForget,
    }
}

fn map_event(event: EngineEvent) -> Option<Msg> {
    let msg = match event {
        EngineEvent::ResponseStarted { job_id, process_id } => {
            Msg::ResponseStarted { job_id, process_id }
        }
        EngineEvent::Lines { job_id, lines } => Msg::LinesReceived { job_id, lines },
        EngineEvent::JobCompleted { job_id, result } => match result {
            Ok(JobOutcome::Streamed { .. }) => Msg::StreamFinished { job_id },
            Ok(JobOutcome::Structured(StructuredResponse::Artifacts { enhance, refine })) => {
                Msg::StructuredResult {
                    job_id,
                    result: StructuredResult::Artifacts(ArtifactSet { enhance, refine }),
                }
            }
            Ok(JobOutcome::Structured(StructuredResponse::Error(message))) => {
                Msg::StructuredResult {
                    job_id,
                    result: StructuredResult::Error(message),
                }
            }
            // The controller is already in `Cancelled` when the engine
            // reports the abandoned request.
            Err(err) if err.is_cancelled() => return None,
            Err(err) => {
                engine_warn!("{} failed: {}", job_tag(job_id, None), err);
                Msg::JobFailed {
                    job_id,
                    error: map_error(err),
                }
            }
        },
        EngineEvent::CancelCompleted { job_id, report } => Msg::CancelReported {
            job_id,
            report: CancelReport {
                acknowledged: report.acknowledged,
                message: report.message,
            },
        },
    };
    Some(msg)
}

fn map_error(err: EngineError) -> JobError {
    match err.kind {
        FailureKind::HttpStatus(status) => JobError::Server { status },
        FailureKind::StreamRead => JobError::StreamRead(err.message),
        FailureKind::Decode => JobError::Decode(err.message),
        FailureKind::EmptyUpload => JobError::Validation("The selected file is empty".to_string()),
        FailureKind::InvalidUrl
        | FailureKind::Network
        | FailureKind::Timeout
        | FailureKind::Io
        | FailureKind::Cancelled => JobError::Network(err.message),
    }
}
