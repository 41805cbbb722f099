use engine_logging::{engine_debug, engine_info, job_tag};

use crate::state::Outcome;
use crate::{
    AppState, CancelDelivery, CancelReport, CancelTrigger, Effect, JobError, JobId, JobState, Msg,
    StructuredResult,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::FileSelected(file) => {
            state.selected = file;
            state.mark_dirty();
            Vec::new()
        }
        Msg::TargetChanged(target) => {
            if state.target != target {
                state.target = target;
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::SubmitClicked => submit(&mut state),
        Msg::ResponseStarted { job_id, process_id } => {
            if let Some(job) = state.active_job_mut(job_id) {
                if job.state == JobState::Submitted {
                    job.state = JobState::Streaming;
                    // An empty header value is as good as no identifier.
                    job.process_id = process_id.filter(|pid| !pid.trim().is_empty());
                    engine_info!(
                        "{} response started",
                        job_tag(job_id, job.process_id.as_deref())
                    );
                    state.mark_dirty();
                }
            } else {
                discard(job_id, "response start");
            }
            Vec::new()
        }
        Msg::LinesReceived { job_id, lines } => {
            apply_lines(&mut state, job_id, lines);
            Vec::new()
        }
        Msg::StructuredResult { job_id, result } => {
            apply_structured(&mut state, job_id, result);
            Vec::new()
        }
        Msg::StreamFinished { job_id } => {
            if let Some(job) = state.active_job_mut(job_id) {
                job.state = JobState::Completed;
                job.cancel_ticket = None;
                engine_info!("{} completed", job_tag(job_id, job.process_id.as_deref()));
                if state.artifacts().is_none() {
                    state.push_client_line("Processing finished without reporting both artifacts");
                } else {
                    state.push_client_line("Processing finished");
                }
            } else {
                discard(job_id, "stream end");
            }
            Vec::new()
        }
        Msg::JobFailed { job_id, error } => {
            fail(&mut state, job_id, error);
            Vec::new()
        }
        Msg::Cancel(trigger) => cancel(&mut state, trigger),
        Msg::CancelReported { job_id, report } => {
            apply_cancel_report(&mut state, job_id, report);
            Vec::new()
        }
        Msg::Reset => {
            let effects = cancel(&mut state, CancelTrigger::Teardown);
            state.job = None;
            state.clear_job_output();
            state.mark_dirty();
            effects
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn submit(state: &mut AppState) -> Vec<Effect> {
    if state.job_state().is_active() {
        state.push_client_line("A job is already running; cancel it before starting another");
        return Vec::new();
    }

    let file = match state.selected.clone() {
        Some(file) if !file.is_empty() => file,
        Some(_) => return reject(state, "The selected file is empty"),
        None => return reject(state, "Please select a file first"),
    };

    let target = state.target;
    let job_id = state.begin_job(&file);
    state.push_client_line(format!(
        "Processing {} on the {} backend, please wait...",
        file.name,
        target.label()
    ));
    engine_info!(
        "{} submitting {} ({} bytes) to {}",
        job_tag(job_id, None),
        file.name,
        file.len(),
        target.label()
    );
    vec![Effect::SubmitJob {
        job_id,
        file,
        target,
    }]
}

fn reject(state: &mut AppState, reason: &str) -> Vec<Effect> {
    // A finished job's output gives way to the validation error.
    if state.job_state().is_terminal() {
        state.job = None;
        state.clear_job_output();
    }
    state.push_client_line(reason);
    state.set_outcome(Outcome::Error(JobError::Validation(reason.to_string())));
    Vec::new()
}

fn apply_lines(state: &mut AppState, job_id: JobId, lines: Vec<String>) {
    let Some(job) = state.active_job_mut(job_id) else {
        discard(job_id, "log lines");
        return;
    };
    // Lines imply the response has started even if the start event was lost.
    job.state = JobState::Streaming;
    if lines.is_empty() {
        return;
    }

    state.push_server_lines(&lines);
    if let Some(artifacts) = state.scanner.scan(&lines) {
        engine_info!(
            "{} artifacts ready: enhance={} refine={}",
            job_tag(job_id, state.process_id()),
            artifacts.enhance,
            artifacts.refine
        );
        state.set_outcome(Outcome::Artifacts(artifacts));
    }
}

fn apply_structured(state: &mut AppState, job_id: JobId, result: StructuredResult) {
    let Some(job) = state.active_job_mut(job_id) else {
        discard(job_id, "structured result");
        return;
    };
    job.cancel_ticket = None;
    match result {
        StructuredResult::Artifacts(artifacts) => {
            job.state = JobState::Completed;
            state.push_client_line("Processing finished");
            state.set_outcome(Outcome::Artifacts(artifacts));
        }
        StructuredResult::Error(message) => {
            job.state = JobState::Failed;
            let error = JobError::Remote(message);
            state.push_client_line(format!("Error: {error}"));
            state.set_outcome(Outcome::Error(error));
        }
    }
}

fn fail(state: &mut AppState, job_id: JobId, error: JobError) {
    let Some(job) = state.active_job_mut(job_id) else {
        discard(job_id, "failure");
        return;
    };
    job.state = JobState::Failed;
    job.cancel_ticket = None;
    engine_info!(
        "{} failed: {}",
        job_tag(job_id, job.process_id.as_deref()),
        error
    );
    state.push_client_line(format!("Error: {error}"));
    state.set_outcome(Outcome::Error(error));
}

/// The single cancellation path shared by all triggers.
fn cancel(state: &mut AppState, trigger: CancelTrigger) -> Vec<Effect> {
    if trigger == CancelTrigger::User {
        if let Some(job) = state.job.as_mut().filter(|job| job.awaiting_cancel_report) {
            job.awaiting_cancel_report = false;
            engine_info!(
                "{} no longer waiting for the cancel report",
                job_tag(job.id, job.process_id.as_deref())
            );
            state.push_client_line("Stopped waiting for the backend to confirm the cancel");
            return Vec::new();
        }
    }
    let Some(job) = state.job.as_mut().filter(|job| job.state.is_active()) else {
        return Vec::new();
    };
    let Some(_ticket) = job.cancel_ticket.take() else {
        return Vec::new();
    };

    job.state = JobState::Cancelled;
    let job_id = job.id;
    let mut effects = vec![Effect::AbortJob { job_id }];

    let delivery = match trigger {
        CancelTrigger::Unload => CancelDelivery::FireAndForget,
        CancelTrigger::User | CancelTrigger::Teardown => CancelDelivery::Awaited,
    };
    if let Some(process_id) = job.process_id.clone() {
        job.awaiting_cancel_report = delivery == CancelDelivery::Awaited;
        effects.push(Effect::SendCancel {
            job_id,
            process_id,
            target: job.target,
            delivery,
        });
    }
    let has_remote = effects.len() > 1;
    engine_info!(
        "{} cancelled ({:?}), notifying backend: {}",
        job_tag(job_id, job.process_id.as_deref()),
        trigger,
        has_remote
    );

    state.push_client_line("Attempting to cancel processing...");
    if !has_remote {
        state.push_client_line("No process id received yet; stopped locally only");
    }
    let notice = match trigger {
        CancelTrigger::User => "Request cancelled by user",
        CancelTrigger::Teardown => "Request cancelled: view closed",
        CancelTrigger::Unload => "Request cancelled: shutting down",
    };
    state.push_client_line(notice);
    state.set_outcome(Outcome::Cancelled(notice.to_string()));
    effects
}

fn apply_cancel_report(state: &mut AppState, job_id: JobId, report: CancelReport) {
    let Some(job) = state.job.as_mut().filter(|job| {
        job.id == job_id && job.state == JobState::Cancelled && job.awaiting_cancel_report
    }) else {
        discard(job_id, "cancel report");
        return;
    };
    job.awaiting_cancel_report = false;
    let line = if report.acknowledged {
        format!("Cancel succeeded: {}", report.message)
    } else {
        format!("Cancel failed: {}", report.message)
    };
    state.push_client_line(line);
}

fn discard(job_id: JobId, what: &str) {
    engine_debug!("{} discarding late {}", job_tag(job_id, None), what);
}
