use std::sync::Once;

use hairvision_core::{
    update, AppState, ArtifactSet, Effect, JobError, JobState, LogSource, Msg, OutcomeView,
    SelectedFile, StructuredResult, Target,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(engine_logging::initialize_for_tests);
}

fn photo() -> SelectedFile {
    SelectedFile::new("photo.jpg", b"\xff\xd8jpeg".to_vec())
}

fn submit(state: AppState, file: SelectedFile) -> (AppState, Vec<Effect>) {
    let (state, _) = update(state, Msg::FileSelected(Some(file)));
    update(state, Msg::SubmitClicked)
}

fn server_lines(state: &AppState) -> Vec<String> {
    state
        .log()
        .iter()
        .filter(|line| line.source == LogSource::Server)
        .map(|line| line.text.clone())
        .collect()
}

#[test]
fn submit_without_file_is_rejected_before_any_effect() {
    init_logging();
    let (mut state, effects) = update(AppState::new(), Msg::SubmitClicked);

    assert!(effects.is_empty());
    assert_eq!(state.job_state(), JobState::Idle);
    assert!(matches!(state.error(), Some(JobError::Validation(_))));
    assert!(state.consume_dirty());
}

#[test]
fn submit_with_empty_file_is_rejected() {
    init_logging();
    let (state, effects) = submit(AppState::new(), SelectedFile::new("empty.jpg", Vec::new()));

    assert!(effects.is_empty());
    assert_eq!(state.job_state(), JobState::Idle);
    assert_eq!(
        state.error(),
        Some(&JobError::Validation("The selected file is empty".to_string()))
    );
}

#[test]
fn submit_emits_upload_for_selected_target() {
    init_logging();
    let (state, _) = update(AppState::new(), Msg::TargetChanged(Target::Remote));
    let (state, effects) = submit(state, photo());

    assert_eq!(state.job_state(), JobState::Submitted);
    assert_eq!(
        effects,
        vec![Effect::SubmitJob {
            job_id: 1,
            file: photo(),
            target: Target::Remote,
        }]
    );
    assert!(state.view().can_cancel);
    assert!(!state.view().can_submit);
}

#[test]
fn second_submit_while_running_is_rejected() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, effects) = update(state, Msg::SubmitClicked);

    assert!(effects.is_empty());
    assert_eq!(state.job_id(), Some(1));
    assert_eq!(state.job_state(), JobState::Submitted);
}

#[test]
fn streamed_job_completes_with_artifacts() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(
        state,
        Msg::ResponseStarted {
            job_id: 1,
            process_id: Some("pid-1".to_string()),
        },
    );
    assert_eq!(state.job_state(), JobState::Streaming);
    assert_eq!(state.process_id(), Some("pid-1"));

    let (state, _) = update(
        state,
        Msg::LinesReceived {
            job_id: 1,
            lines: vec!["aaa".to_string(), "增强文件: /download/x1.ply".to_string()],
        },
    );
    assert!(state.artifacts().is_none());

    let (state, _) = update(
        state,
        Msg::LinesReceived {
            job_id: 1,
            lines: vec!["精细文件: /download/x2.ply".to_string()],
        },
    );
    let (state, effects) = update(state, Msg::StreamFinished { job_id: 1 });

    assert!(effects.is_empty());
    assert_eq!(state.job_state(), JobState::Completed);
    assert_eq!(
        state.artifacts(),
        Some(&ArtifactSet {
            enhance: "/download/x1.ply".to_string(),
            refine: "/download/x2.ply".to_string(),
        })
    );
    assert_eq!(
        server_lines(&state),
        vec![
            "aaa".to_string(),
            "增强文件: /download/x1.ply".to_string(),
            "精细文件: /download/x2.ply".to_string(),
        ]
    );
    assert!(!state.view().can_cancel);
}

#[test]
fn blank_process_id_header_is_ignored() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(
        state,
        Msg::ResponseStarted {
            job_id: 1,
            process_id: Some("  ".to_string()),
        },
    );
    assert_eq!(state.job_state(), JobState::Streaming);
    assert_eq!(state.process_id(), None);
}

#[test]
fn structured_error_fails_job_with_backend_message() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(
        state,
        Msg::ResponseStarted {
            job_id: 1,
            process_id: None,
        },
    );
    let (state, _) = update(
        state,
        Msg::StructuredResult {
            job_id: 1,
            result: StructuredResult::Error("decode failed".to_string()),
        },
    );

    assert_eq!(state.job_state(), JobState::Failed);
    assert_eq!(
        state.view().outcome,
        Some(OutcomeView::Error("decode failed".to_string()))
    );
}

#[test]
fn structured_artifacts_complete_job() {
    init_logging();
    let artifacts = ArtifactSet {
        enhance: "/download/a.ply".to_string(),
        refine: "/download/b.ply".to_string(),
    };
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(
        state,
        Msg::StructuredResult {
            job_id: 1,
            result: StructuredResult::Artifacts(artifacts.clone()),
        },
    );

    assert_eq!(state.job_state(), JobState::Completed);
    assert_eq!(state.artifacts(), Some(&artifacts));
}

#[test]
fn transport_failure_fills_error_slot() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(
        state,
        Msg::JobFailed {
            job_id: 1,
            error: JobError::Server { status: 500 },
        },
    );

    assert_eq!(state.job_state(), JobState::Failed);
    assert_eq!(
        state.view().outcome,
        Some(OutcomeView::Error("server returned error: 500".to_string()))
    );
}

#[test]
fn events_after_terminal_state_are_discarded() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(state, Msg::StreamFinished { job_id: 1 });
    let before = state.clone();

    let (state, _) = update(
        state,
        Msg::LinesReceived {
            job_id: 1,
            lines: vec![
                "增强文件: /download/late1.ply".to_string(),
                "精细文件: /download/late2.ply".to_string(),
            ],
        },
    );
    let (state, _) = update(
        state,
        Msg::JobFailed {
            job_id: 1,
            error: JobError::StreamRead("late".to_string()),
        },
    );

    assert_eq!(state.job_state(), JobState::Completed);
    assert_eq!(state.log(), before.log());
    assert!(state.artifacts().is_none());
    assert!(state.error().is_none());
}

#[test]
fn events_for_a_previous_job_are_discarded() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(state, Msg::StreamFinished { job_id: 1 });
    let (state, effects) = update(state, Msg::SubmitClicked);
    assert!(matches!(effects.as_slice(), [Effect::SubmitJob { job_id: 2, .. }]));

    let (state, _) = update(
        state,
        Msg::LinesReceived {
            job_id: 1,
            lines: vec!["stale".to_string()],
        },
    );
    assert!(server_lines(&state).is_empty());
    assert_eq!(state.job_state(), JobState::Submitted);
}

#[test]
fn new_job_clears_previous_output() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(
        state,
        Msg::JobFailed {
            job_id: 1,
            error: JobError::Network("refused".to_string()),
        },
    );
    assert!(state.error().is_some());

    let (state, _) = update(state, Msg::SubmitClicked);
    assert_eq!(state.job_state(), JobState::Submitted);
    assert!(state.view().outcome.is_none());
    assert_eq!(state.log().len(), 1);
}

#[test]
fn reset_returns_to_idle() {
    init_logging();
    let (state, _) = submit(AppState::new(), photo());
    let (state, _) = update(state, Msg::StreamFinished { job_id: 1 });
    let (state, effects) = update(state, Msg::Reset);

    assert!(effects.is_empty());
    assert_eq!(state.job_state(), JobState::Idle);
    assert!(state.log().is_empty());
    assert!(state.view().outcome.is_none());
    assert!(state.view().can_submit);
}
