use crate::state::Outcome;
use crate::{AppState, ArtifactSet, JobId, JobState, LogLine, Target};

/// Snapshot handed to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub job_state: JobState,
    pub job_id: Option<JobId>,
    pub process_id: Option<String>,
    pub target: Target,
    pub selected_file: Option<String>,
    pub job_file: Option<String>,
    /// Generation of the log `log` was taken from.
    pub log_generation: u64,
    /// Index in the full log of the first entry in `log`.
    pub log_offset: usize,
    pub log: Vec<LogLine>,
    pub outcome: Option<OutcomeView>,
    pub can_submit: bool,
    pub can_cancel: bool,
}

/// At most one of these is shown per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeView {
    Artifacts(ArtifactSet),
    Error(String),
    Cancelled(String),
}

impl AppState {
    /// Snapshot carrying the whole log.
    pub fn view(&self) -> AppViewModel {
        self.view_since(self.log_generation, 0)
    }

    /// Snapshot carrying only the log lines after the first `seen` of
    /// `generation`. A stale generation yields the whole current log.
    pub fn view_since(&self, generation: u64, seen: usize) -> AppViewModel {
        let log_offset = if generation == self.log_generation {
            seen.min(self.log.len())
        } else {
            0
        };
        let job = self.job.as_ref();
        let job_state = self.job_state();
        AppViewModel {
            job_state,
            job_id: job.map(|job| job.id),
            process_id: job.and_then(|job| job.process_id.clone()),
            target: self.target,
            selected_file: self.selected.as_ref().map(|file| file.name.clone()),
            job_file: job.map(|job| job.file_name.clone()),
            log_generation: self.log_generation,
            log_offset,
            log: self.log[log_offset..].to_vec(),
            outcome: self.outcome.as_ref().map(|outcome| match outcome {
                Outcome::Artifacts(set) => OutcomeView::Artifacts(set.clone()),
                Outcome::Error(err) => OutcomeView::Error(err.to_string()),
                Outcome::Cancelled(notice) => OutcomeView::Cancelled(notice.clone()),
            }),
            can_submit: !job_state.is_active()
                && self.selected.as_ref().is_some_and(|file| !file.is_empty()),
            can_cancel: job.is_some_and(|job| job.cancel_ticket.is_some()),
        }
    }
}
