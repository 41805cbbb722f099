use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::{ArtifactScanner, ArtifactSet, JobError};

pub type JobId = u64;

/// Which backend deployment a job is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Target {
    #[default]
    Local,
    Remote,
}

impl Target {
    pub fn label(self) -> &'static str {
        match self {
            Target::Local => "local",
            Target::Remote => "remote",
        }
    }
}

/// The file chosen for upload. The payload is shared, never copied, between
/// the state and the effect that transmits it.
#[derive(Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub data: Arc<[u8]>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for SelectedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectedFile")
            .field("name", &self.name)
            .field("len", &self.data.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobState {
    #[default]
    Idle,
    Submitted,
    Streaming,
    Completed,
    Cancelled,
    Failed,
}

impl JobState {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Submitted | Self::Streaming)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSource {
    /// A line produced by the backend.
    Server,
    /// A status line produced by this client.
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub source: LogSource,
    pub text: String,
}

/// Right to cancel the in-flight job. Exactly one exists per active job and
/// taking it is the only way to reach `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CancelTicket;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Job {
    pub(crate) id: JobId,
    pub(crate) process_id: Option<String>,
    pub(crate) state: JobState,
    pub(crate) target: Target,
    pub(crate) file_name: String,
    pub(crate) started_at: Instant,
    pub(crate) cancel_ticket: Option<CancelTicket>,
    pub(crate) awaiting_cancel_report: bool,
}

/// What the user sees once a job produced something. Holding a single slot
/// makes artifacts, error and cancellation notice mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Outcome {
    Artifacts(ArtifactSet),
    Error(JobError),
    Cancelled(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub(crate) selected: Option<SelectedFile>,
    pub(crate) target: Target,
    pub(crate) last_job_id: JobId,
    pub(crate) job: Option<Job>,
    pub(crate) log: Vec<LogLine>,
    pub(crate) log_generation: u64,
    pub(crate) scanner: ArtifactScanner,
    pub(crate) outcome: Option<Outcome>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_state(&self) -> JobState {
        self.job.as_ref().map_or(JobState::Idle, |job| job.state)
    }

    pub fn job_id(&self) -> Option<JobId> {
        self.job.as_ref().map(|job| job.id)
    }

    pub fn process_id(&self) -> Option<&str> {
        self.job.as_ref().and_then(|job| job.process_id.as_deref())
    }

    pub fn target(&self) -> Target {
        self.target
    }

    /// Target of the current job, which may differ from the toggle if it was
    /// flipped after submission.
    pub fn job_target(&self) -> Option<Target> {
        self.job.as_ref().map(|job| job.target)
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.job.as_ref().map(|job| job.started_at)
    }

    pub fn log(&self) -> &[LogLine] {
        &self.log
    }

    /// Bumped whenever the log is cleared, so a reader holding an offset into
    /// the old log knows to start over.
    pub fn log_generation(&self) -> u64 {
        self.log_generation
    }

    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        match &self.outcome {
            Some(Outcome::Artifacts(set)) => Some(set),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&JobError> {
        match &self.outcome {
            Some(Outcome::Error(err)) => Some(err),
            _ => None,
        }
    }

    pub fn cancel_notice(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Cancelled(notice)) => Some(notice),
            _ => None,
        }
    }

    /// True while an awaited cancel request for the current job has not
    /// reported back.
    pub fn awaiting_cancel_report(&self) -> bool {
        self.job.as_ref().is_some_and(|job| job.awaiting_cancel_report)
    }

    /// Returns whether the state changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// The current job, only while it still accepts events for `job_id`.
    pub(crate) fn active_job_mut(&mut self, job_id: JobId) -> Option<&mut Job> {
        self.job
            .as_mut()
            .filter(|job| job.id == job_id && job.state.is_active())
    }

    pub(crate) fn begin_job(&mut self, file: &SelectedFile) -> JobId {
        self.last_job_id += 1;
        let id = self.last_job_id;
        self.clear_job_output();
        self.job = Some(Job {
            id,
            process_id: None,
            state: JobState::Submitted,
            target: self.target,
            file_name: file.name.clone(),
            started_at: Instant::now(),
            cancel_ticket: Some(CancelTicket),
            awaiting_cancel_report: false,
        });
        self.mark_dirty();
        id
    }

    pub(crate) fn clear_job_output(&mut self) {
        self.log.clear();
        self.log_generation += 1;
        self.scanner = ArtifactScanner::new();
        self.outcome = None;
    }

    pub(crate) fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.mark_dirty();
    }

    pub(crate) fn push_client_line(&mut self, text: impl Into<String>) {
        self.log.push(LogLine {
            source: LogSource::Client,
            text: text.into(),
        });
        self.mark_dirty();
    }

    pub(crate) fn push_server_lines(&mut self, lines: &[String]) {
        self.log.extend(lines.iter().map(|text| LogLine {
            source: LogSource::Server,
            text: text.clone(),
        }));
        self.mark_dirty();
    }
}
