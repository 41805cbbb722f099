use std::io::{self, Write};
use std::time::{Duration, Instant};

use hairvision_core::{AppViewModel, JobState, LogSource, OutcomeView};

const HEARTBEAT: Duration = Duration::from_secs(30);

/// Incremental terminal renderer: prints only what changed since the
/// previous view.
pub struct Renderer {
    origin: String,
    log_generation: u64,
    printed_lines: usize,
    last_state: JobState,
    last_process_id: Option<String>,
    outcome_printed: bool,
    last_output: Instant,
}

impl Renderer {
    /// `origin` is the base URL artifact paths are shown against.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into().trim_end_matches('/').to_string(),
            log_generation: 0,
            printed_lines: 0,
            last_state: JobState::Idle,
            last_process_id: None,
            outcome_printed: false,
            last_output: Instant::now(),
        }
    }

    /// Log generation and line count already printed, for
    /// `AppState::view_since`.
    pub fn log_cursor(&self) -> (u64, usize) {
        (self.log_generation, self.printed_lines)
    }

    /// `view` may carry the whole log or only its tail; `log_offset` says
    /// which.
    pub fn render(&mut self, view: &AppViewModel, out: &mut impl Write) -> io::Result<()> {
        // A new job clears the log.
        if view.log_generation != self.log_generation {
            self.log_generation = view.log_generation;
            self.printed_lines = 0;
            self.outcome_printed = false;
        }

        let skip = self.printed_lines.saturating_sub(view.log_offset);
        for line in view.log.iter().skip(skip) {
            match line.source {
                LogSource::Server => writeln!(out, "{}", line.text)?,
                LogSource::Client => writeln!(out, "» {}", line.text)?,
            }
        }
        let total = view.log_offset + view.log.len();
        if total > self.printed_lines {
            self.last_output = Instant::now();
            self.printed_lines = total;
        }

        if view.process_id != self.last_process_id {
            if let Some(pid) = &view.process_id {
                writeln!(out, "» Process id: {pid}")?;
            }
            self.last_process_id = view.process_id.clone();
        }
        self.last_state = view.job_state;

        // Links seen mid-stream wait until the job settles; a cancel may still
        // replace them.
        if !self.outcome_printed && view.job_state.is_terminal() {
            if let Some(outcome) = &view.outcome {
                self.print_outcome(outcome, out)?;
                self.outcome_printed = true;
            }
        }
        out.flush()
    }

    /// Prints a progress note when an active job has been quiet for a while.
    pub fn heartbeat(
        &mut self,
        started_at: Option<Instant>,
        out: &mut impl Write,
    ) -> io::Result<()> {
        if !self.last_state.is_active() || self.last_output.elapsed() < HEARTBEAT {
            return Ok(());
        }
        if let Some(started_at) = started_at {
            writeln!(
                out,
                "» Still processing ({}s elapsed)",
                started_at.elapsed().as_secs()
            )?;
        }
        self.last_output = Instant::now();
        out.flush()
    }

    fn print_outcome(&self, outcome: &OutcomeView, out: &mut impl Write) -> io::Result<()> {
        match outcome {
            OutcomeView::Artifacts(set) => {
                writeln!(out)?;
                writeln!(out, "Enhanced model: {}{}", self.origin, set.enhance)?;
                writeln!(out, "Refined model:  {}{}", self.origin, set.refine)?;
            }
            OutcomeView::Error(message) => writeln!(out, "Error: {message}")?,
            OutcomeView::Cancelled(notice) => writeln!(out, "{notice}")?,
        }
        Ok(())
    }
}
