use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use engine_logging::{engine_error, engine_info};
use hairvision_core::{update, AppState, CancelTrigger, JobState, Msg, SelectedFile, Target};
use hairvision_engine::{
    build_http_client, classify, download_artifact, fetch_status, resolve_artifact,
    AtomicFileWriter, EngineSettings, Upload,
};

use super::config::ClientConfig;
use super::effects::{map_target, EffectRunner};
use super::history::{self, HistoryEntry, SavedArtifact};
use super::logging;
use super::render::Renderer;
use super::signals;
use crate::cli::{Cli, Command, RunArgs};

const TICK: Duration = Duration::from_millis(250);

pub fn run_app(cli: Cli) -> Result<()> {
    logging::initialize(cli.log.into(), cli.verbose);

    let mut config = ClientConfig::load(&cli.config)?;
    config.apply_overrides(&cli);

    match &cli.command {
        Command::Run(args) => run_job(&config, args),
        Command::Classify { file } => run_classify(&config, file),
        Command::Status => run_status(&config),
        Command::History { limit } => {
            print_history(&config.history_file, *limit);
            Ok(())
        }
    }
}

/// Owns the controller state for one `run` invocation. Dropping it while a
/// job is still active tears the job down.
struct JobSession {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    grace: Duration,
}

impl JobSession {
    fn dispatch(&mut self, msg: Msg) {
        let is_tick = matches!(msg, Msg::Tick);
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.runner.enqueue(effects);

        let mut out = io::stdout().lock();
        let result = if self.state.consume_dirty() {
            let (generation, seen) = self.renderer.log_cursor();
            let view = self.state.view_since(generation, seen);
            self.renderer.render(&view, &mut out)
        } else if is_tick {
            self.renderer.heartbeat(self.state.started_at(), &mut out)
        } else {
            Ok(())
        };
        if let Err(err) = result {
            engine_error!("Failed to write to stdout: {}", err);
        }
    }

    fn finished(&self) -> bool {
        self.state.job_state().is_terminal() && !self.state.awaiting_cancel_report()
    }
}

impl Drop for JobSession {
    fn drop(&mut self) {
        if self.state.job_state().is_active() {
            self.dispatch(Msg::Cancel(CancelTrigger::Teardown));
        }
        self.runner.shutdown(self.grace);
    }
}

fn run_job(config: &ClientConfig, args: &RunArgs) -> Result<()> {
    let file = read_selected_file(&args.file)?;
    let target = config.target();
    let settings = config.engine_settings();
    let origin = settings.urls(map_target(target)).jobs.clone();

    let (msg_tx, msg_rx) = mpsc::channel::<Msg>();
    let runner = EffectRunner::new(settings.clone(), msg_tx.clone())
        .context("failed to start the network engine")?;
    signals::spawn_listener(msg_tx.clone()).context("failed to install signal handlers")?;
    drop(msg_tx);

    let mut session = JobSession {
        state: AppState::new(),
        runner,
        renderer: Renderer::new(origin),
        grace: config.unload_grace(),
    };
    session.dispatch(Msg::TargetChanged(target));
    session.dispatch(Msg::FileSelected(Some(file)));
    session.dispatch(Msg::SubmitClicked);

    while !session.finished() {
        match msg_rx.recv_timeout(TICK) {
            Ok(msg) => session.dispatch(msg),
            Err(mpsc::RecvTimeoutError::Timeout) => session.dispatch(Msg::Tick),
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    let final_state = session.state.job_state();
    let artifacts = session.state.artifacts().cloned();
    let error = session.state.error().map(ToString::to_string);
    let process_id = session.state.process_id().map(str::to_string);
    drop(session);

    match final_state {
        JobState::Completed => {
            let Some(artifacts) = artifacts else {
                bail!("processing finished without reporting both models");
            };
            let saved = match &args.download_dir {
                Some(dir) => download_models(
                    &settings,
                    target,
                    dir,
                    [artifacts.enhance.as_str(), artifacts.refine.as_str()],
                )?,
                None => Vec::new(),
            };
            if !args.no_history {
                history::append(
                    &config.history_file,
                    HistoryEntry {
                        finished_utc: Utc::now().to_rfc3339(),
                        file: args.file.display().to_string(),
                        target: target.label().to_string(),
                        process_id,
                        enhance: artifacts.enhance,
                        refine: artifacts.refine,
                        saved,
                    },
                );
            }
            Ok(())
        }
        JobState::Failed => bail!(error.unwrap_or_else(|| "processing failed".to_string())),
        JobState::Cancelled => bail!("processing cancelled"),
        JobState::Idle | JobState::Submitted | JobState::Streaming => {
            bail!("processing did not finish")
        }
    }
}

fn read_selected_file(path: &Path) -> Result<SelectedFile> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(SelectedFile::new(name, data))
}

fn one_shot_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn download_models(
    settings: &EngineSettings,
    target: Target,
    dir: &Path,
    paths: [&str; 2],
) -> Result<Vec<SavedArtifact>> {
    let client = build_http_client(settings)?;
    let writer = AtomicFileWriter::new(dir.to_path_buf());
    let runtime = one_shot_runtime()?;
    let mut saved = Vec::new();
    for server_path in paths {
        let url = resolve_artifact(settings, map_target(target), server_path)?;
        let artifact = runtime
            .block_on(download_artifact(&client, settings, url, &writer))
            .with_context(|| format!("failed to download {server_path}"))?;
        println!(
            "Saved {} ({} bytes, sha256 {})",
            artifact.path.display(),
            artifact.bytes,
            artifact.sha256
        );
        saved.push(SavedArtifact {
            path: artifact.path,
            sha256: artifact.sha256,
        });
    }
    Ok(saved)
}

fn run_classify(config: &ClientConfig, file: &Path) -> Result<()> {
    let selected = read_selected_file(file)?;
    let settings = config.engine_settings();
    let client = build_http_client(&settings)?;
    let backend = map_target(config.target());
    engine_info!("Classifying {} on the {} backend", selected.name, backend.label());

    let upload = Upload {
        file_name: selected.name,
        data: selected.data,
    };
    let result = one_shot_runtime()?
        .block_on(classify(&client, &settings, backend, upload))
        .context("classification failed")?;

    let mut out = io::stdout().lock();
    if let Some((label, score)) = result.top() {
        writeln!(out, "Hairstyle: {label} ({:.2}%)", score * 100.0)?;
    }
    for (label, score) in &result.scores {
        writeln!(out, "  {label:<12} {:>6.2}%", score * 100.0)?;
    }
    Ok(())
}

fn run_status(config: &ClientConfig) -> Result<()> {
    let settings = config.engine_settings();
    let client = build_http_client(&settings)?;
    let backend = map_target(config.target());
    let status = one_shot_runtime()?
        .block_on(fetch_status(&client, &settings, backend))
        .with_context(|| format!("{} backend unreachable", backend.label()))?;
    println!(
        "{} backend: {} (uptime {:.0}s, {} active / {} total processes)",
        backend.label(),
        status.status,
        status.uptime,
        status.active_processes_count,
        status.total_processes
    );
    Ok(())
}

fn print_history(path: &Path, limit: usize) {
    let jobs = history::load(path);
    if jobs.is_empty() {
        println!("No finished jobs recorded in {}", path.display());
        return;
    }
    let skip = jobs.len().saturating_sub(limit);
    for job in jobs.into_iter().skip(skip) {
        println!(
            "{}  {:<6}  {}  pid={}",
            job.finished_utc,
            job.target,
            job.file,
            job.process_id.as_deref().unwrap_or("-")
        );
        println!("    enhance: {}", job.enhance);
        println!("    refine:  {}", job.refine);
        for artifact in &job.saved {
            println!("    saved:   {} ({})", artifact.path.display(), artifact.sha256);
        }
    }
}
