use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::cancel::CancelClient;
use crate::runner::run_job;
use crate::settings::{build_http_client, Backend, EngineSettings};
use crate::submit::{JobSubmitter, ReqwestSubmitter};
use crate::types::{
    CancelDelivery, EngineError, EngineEvent, EventSink, FailureKind, JobId, Upload,
};

enum EngineCommand {
    Submit {
        job_id: JobId,
        upload: Upload,
        backend: Backend,
    },
    Abort {
        job_id: JobId,
    },
    Cancel {
        job_id: JobId,
        process_id: String,
        backend: Backend,
        delivery: CancelDelivery,
    },
    Shutdown {
        grace: Duration,
    },
}

type JobTokens = Arc<Mutex<HashMap<JobId, CancellationToken>>>;

/// Owns the engine thread and its tokio runtime. Commands are queued from
/// any thread; events go to the sink given at construction.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings, sink: Arc<dyn EventSink>) -> Result<Self, EngineError> {
        let client = build_http_client(&settings)?;
        let submitter = Arc::new(ReqwestSubmitter::with_client(client.clone(), settings.clone()));
        let canceller = CancelClient::with_client(client, settings);
        Self::with_parts(submitter, canceller, sink)
    }

    pub fn with_parts(
        submitter: Arc<dyn JobSubmitter>,
        canceller: CancelClient,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, EngineError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|err| EngineError::new(FailureKind::Io, err.to_string()))?;
        let (cmd_tx, cmd_rx) = mpsc::channel();

        let worker = thread::Builder::new()
            .name("hairvision-engine".to_string())
            .spawn(move || {
                let tokens: JobTokens = Arc::default();
                while let Ok(command) = cmd_rx.recv() {
                    match command {
                        EngineCommand::Submit {
                            job_id,
                            upload,
                            backend,
                        } => {
                            let token = CancellationToken::new();
                            lock(&tokens).insert(job_id, token.clone());
                            let submitter = submitter.clone();
                            let sink = sink.clone();
                            let tokens = tokens.clone();
                            runtime.spawn(async move {
                                let result = run_job(
                                    submitter.as_ref(),
                                    job_id,
                                    upload,
                                    backend,
                                    &token,
                                    sink.as_ref(),
                                )
                                .await;
                                lock(&tokens).remove(&job_id);
                                sink.emit(EngineEvent::JobCompleted { job_id, result });
                            });
                        }
                        EngineCommand::Abort { job_id } => {
                            if let Some(token) = lock(&tokens).remove(&job_id) {
                                engine_logging::engine_debug!(
                                    "{} aborting local request",
                                    engine_logging::job_tag(job_id, None)
                                );
                                token.cancel();
                            }
                        }
                        EngineCommand::Cancel {
                            job_id,
                            process_id,
                            backend,
                            delivery: CancelDelivery::Awaited,
                        } => {
                            let client = canceller.clone();
                            let sink = sink.clone();
                            canceller.tracker().spawn_on(
                                async move {
                                    let report = client.cancel(backend, &process_id).await;
                                    sink.emit(EngineEvent::CancelCompleted { job_id, report });
                                },
                                runtime.handle(),
                            );
                        }
                        EngineCommand::Cancel {
                            job_id,
                            process_id,
                            backend,
                            delivery: CancelDelivery::FireAndForget,
                        } => {
                            engine_logging::engine_debug!(
                                "{} detached cancel",
                                engine_logging::job_tag(job_id, Some(&process_id))
                            );
                            canceller.dispatch_detached(runtime.handle(), backend, process_id);
                        }
                        EngineCommand::Shutdown { grace } => {
                            for (_, token) in lock(&tokens).drain() {
                                token.cancel();
                            }
                            let tracker = canceller.tracker().clone();
                            tracker.close();
                            let drained = runtime
                                .block_on(async { tokio::time::timeout(grace, tracker.wait()).await });
                            if drained.is_err() {
                                engine_logging::engine_warn!(
                                    "{} cancel request(s) still pending at shutdown",
                                    tracker.len()
                                );
                            }
                            break;
                        }
                    }
                }
                runtime.shutdown_background();
            })
            .map_err(|err| EngineError::new(FailureKind::Io, err.to_string()))?;

        Ok(Self {
            cmd_tx,
            worker: Some(worker),
        })
    }

    pub fn submit(&self, job_id: JobId, upload: Upload, backend: Backend) {
        let _ = self.cmd_tx.send(EngineCommand::Submit {
            job_id,
            upload,
            backend,
        });
    }

    /// Drops the local request for `job_id`. The backend is not contacted.
    pub fn abort(&self, job_id: JobId) {
        let _ = self.cmd_tx.send(EngineCommand::Abort { job_id });
    }

    pub fn cancel(
        &self,
        job_id: JobId,
        process_id: impl Into<String>,
        backend: Backend,
        delivery: CancelDelivery,
    ) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel {
            job_id,
            process_id: process_id.into(),
            backend,
            delivery,
        });
    }

    /// Aborts running jobs, then waits up to `grace` for outstanding cancel
    /// requests before stopping the runtime.
    pub fn shutdown(&mut self, grace: Duration) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.cmd_tx.send(EngineCommand::Shutdown { grace });
        if worker.join().is_err() {
            engine_logging::engine_error!("engine thread panicked");
        }
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown(Duration::from_secs(2));
    }
}

fn lock(tokens: &JobTokens) -> std::sync::MutexGuard<'_, HashMap<JobId, CancellationToken>> {
    tokens.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
