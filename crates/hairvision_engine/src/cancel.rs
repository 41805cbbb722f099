use serde::Deserialize;
use tokio::runtime::Handle;
use tokio_util::task::TaskTracker;

use crate::settings::{build_http_client, Backend, EngineSettings};
use crate::types::{CancelReport, EngineError};

#[derive(Debug, Deserialize)]
struct CancelBody {
    #[serde(default)]
    message: Option<String>,
}

/// Asks a backend to stop a running process.
///
/// Requests are best effort: the report tells the caller what the backend
/// said, and nothing is retried. Detached requests are tracked so that a
/// shutdown can give them a grace period to leave the process.
#[derive(Debug, Clone)]
pub struct CancelClient {
    client: reqwest::Client,
    settings: EngineSettings,
    tracker: TaskTracker,
}

impl CancelClient {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let client = build_http_client(&settings)?;
        Ok(Self::with_client(client, settings))
    }

    pub fn with_client(client: reqwest::Client, settings: EngineSettings) -> Self {
        Self {
            client,
            settings,
            tracker: TaskTracker::new(),
        }
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }

    /// Sends `POST /cancel/{process_id}` and waits for the answer.
    pub async fn cancel(&self, backend: Backend, process_id: &str) -> CancelReport {
        if process_id.trim().is_empty() {
            return CancelReport {
                acknowledged: false,
                message: "no process id to cancel".to_string(),
            };
        }
        match self.send(backend, process_id).await {
            Ok(report) => report,
            Err(err) => {
                engine_logging::engine_warn!("cancel of {process_id} failed: {err}");
                CancelReport {
                    acknowledged: false,
                    message: err.to_string(),
                }
            }
        }
    }

    /// Spawns the cancel request on `runtime` and returns immediately.
    ///
    /// The request is not tied to the caller's lifetime; it completes unless
    /// the runtime itself is dropped. Returns `false` when there was nothing
    /// to send.
    pub fn dispatch_detached(&self, runtime: &Handle, backend: Backend, process_id: String) -> bool {
        if process_id.trim().is_empty() {
            return false;
        }
        let client = self.clone();
        self.tracker.spawn_on(
            async move {
                let report = client.cancel(backend, &process_id).await;
                engine_logging::engine_debug!(
                    "detached cancel of {process_id}: acknowledged={} {}",
                    report.acknowledged,
                    report.message
                );
            },
            runtime,
        );
        true
    }

    async fn send(&self, backend: Backend, process_id: &str) -> Result<CancelReport, EngineError> {
        let url = self.settings.jobs_endpoint(backend, &["cancel", process_id])?;
        let response = self
            .client
            .post(url)
            .timeout(self.settings.request_timeout)
            .send()
            .await
            .map_err(crate::types::map_reqwest_error)?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(crate::types::map_reqwest_error)?;
        let message = serde_json::from_slice::<CancelBody>(&body)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or_else(|| status.to_string());
        Ok(CancelReport {
            acknowledged: status.is_success(),
            message,
        })
    }
}
