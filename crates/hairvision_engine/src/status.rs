use serde::Deserialize;

use crate::settings::{Backend, EngineSettings};
use crate::types::{map_reqwest_error, EngineError, FailureKind};

/// Summary from `GET /status`. Per-process details are not kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BackendStatus {
    pub status: String,
    #[serde(default)]
    pub uptime: f64,
    #[serde(default)]
    pub active_processes_count: u64,
    #[serde(default)]
    pub total_processes: u64,
}

pub async fn fetch_status(
    client: &reqwest::Client,
    settings: &EngineSettings,
    backend: Backend,
) -> Result<BackendStatus, EngineError> {
    let url = settings.jobs_endpoint(backend, &["status"])?;
    let response = client
        .get(url)
        .timeout(settings.request_timeout)
        .send()
        .await
        .map_err(map_reqwest_error)?;
    let status = response.status();
    if !status.is_success() {
        return Err(EngineError::new(
            FailureKind::HttpStatus(status.as_u16()),
            status.to_string(),
        ));
    }
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    serde_json::from_slice(&body).map_err(|err| EngineError::new(FailureKind::Decode, err.to_string()))
}
