use std::time::Duration;

use url::Url;

use crate::types::{map_reqwest_error, EngineError, FailureKind};

/// Which backend a request goes to. A job's cancel is always sent to the
/// backend that accepted the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backend {
    #[default]
    Local,
    Remote,
}

impl Backend {
    pub fn label(self) -> &'static str {
        match self {
            Backend::Local => "local",
            Backend::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendUrls {
    /// Origin serving `/run-unihair`, `/cancel/{id}`, `/download/*` and `/status`.
    pub jobs: String,
    /// Origin serving `/classify`.
    pub classify: String,
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub local: BackendUrls,
    pub remote: BackendUrls,
    pub connect_timeout: Duration,
    /// Bound for short requests (cancel, classify, status, download).
    /// Job streams are only bounded by the connect timeout.
    pub request_timeout: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            local: BackendUrls {
                jobs: "http://127.0.0.1:5001".to_string(),
                classify: "http://127.0.0.1:5000".to_string(),
            },
            remote: BackendUrls {
                jobs: "http://127.0.0.1:6006".to_string(),
                classify: "http://127.0.0.1:6005".to_string(),
            },
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl EngineSettings {
    pub fn urls(&self, backend: Backend) -> &BackendUrls {
        match backend {
            Backend::Local => &self.local,
            Backend::Remote => &self.remote,
        }
    }

    pub(crate) fn jobs_endpoint(
        &self,
        backend: Backend,
        segments: &[&str],
    ) -> Result<Url, EngineError> {
        endpoint(&self.urls(backend).jobs, segments)
    }

    pub(crate) fn classify_endpoint(&self, backend: Backend) -> Result<Url, EngineError> {
        endpoint(&self.urls(backend).classify, &["classify"])
    }
}

/// Shared client for every backend call.
pub fn build_http_client(settings: &EngineSettings) -> Result<reqwest::Client, EngineError> {
    reqwest::Client::builder()
        .connect_timeout(settings.connect_timeout)
        .build()
        .map_err(map_reqwest_error)
}

/// Appends path segments to `base`, percent-encoding each one.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, EngineError> {
    let mut url =
        Url::parse(base).map_err(|err| EngineError::new(FailureKind::InvalidUrl, err.to_string()))?;
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            EngineError::new(FailureKind::InvalidUrl, format!("{base} cannot be a base"))
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}
