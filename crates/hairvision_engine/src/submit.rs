use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};

use crate::settings::{build_http_client, Backend, EngineSettings};
use crate::types::{map_reqwest_error, EngineError, FailureKind, JobId, Upload};

/// Header carrying the backend's process id for a submitted job.
pub const PROCESS_ID_HEADER: &str = "X-Process-ID";

pub type BodyStream = Pin<Box<dyn Stream<Item = Result<Bytes, EngineError>> + Send>>;

/// An accepted job response: headers already read, body not yet consumed.
pub struct JobResponse {
    pub process_id: Option<String>,
    pub content_type: Option<String>,
    pub body: BodyStream,
}

impl JobResponse {
    pub fn is_json(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/json"))
    }
}

#[async_trait::async_trait]
pub trait JobSubmitter: Send + Sync {
    /// Sends `upload` and resolves once the response headers arrive.
    /// The upload is consumed; nothing keeps it once this returns.
    async fn submit(
        &self,
        job_id: JobId,
        upload: Upload,
        backend: Backend,
    ) -> Result<JobResponse, EngineError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestSubmitter {
    client: reqwest::Client,
    settings: EngineSettings,
}

impl ReqwestSubmitter {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let client = build_http_client(&settings)?;
        Ok(Self { client, settings })
    }

    pub fn with_client(client: reqwest::Client, settings: EngineSettings) -> Self {
        Self { client, settings }
    }
}

#[async_trait::async_trait]
impl JobSubmitter for ReqwestSubmitter {
    async fn submit(
        &self,
        job_id: JobId,
        upload: Upload,
        backend: Backend,
    ) -> Result<JobResponse, EngineError> {
        if upload.data.is_empty() {
            return Err(EngineError::new(
                FailureKind::EmptyUpload,
                "upload payload is empty",
            ));
        }
        let url = self.settings.jobs_endpoint(backend, &["run-unihair"])?;
        let part = Part::bytes(upload.data.to_vec()).file_name(upload.file_name.clone());
        drop(upload);
        let form = Form::new().part("file", part);

        engine_logging::engine_debug!(
            "{} submitting to {}",
            engine_logging::job_tag(job_id, None),
            url
        );
        let response = self
            .client
            .post(url)
            .multipart(form)
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

        let headers = response.headers();
        let process_id = headers
            .get(PROCESS_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .bytes_stream()
            .map_err(|err| EngineError::new(FailureKind::StreamRead, err.to_string()))
            .boxed();

        Ok(JobResponse {
            process_id,
            content_type,
            body,
        })
    }
}
