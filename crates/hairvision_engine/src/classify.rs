use std::collections::BTreeMap;

use reqwest::multipart::{Form, Part};

use crate::settings::{Backend, EngineSettings};
use crate::types::{map_reqwest_error, EngineError, FailureKind, Upload};

/// Class probabilities returned by the classifier, highest first.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub scores: Vec<(String, f64)>,
}

impl Classification {
    pub fn from_map(map: BTreeMap<String, f64>) -> Self {
        let mut scores: Vec<(String, f64)> = map.into_iter().collect();
        scores.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Self { scores }
    }

    pub fn top(&self) -> Option<(&str, f64)> {
        self.scores
            .first()
            .map(|(label, score)| (label.as_str(), *score))
    }
}

/// Uploads an image to `POST /classify` on the backend's classify origin.
pub async fn classify(
    client: &reqwest::Client,
    settings: &EngineSettings,
    backend: Backend,
    upload: Upload,
) -> Result<Classification, EngineError> {
    if upload.data.is_empty() {
        return Err(EngineError::new(
            FailureKind::EmptyUpload,
            "upload payload is empty",
        ));
    }
    let url = settings.classify_endpoint(backend)?;
    let part = Part::bytes(upload.data.to_vec()).file_name(upload.file_name.clone());
    let response = client
        .post(url)
        .timeout(settings.request_timeout)
        .multipart(Form::new().part("file", part))
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
    let map: BTreeMap<String, f64> = serde_json::from_slice(&body)
        .map_err(|err| EngineError::new(FailureKind::Decode, err.to_string()))?;
    Ok(Classification::from_map(map))
}
