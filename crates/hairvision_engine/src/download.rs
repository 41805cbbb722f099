use std::path::PathBuf;

use futures_util::StreamExt;
use sha2::{Digest, Sha256};
use url::Url;

use crate::filename::artifact_filename;
use crate::persist::AtomicFileWriter;
use crate::settings::{Backend, EngineSettings};
use crate::types::{map_reqwest_error, EngineError, FailureKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArtifact {
    pub url: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// Resolves a server-relative artifact path against the backend that
/// produced it.
pub fn resolve_artifact(
    settings: &EngineSettings,
    backend: Backend,
    server_path: &str,
) -> Result<Url, EngineError> {
    let base = Url::parse(&settings.urls(backend).jobs)
        .map_err(|err| EngineError::new(FailureKind::InvalidUrl, err.to_string()))?;
    base.join(server_path)
        .map_err(|err| EngineError::new(FailureKind::InvalidUrl, err.to_string()))
}

pub async fn download_artifact(
    client: &reqwest::Client,
    settings: &EngineSettings,
    url: Url,
    writer: &AtomicFileWriter,
) -> Result<DownloadedArtifact, EngineError> {
    let response = client
        .get(url.clone())
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

    let mut content = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk =
            chunk.map_err(|err| EngineError::new(FailureKind::StreamRead, err.to_string()))?;
        content.extend_from_slice(&chunk);
    }

    let filename = artifact_filename(url.path());
    let path = writer
        .write(&filename, &content)
        .map_err(|err| EngineError::new(FailureKind::Io, err.to_string()))?;
    engine_logging::engine_info!("saved {} ({} bytes)", path.display(), content.len());

    Ok(DownloadedArtifact {
        url: url.to_string(),
        path,
        bytes: content.len() as u64,
        sha256: sha256_hex(&content),
    })
}

pub fn sha256_hex(content: &[u8]) -> String {
    let digest = Sha256::digest(content);
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
