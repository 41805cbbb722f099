use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use engine_logging::engine_info;
use hairvision_core::Target;
use hairvision_engine::{BackendUrls, EngineSettings};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::{Cli, TargetArg};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DefaultTarget {
    #[default]
    Local,
    Remote,
}

/// Client settings as stored in `hairvision.ron`. Every field is optional
/// in the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub target: DefaultTarget,
    pub local_url: String,
    pub remote_url: String,
    pub local_classify_url: String,
    pub remote_classify_url: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: u64,
    /// How long pending cancel requests may delay exit.
    pub unload_grace_ms: u64,
    pub history_file: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let engine = EngineSettings::default();
        Self {
            target: DefaultTarget::Local,
            local_url: engine.local.jobs,
            remote_url: engine.remote.jobs,
            local_classify_url: engine.local.classify,
            remote_classify_url: engine.remote.classify,
            connect_timeout_secs: engine.connect_timeout.as_secs(),
            request_timeout_secs: engine.request_timeout.as_secs(),
            unload_grace_ms: 1500,
            history_file: PathBuf::from("hairvision_history.ron"),
        }
    }
}

impl ClientConfig {
    /// Reads `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config = ron::from_str(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        engine_info!("Loaded client configuration from {:?}", path);
        Ok(config)
    }

    /// Command-line flags and `HAIRVISION_*` variables win over the file.
    pub fn apply_overrides(&mut self, cli: &Cli) {
        if let Some(target) = cli.target {
            self.target = match target {
                TargetArg::Local => DefaultTarget::Local,
                TargetArg::Remote => DefaultTarget::Remote,
            };
        }
        let overrides = [
            (&cli.local_url, &mut self.local_url),
            (&cli.remote_url, &mut self.remote_url),
            (&cli.local_classify_url, &mut self.local_classify_url),
            (&cli.remote_classify_url, &mut self.remote_classify_url),
        ];
        for (value, slot) in overrides {
            if let Some(value) = value {
                *slot = value.clone();
            }
        }
    }

    pub fn target(&self) -> Target {
        match self.target {
            DefaultTarget::Local => Target::Local,
            DefaultTarget::Remote => Target::Remote,
        }
    }

    pub fn unload_grace(&self) -> Duration {
        Duration::from_millis(self.unload_grace_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            local: BackendUrls {
                jobs: self.local_url.clone(),
                classify: self.local_classify_url.clone(),
            },
            remote: BackendUrls {
                jobs: self.remote_url.clone(),
                classify: self.remote_classify_url.clone(),
            },
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}
