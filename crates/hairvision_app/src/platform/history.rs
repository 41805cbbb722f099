use std::fs;
use std::path::{Path, PathBuf};

use engine_logging::{engine_error, engine_info, engine_warn};
use hairvision_engine::AtomicFileWriter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedArtifact {
    pub path: PathBuf,
    pub sha256: String,
}

/// One finished job with both artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub finished_utc: String,
    pub file: String,
    pub target: String,
    pub process_id: Option<String>,
    pub enhance: String,
    pub refine: String,
    #[serde(default)]
    pub saved: Vec<SavedArtifact>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HistoryFile {
    jobs: Vec<HistoryEntry>,
}

enum Stored {
    Jobs(Vec<HistoryEntry>),
    Unreadable(std::io::Error),
    Corrupt(ron::error::SpannedError),
}

fn read(path: &Path) -> Stored {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Stored::Jobs(Vec::new()),
        Err(err) => return Stored::Unreadable(err),
    };
    match ron::from_str::<HistoryFile>(&content) {
        Ok(file) => Stored::Jobs(file.jobs),
        Err(err) => Stored::Corrupt(err),
    }
}

pub fn load(path: &Path) -> Vec<HistoryEntry> {
    match read(path) {
        Stored::Jobs(jobs) => jobs,
        Stored::Unreadable(err) => {
            engine_warn!("Failed to read job history from {:?}: {}", path, err);
            Vec::new()
        }
        Stored::Corrupt(err) => {
            engine_warn!("Failed to parse job history from {:?}: {}", path, err);
            Vec::new()
        }
    }
}

/// Where an unparseable history file is moved before a fresh one is started.
fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(format!(".{}.bak", chrono::Utc::now().format("%Y%m%dT%H%M%S%.3f")));
    PathBuf::from(name)
}

/// Appends `entry`, rewriting the file atomically. A file that cannot be
/// parsed is moved aside first; one that cannot be read is left alone and
/// nothing is recorded.
pub fn append(path: &Path, entry: HistoryEntry) {
    let mut jobs = match read(path) {
        Stored::Jobs(jobs) => jobs,
        Stored::Unreadable(err) => {
            engine_error!("Not recording job: cannot read history {:?}: {}", path, err);
            return;
        }
        Stored::Corrupt(err) => {
            let backup = backup_path(path);
            if let Err(rename_err) = fs::rename(path, &backup) {
                engine_error!(
                    "Not recording job: history {:?} is corrupt ({}) and could not be moved aside: {}",
                    path,
                    err,
                    rename_err
                );
                return;
            }
            engine_warn!(
                "Job history {:?} could not be parsed ({}); moved it to {:?}",
                path,
                err,
                backup
            );
            Vec::new()
        }
    };
    jobs.push(entry);

    let pretty = ron::ser::PrettyConfig::new();
    let content = match ron::ser::to_string_pretty(&HistoryFile { jobs }, pretty) {
        Ok(text) => text,
        Err(err) => {
            engine_error!("Failed to serialize job history: {}", err);
            return;
        }
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let Some(filename) = path.file_name().and_then(|name| name.to_str()) else {
        engine_error!("Job history path {:?} has no file name", path);
        return;
    };
    match AtomicFileWriter::new(dir).write(filename, content.as_bytes()) {
        Ok(written) => engine_info!("Recorded job in {:?}", written),
        Err(err) => engine_error!("Failed to write job history to {:?}: {}", path, err),
    }
}
