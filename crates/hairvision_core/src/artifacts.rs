//! Result extraction from the free-text job log.
//!
//! The backend announces its two output files with one marker line each:
//!
//! ```text
//! 增强文件: /download/photo_enhance.ply
//! 精细文件: /download/photo_refine.ply
//! ```
//!
//! The marker text is a contract with the backend. Bump
//! [`MARKER_CONTRACT_VERSION`] whenever the accepted shape changes.
//!
//! The file stem matches Unicode word characters, so stems such as
//! `照片_enhance` are accepted. Paths with `-`, `.` or spaces in the stem are
//! not.

use std::sync::OnceLock;

use regex::Regex;

pub const MARKER_CONTRACT_VERSION: u32 = 1;
pub const ENHANCE_MARKER: &str = "增强文件: ";
pub const REFINE_MARKER: &str = "精细文件: ";

/// Relative download locations of the two artifacts of a finished job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSet {
    pub enhance: String,
    pub refine: String,
}

/// Accumulates marker matches across batches of completed lines.
///
/// Either marker may arrive first. The first capture of each field wins and
/// the ready set is handed out exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArtifactScanner {
    enhance: Option<String>,
    refine: Option<String>,
    reported: bool,
}

impl ArtifactScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans newly completed lines. Returns the artifact set the first time
    /// both markers have been seen, `None` otherwise.
    pub fn scan<S: AsRef<str>>(&mut self, lines: &[S]) -> Option<ArtifactSet> {
        let (enhance_re, refine_re) = marker_patterns();
        for line in lines {
            let line = line.as_ref();
            if self.enhance.is_none() {
                self.enhance = capture(enhance_re, line);
            }
            if self.refine.is_none() {
                self.refine = capture(refine_re, line);
            }
        }

        if self.reported {
            return None;
        }
        let ready = self.ready()?;
        self.reported = true;
        Some(ready)
    }

    /// Both artifacts, once both markers have been seen.
    pub fn ready(&self) -> Option<ArtifactSet> {
        match (&self.enhance, &self.refine) {
            (Some(enhance), Some(refine)) => Some(ArtifactSet {
                enhance: enhance.clone(),
                refine: refine.clone(),
            }),
            _ => None,
        }
    }

    pub fn enhance(&self) -> Option<&str> {
        self.enhance.as_deref()
    }

    pub fn refine(&self) -> Option<&str> {
        self.refine.as_deref()
    }
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn marker_patterns() -> (&'static Regex, &'static Regex) {
    static ENHANCE: OnceLock<Regex> = OnceLock::new();
    static REFINE: OnceLock<Regex> = OnceLock::new();
    let enhance = ENHANCE.get_or_init(|| marker_regex(ENHANCE_MARKER));
    let refine = REFINE.get_or_init(|| marker_regex(REFINE_MARKER));
    (enhance, refine)
}

// `\w` is Unicode-aware in `regex`; narrowing it to ASCII is a contract change.
fn marker_regex(marker: &str) -> Regex {
    let pattern = format!(r"{}(/download/[\w_]+\.ply)", regex::escape(marker));
    Regex::new(&pattern).expect("marker pattern is valid")
}
