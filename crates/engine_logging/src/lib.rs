#![deny(missing_docs)]
//! Shared logging utilities for the HairVision workspace.
//!
//! This crate provides the `engine_*` logging macros used by the core, the
//! engine and the CLI, plus a minimal test initializer for the global logger.
//! Messages that belong to a remote job should carry the job tag produced by
//! [`job_tag`] so that interleaved jobs stay readable in `hairvision.log`.

/// Formats the tag used to prefix log lines that belong to one job.
///
/// `process_id` is the server-issued identifier, once known.
pub fn job_tag(job_id: u64, process_id: Option<&str>) -> String {
    match process_id {
        Some(pid) if !pid.is_empty() => format!("[job {job_id} pid={pid}]"),
        _ => format!("[job {job_id}]"),
    }
}

/// Logs a trace-level message using the global logging facade.
#[macro_export]
macro_rules! engine_trace {
    ($($arg:tt)*) => {{
        log::trace!($($arg)*);
    }};
}

/// Logs an info-level message using the global logging facade.
#[macro_export]
macro_rules! engine_info {
    ($($arg:tt)*) => {{
        log::info!($($arg)*);
    }};
}

/// Logs a debug-level message using the global logging facade.
#[macro_export]
macro_rules! engine_debug {
    ($($arg:tt)*) => {{
        log::debug!($($arg)*);
    }};
}

/// Logs a warn-level message using the global logging facade.
#[macro_export]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{
        log::warn!($($arg)*);
    }};
}

/// Logs an error-level message using the global logging facade.
#[macro_export]
macro_rules! engine_error {
    ($($arg:tt)*) => {{
        log::error!($($arg)*);
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
