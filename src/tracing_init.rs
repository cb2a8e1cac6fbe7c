//! Tracing initialization for the `workflow-config` binary.
//!
//! Logs go to stderr by default so JSON printed on stdout stays
//! machine-readable; `--log-file` switches to an append-only file.

use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize global tracing on stderr.
pub fn init_stderr_tracing() {
    // try_init: tests and embedders may already own the global subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Initialize global tracing to `log_path` (append mode, no ANSI).
///
/// Falls back to stderr when the file cannot be opened.
pub fn init_file_tracing(log_path: &Path) {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }

    let log_file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    {
        Ok(f) => f,
        Err(e) => {
            init_stderr_tracing();
            tracing::warn!(path = %log_path.display(), error = %e, "Cannot open log file, logging to stderr");
            return;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(log_file))
        .with_target(true)
        .with_ansi(false)
        .try_init();
}
