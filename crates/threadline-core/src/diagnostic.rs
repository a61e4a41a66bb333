use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::warn;

/// Append-only, line-oriented diagnostic log.
///
/// Each entry is written as `[YYYY-MM-DD HH:MM:SS] message`. Failing to write
/// is never fatal: the failure is reported through `tracing` and dropped.
pub struct DiagnosticLog {
    path: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl DiagnosticLog {
    /// Log that appends to `path`, creating the file and its parent directory on demand.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            write_lock: Mutex::new(()),
        }
    }

    /// Log that discards every entry.
    pub fn disabled() -> Self {
        Self {
            path: None,
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the log file, if enabled.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Appends one timestamped line.
    pub async fn record(&self, message: impl AsRef<str>) {
        let Some(path) = &self.path else {
            return;
        };
        // Entries are single lines; embedded newlines would break that.
        let message = message.as_ref().replace(['\r', '\n'], " ");
        let line = format!("[{}] {}\n", Local::now().format("%Y-%m-%d %H:%M:%S"), message);

        let _guard = self.write_lock.lock().await;
        if let Err(e) = append_line(path, &line).await {
            warn!(path = %path.display(), error = %e, "Failed to write diagnostic log");
        }
    }
}

async fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
