use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use threadline_core::{is_valid_thread_id, ThreadlineError, ThreadlineResult};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Keyed storage for serialized conversation records.
///
/// `save` replaces the whole value for a key; a reader never observes a
/// partially written value.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Returns the stored value, or `None` if nothing was saved under `key`.
    async fn load(&self, key: &str) -> ThreadlineResult<Option<String>>;
    /// Stores `data` under `key`, replacing any previous value.
    async fn save(&self, key: &str, data: &str) -> ThreadlineResult<()>;
}

fn check_key(key: &str) -> ThreadlineResult<()> {
    if is_valid_thread_id(key) {
        Ok(())
    } else {
        Err(ThreadlineError::Persistence(format!("Invalid record key: {key:?}")))
    }
}

/// One `<key>.json` file per record under a directory.
pub struct FileRecordBackend {
    dir: PathBuf,
}

impl FileRecordBackend {
    /// Backend rooted at `dir`. The directory is created on first use.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the records.
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    /// Location of the record for `key`, creating the directory if needed.
    pub async fn resolve_path(&self, key: &str) -> ThreadlineResult<PathBuf> {
        check_key(key)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            ThreadlineError::Persistence(format!(
                "Failed to create record directory {}: {e}",
                self.dir.display()
            ))
        })?;
        Ok(self.dir.join(format!("{key}.json")))
    }
}

#[async_trait]
impl RecordBackend for FileRecordBackend {
    async fn load(&self, key: &str) -> ThreadlineResult<Option<String>> {
        let path = self.resolve_path(key).await?;
        match tokio::fs::read_to_string(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, key: &str, data: &str) -> ThreadlineResult<()> {
        let path = self.resolve_path(key).await?;
        let tmp = self.dir.join(format!("{key}.json.{}.tmp", Uuid::new_v4()));

        let written = async {
            let mut file = tokio::fs::File::create(&tmp).await?;
            file.write_all(data.as_bytes()).await?;
            file.sync_all().await?;
            drop(file);
            tokio::fs::rename(&tmp, &path).await
        }
        .await;

        if let Err(e) = written {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(ThreadlineError::Persistence(format!(
                "Failed to write {}: {e}",
                path.display()
            )));
        }
        Ok(())
    }
}

/// In-process backend.
#[derive(Default)]
pub struct MemoryRecordBackend {
    records: Mutex<HashMap<String, String>>,
}

impl MemoryRecordBackend {
    /// Empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// True if nothing has been stored.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RecordBackend for MemoryRecordBackend {
    async fn load(&self, key: &str) -> ThreadlineResult<Option<String>> {
        check_key(key)?;
        Ok(self.records.lock().get(key).cloned())
    }

    async fn save(&self, key: &str, data: &str) -> ThreadlineResult<()> {
        check_key(key)?;
        self.records.lock().insert(key.to_string(), data.to_string());
        Ok(())
    }
}
