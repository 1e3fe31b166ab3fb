use crate::error::{JanitorError, JanitorResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::PathBuf;
use tracing::{debug, trace};

/// One JSON document on disk holding a point-in-time value.
///
/// A missing file is a cache miss. A file that exists but does not decode is
/// reported as [`JanitorError::CacheCorrupted`] and never read as empty.
/// Writes land in a sibling `.tmp` file first and are renamed into place, so
/// a reader sees either the old snapshot or the new one.
#[derive(Debug)]
pub struct SnapshotFile<T> {
    path: PathBuf,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SnapshotFile<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub async fn load(&self) -> JanitorResult<Option<T>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(path = %self.path.display(), "Snapshot absent");
                return Ok(None);
            }
            Err(e) => return Err(self.corrupted(e.to_string())),
        };
        let value = serde_json::from_slice(&bytes).map_err(|e| self.corrupted(e.to_string()))?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Loaded snapshot");
        Ok(Some(value))
    }

    pub async fn store(&self, value: &T) -> JanitorResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec(value)?;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, &bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Stored snapshot");
        Ok(())
    }

    /// Delete the snapshot. Returns whether a file was removed.
    pub async fn remove(&self) -> JanitorResult<bool> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Removed snapshot");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn corrupted(&self, message: String) -> JanitorError {
        JanitorError::CacheCorrupted {
            path: self.path.clone(),
            message,
        }
    }
}
