//! Filesystem deletion followed by cache invalidation.

use crate::api::TorrentSource;
use crate::cache::{FileRecordCache, ManifestCache};
use crate::error::{JanitorError, JanitorResult};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::WalkDir;

/// Paths shorter than this are refused outright.
pub const MIN_DELETE_PATH_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TargetKind {
    File,
    Folder,
}

/// One failed item of a batch.
#[derive(Debug, Clone)]
pub struct DeleteFailure {
    pub path: PathBuf,
    pub error: JanitorError,
}

/// Outcome of [`DeletionCoordinator::delete_multiple`].
#[derive(Debug, Clone, Default)]
pub struct DeleteBatchResult {
    pub deleted: Vec<PathBuf>,
    pub errors: Vec<DeleteFailure>,
}

impl DeleteBatchResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Deletes files and folders, then removes them from both caches.
///
/// The record-cache lock is held from before the filesystem delete until
/// both snapshots are rewritten, so a concurrent scan cannot resurrect the
/// target. Cleanup runs even when the target is already gone, and a folder
/// removal that stops part-way still prunes the entries it did remove.
pub struct DeletionCoordinator<S> {
    records: Arc<FileRecordCache<S>>,
    manifest: Arc<ManifestCache<S>>,
}

impl<S: TorrentSource> DeletionCoordinator<S> {
    pub fn new(records: Arc<FileRecordCache<S>>, manifest: Arc<ManifestCache<S>>) -> Self {
        Self { records, manifest }
    }

    pub async fn delete_file(&self, path: &Path) -> JanitorResult<()> {
        self.delete(path, TargetKind::File).await
    }

    pub async fn delete_folder(&self, path: &Path) -> JanitorResult<()> {
        self.delete(path, TargetKind::Folder).await
    }

    /// Delete every path, continuing past failures. Directories are removed
    /// recursively; anything else is treated as a file.
    pub async fn delete_multiple(&self, paths: &[PathBuf]) -> DeleteBatchResult {
        let mut result = DeleteBatchResult::default();
        for path in paths {
            let kind = match target_kind(path).await {
                Ok(Some(TargetKind::Folder)) => TargetKind::Folder,
                _ => TargetKind::File,
            };
            match self.delete(path, kind).await {
                Ok(()) => result.deleted.push(path.clone()),
                Err(error) => {
                    warn!(path = %path.display(), error = %error, "Batch delete item failed");
                    result.errors.push(DeleteFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }
        info!(
            operation = "delete_multiple",
            requested = paths.len(),
            deleted = result.deleted.len(),
            failed = result.errors.len()
        );
        result
    }

    async fn delete(&self, path: &Path, kind: TargetKind) -> JanitorResult<()> {
        validate_target(path)?;
        match (kind, target_kind(path).await?) {
            (TargetKind::File, Some(TargetKind::Folder)) => return Err(JanitorError::IsDirectory),
            (TargetKind::Folder, Some(TargetKind::File)) => return Err(JanitorError::NotDirectory),
            _ => {}
        }

        let guard = self.records.lock().await;
        let removal = match remove_from_disk(path, kind).await {
            Err(e) if kind == TargetKind::File => return Err(e),
            other => other,
        };
        let survivors = match &removal {
            Ok(_) => Survivors::default(),
            Err(error) => {
                warn!(path = %path.display(), error = %error, "Folder removal stopped part-way");
                Survivors::collect(path).await?
            }
        };

        let target = path.to_path_buf();
        let gone = |p: &Path| p.starts_with(&target) && !survivors.contains(p);
        let records = guard.remove_where(|r| gone(&r.path)).await?;
        let manifest = self.manifest.remove_paths(gone).await?;
        drop(guard);

        let existed = removal?;
        info!(
            operation = "delete",
            path = %path.display(),
            kind = ?kind,
            existed,
            records_removed = records,
            manifest_removed = manifest,
        );

        if !existed {
            let what = match kind {
                TargetKind::File => "file",
                TargetKind::Folder => "folder",
            };
            return Err(JanitorError::NotFound(format!("{} {}", what, path.display())));
        }
        Ok(())
    }
}

/// Reject empty, blank and near-root paths before anything is touched.
pub fn validate_target(path: &Path) -> JanitorResult<()> {
    let text = path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(JanitorError::validation("path", "path cannot be empty"));
    }
    if text.chars().count() < MIN_DELETE_PATH_LEN {
        return Err(JanitorError::validation(
            "path",
            format!(
                "'{}' is shorter than {} characters, deletion refused",
                text, MIN_DELETE_PATH_LEN
            ),
        ));
    }
    Ok(())
}

/// Kind of the entry at `path` without following symlinks; `None` if absent.
async fn target_kind(path: &Path) -> JanitorResult<Option<TargetKind>> {
    match tokio::fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => Ok(Some(TargetKind::Folder)),
        Ok(_) => Ok(Some(TargetKind::File)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Entries still on disk below a folder whose removal stopped part-way.
#[derive(Debug, Default)]
struct Survivors {
    files: HashSet<PathBuf>,
    /// Subtrees that could not be listed; everything below them is kept
    unlisted: Vec<PathBuf>,
}

impl Survivors {
    async fn collect(root: &Path) -> JanitorResult<Self> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let mut survivors = Survivors::default();
            for entry in WalkDir::new(&root).follow_links(false) {
                match entry {
                    Ok(entry) if !entry.file_type().is_dir() => {
                        survivors.files.insert(entry.into_path());
                    }
                    Ok(_) => {}
                    Err(e) => {
                        if e.io_error().map(|io| io.kind()) == Some(ErrorKind::NotFound) {
                            continue;
                        }
                        if let Some(path) = e.path() {
                            survivors.unlisted.push(path.to_path_buf());
                        }
                    }
                }
            }
            survivors
        })
        .await
        .map_err(|e| JanitorError::IoError(format!("blocking task failed: {}", e)))
    }

    fn contains(&self, path: &Path) -> bool {
        self.files.contains(path) || self.unlisted.iter().any(|dir| path.starts_with(dir))
    }
}

/// Returns whether something was removed.
async fn remove_from_disk(path: &Path, kind: TargetKind) -> JanitorResult<bool> {
    let result = match kind {
        TargetKind::File => tokio::fs::remove_file(path).await,
        TargetKind::Folder => tokio::fs::remove_dir_all(path).await,
    };
    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
