use crate::api::{create_api_client, QbitClient, TorrentInfo, TorrentSource};
use crate::cache::{FileRecordCache, ManifestCache};
use crate::config::Config;
use crate::delete::{DeleteBatchResult, DeletionCoordinator};
use crate::error::{JanitorError, JanitorResult};
use crate::metrics::Metrics;
use crate::query::FileFilter;
use crate::scan::DirectoryAggregator;
use crate::types::{DirectoryRecord, FileRecord, ManifestIndex};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Query and cleanup surface over the caches, scanner and deletion
/// coordinator.
pub struct Janitor<S> {
    manifest: Arc<ManifestCache<S>>,
    records: Arc<FileRecordCache<S>>,
    deleter: DeletionCoordinator<S>,
    small_folder_threshold: u64,
}

impl Janitor<QbitClient> {
    /// Wire the real download-client API from configuration.
    pub fn from_config(config: &Config, metrics: Arc<Metrics>) -> JanitorResult<Self> {
        let client = create_api_client(&config.api, Some(Arc::clone(&metrics.api)))?;
        Ok(Self::new(Arc::new(client), config, metrics))
    }
}

impl<S: TorrentSource> Janitor<S> {
    pub fn new(source: Arc<S>, config: &Config, metrics: Arc<Metrics>) -> Self {
        let manifest = Arc::new(ManifestCache::new(
            source,
            &config.cache.dir,
            config.api.max_concurrent_requests,
            Arc::clone(&metrics.cache),
        ));
        let records = Arc::new(FileRecordCache::new(
            &config.cache.dir,
            Arc::clone(&manifest),
            config.scan.clone(),
            metrics,
        ));
        let deleter = DeletionCoordinator::new(Arc::clone(&records), Arc::clone(&manifest));
        Self {
            manifest,
            records,
            deleter,
            small_folder_threshold: config.scan.small_folder_threshold,
        }
    }

    pub fn small_folder_threshold(&self) -> u64 {
        self.small_folder_threshold
    }

    pub async fn get_files_in_directory(
        &self,
        path: &Path,
        filter: &FileFilter,
        clear: bool,
    ) -> JanitorResult<Vec<FileRecord>> {
        self.records.get_files(path, filter, clear).await
    }

    /// Directory rollups below `path`, flagged against the manifest.
    pub async fn get_directories_in_directory(
        &self,
        path: &Path,
        clear: bool,
    ) -> JanitorResult<Vec<DirectoryRecord>> {
        let index = self.manifest.index(clear).await?;
        let root = path.to_path_buf();
        blocking(move || DirectoryAggregator::new(index).get_directories(&root)).await
    }

    pub async fn get_empty_folders(&self, path: &Path) -> JanitorResult<Vec<DirectoryRecord>> {
        let root = path.to_path_buf();
        blocking(move || {
            DirectoryAggregator::new(ManifestIndex::default()).get_empty_folders(&root)
        })
        .await
    }

    /// Folders below `threshold` bytes, or the configured default.
    pub async fn get_small_folders(
        &self,
        path: &Path,
        threshold: Option<u64>,
    ) -> JanitorResult<Vec<DirectoryRecord>> {
        let root = path.to_path_buf();
        let threshold = threshold.unwrap_or(self.small_folder_threshold);
        blocking(move || {
            DirectoryAggregator::new(ManifestIndex::default()).get_small_folders(&root, threshold)
        })
        .await
    }

    pub async fn get_torrents(&self, clear: bool) -> JanitorResult<Vec<TorrentInfo>> {
        self.manifest.get(clear).await
    }

    pub async fn get_torrent_files(&self, clear: bool) -> JanitorResult<Vec<PathBuf>> {
        let torrents = self.manifest.get(clear).await?;
        self.manifest.get_files(&torrents, clear).await
    }

    pub async fn delete_file(&self, path: &Path) -> JanitorResult<()> {
        self.deleter.delete_file(path).await
    }

    pub async fn delete_folder(&self, path: &Path) -> JanitorResult<()> {
        self.deleter.delete_folder(path).await
    }

    pub async fn delete_multiple(&self, paths: &[PathBuf]) -> DeleteBatchResult {
        self.deleter.delete_multiple(paths).await
    }
}

async fn blocking<T, F>(f: F) -> JanitorResult<T>
where
    F: FnOnce() -> JanitorResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| JanitorError::IoError(format!("blocking task failed: {}", e)))?
}
