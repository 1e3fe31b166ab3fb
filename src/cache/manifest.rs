use crate::api::{TorrentFilter, TorrentInfo, TorrentSource};
use crate::cache::snapshot::SnapshotFile;
use crate::error::{JanitorError, JanitorResult};
use crate::metrics::CacheMetrics;
use crate::types::ManifestIndex;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

pub const TORRENTS_FILE: &str = "torrents.json";
pub const TORRENT_FILES_FILE: &str = "torrent_files.json";

struct ManifestStores {
    torrents: SnapshotFile<Vec<TorrentInfo>>,
    files: SnapshotFile<Vec<PathBuf>>,
}

/// Disk-backed copy of the download client's torrent list and flattened
/// file manifest.
///
/// One mutex guards both snapshots, so at most one fetch is in flight and a
/// post-delete rewrite never interleaves with a refresh.
pub struct ManifestCache<S> {
    source: Arc<S>,
    stores: Mutex<ManifestStores>,
    max_concurrent_requests: usize,
    metrics: Arc<CacheMetrics>,
}

impl<S: TorrentSource> ManifestCache<S> {
    pub fn new(
        source: Arc<S>,
        cache_dir: &Path,
        max_concurrent_requests: usize,
        metrics: Arc<CacheMetrics>,
    ) -> Self {
        Self {
            source,
            stores: Mutex::new(ManifestStores {
                torrents: SnapshotFile::new(cache_dir.join(TORRENTS_FILE)),
                files: SnapshotFile::new(cache_dir.join(TORRENT_FILES_FILE)),
            }),
            max_concurrent_requests: max_concurrent_requests.max(1),
            metrics,
        }
    }

    /// Torrent list, from the snapshot unless `clear` forces a refetch.
    pub async fn get(&self, clear: bool) -> JanitorResult<Vec<TorrentInfo>> {
        let stores = self.stores.lock().await;
        if clear && stores.torrents.remove().await? {
            self.metrics.record_invalidation();
        }
        if let Some(torrents) = stores.torrents.load().await? {
            self.metrics.record_hit();
            return Ok(torrents);
        }
        self.metrics.record_miss();

        let torrents = self.source.list_torrents(TorrentFilter::All).await?;
        stores.torrents.store(&torrents).await?;
        info!(operation = "fetch_torrents", count = torrents.len());
        Ok(torrents)
    }

    /// Absolute paths of every file of `entries`, from the snapshot unless
    /// `clear` forces a refetch.
    ///
    /// A failure listing any torrent's files fails the whole call and leaves
    /// no snapshot behind; a partial manifest would report managed files as
    /// orphans.
    pub async fn get_files(
        &self,
        entries: &[TorrentInfo],
        clear: bool,
    ) -> JanitorResult<Vec<PathBuf>> {
        let stores = self.stores.lock().await;
        if clear && stores.files.remove().await? {
            self.metrics.record_invalidation();
        }
        if let Some(paths) = stores.files.load().await? {
            self.metrics.record_hit();
            return Ok(paths);
        }
        self.metrics.record_miss();

        let source = &self.source;
        let per_torrent: Vec<Vec<PathBuf>> = stream::iter(entries)
            .map(|torrent| async move {
                let files = source.list_files(&torrent.hash).await?;
                debug!(
                    hash = %torrent.hash,
                    files = files.len(),
                    incomplete = files.iter().filter(|f| f.percent() < 100.0).count(),
                    "Listed torrent files"
                );
                let save_path = Path::new(&torrent.save_path);
                Ok::<_, JanitorError>(
                    files
                        .into_iter()
                        .map(|f| save_path.join(&f.name))
                        .collect::<Vec<_>>(),
                )
            })
            .buffered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        let paths = write_files(&stores, per_torrent.into_iter().flatten().collect()).await?;
        info!(
            operation = "fetch_manifest",
            torrents = entries.len(),
            files = paths.len()
        );
        Ok(paths)
    }

    /// Replace the file manifest snapshot without contacting the client.
    ///
    /// This is the overwrite entry point for callers that already hold a
    /// complete manifest. Deletions use [`ManifestCache::remove_paths`],
    /// which filters and rewrites through the same store step while holding
    /// the lock once.
    pub async fn update_manifest_cache(&self, paths: &[PathBuf]) -> JanitorResult<()> {
        let stores = self.stores.lock().await;
        write_files(&stores, paths.to_vec()).await?;
        Ok(())
    }

    /// Drop every manifest path matching `predicate` and rewrite the snapshot.
    /// Returns the number removed; an absent snapshot has nothing to remove.
    pub async fn remove_paths<F>(&self, predicate: F) -> JanitorResult<usize>
    where
        F: Fn(&Path) -> bool,
    {
        let stores = self.stores.lock().await;
        let Some(mut paths) = stores.files.load().await? else {
            return Ok(0);
        };
        let before = paths.len();
        paths.retain(|p| !predicate(p));
        let removed = before - paths.len();
        if removed > 0 {
            write_files(&stores, paths).await?;
            self.metrics.record_invalidation();
            debug!(removed, "Removed paths from manifest snapshot");
        }
        Ok(removed)
    }

    /// Lookup index over the current manifest.
    pub async fn index(&self, clear: bool) -> JanitorResult<ManifestIndex> {
        let torrents = self.get(clear).await?;
        let paths = self.get_files(&torrents, clear).await?;
        Ok(ManifestIndex::from_paths(paths))
    }
}

async fn write_files(stores: &ManifestStores, paths: Vec<PathBuf>) -> JanitorResult<Vec<PathBuf>> {
    stores.files.store(&paths).await?;
    debug!(files = paths.len(), "Wrote manifest snapshot");
    Ok(paths)
}
