use crate::api::TorrentSource;
use crate::cache::manifest::ManifestCache;
use crate::cache::snapshot::SnapshotFile;
use crate::config::ScanConfig;
use crate::error::{JanitorError, JanitorResult};
use crate::metrics::Metrics;
use crate::query::FileFilter;
use crate::scan::{build_records, mark_duplicates, DuplicateDetector, InodeScanner};
use crate::types::FileRecord;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

pub const FILE_RECORDS_FILE: &str = "file_records.json";

type RecordSnapshot = SnapshotFile<Vec<FileRecord>>;

/// Disk-backed, fully enriched record set for every configured root.
///
/// The mutex is held for the whole load-or-scan sequence, so concurrent
/// callers during a miss wait for the one walk in progress and then read
/// its snapshot.
pub struct FileRecordCache<S> {
    snapshot: Mutex<RecordSnapshot>,
    manifest: Arc<ManifestCache<S>>,
    scan: ScanConfig,
    metrics: Arc<Metrics>,
}

impl<S: TorrentSource> FileRecordCache<S> {
    pub fn new(
        cache_dir: &Path,
        manifest: Arc<ManifestCache<S>>,
        scan: ScanConfig,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            snapshot: Mutex::new(SnapshotFile::new(cache_dir.join(FILE_RECORDS_FILE))),
            manifest,
            scan,
            metrics,
        }
    }

    /// Records under `scope` that pass `filter`, sorted by path.
    ///
    /// `clear` discards both the record snapshot and the manifest snapshots
    /// first. Duplicate flags are recomputed over the whole snapshot before
    /// filtering, so they stay global to the scanned roots.
    pub async fn get_files(
        &self,
        scope: &Path,
        filter: &FileFilter,
        clear: bool,
    ) -> JanitorResult<Vec<FileRecord>> {
        let snapshot = self.snapshot.lock().await;
        if clear && snapshot.remove().await? {
            self.metrics.cache.record_invalidation();
        }

        let mut records = match snapshot.load().await? {
            Some(records) => {
                self.metrics.cache.record_hit();
                records
            }
            None => {
                self.metrics.cache.record_miss();
                let records = self.scan_all(clear).await?;
                snapshot.store(&records).await?;
                records
            }
        };
        drop(snapshot);

        mark_duplicates(&mut records);
        let total = records.len();
        let filtered = filter.apply(records, scope);
        debug!(
            scope = %scope.display(),
            total,
            returned = filtered.len(),
            "Filtered file records"
        );
        Ok(filtered)
    }

    /// Take the record-cache critical section. Callers that also touch the
    /// manifest cache must take this lock first.
    pub async fn lock(&self) -> RecordsGuard<'_> {
        RecordsGuard {
            snapshot: self.snapshot.lock().await,
            metrics: &self.metrics,
        }
    }

    async fn scan_all(&self, clear_manifest: bool) -> JanitorResult<Vec<FileRecord>> {
        let started = Instant::now();
        let index = self.manifest.index(clear_manifest).await?;

        let roots = self.scan.roots.clone();
        let scanner = InodeScanner::with_metrics(Arc::clone(&self.metrics.scan));
        let (map, summary) = tokio::task::spawn_blocking(move || scanner.scan(&roots))
            .await
            .map_err(|e| JanitorError::IoError(format!("scan task failed: {}", e)))?;

        let hashes = if self.scan.hash_check {
            DuplicateDetector::new(self.scan.hash_bytes, self.scan.max_concurrent_hashes)
                .with_metrics(Arc::clone(&self.metrics.scan))
                .hash_groups(&map)
                .await
        } else {
            HashMap::new()
        };

        let records = build_records(&map, &hashes, &index);
        self.metrics.scan.record_scan(summary.groups, started.elapsed());
        info!(
            operation = "scan",
            files = records.len(),
            inode_groups = summary.groups,
            hardlinked_files = summary.hardlinked_files,
            duplicates = records.iter().filter(|r| r.hash_duplicate).count(),
            in_qbit = records.iter().filter(|r| r.in_qbit).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
        );
        Ok(records)
    }
}

/// Exclusive access to the record snapshot.
pub struct RecordsGuard<'a> {
    snapshot: MutexGuard<'a, RecordSnapshot>,
    metrics: &'a Metrics,
}

impl RecordsGuard<'_> {
    /// Drop matching records and rewrite the snapshot. An absent snapshot has
    /// nothing to remove.
    pub async fn remove_where<F>(&self, predicate: F) -> JanitorResult<usize>
    where
        F: Fn(&FileRecord) -> bool,
    {
        let Some(mut records) = self.snapshot.load().await? else {
            return Ok(0);
        };
        let before = records.len();
        records.retain(|r| !predicate(r));
        let removed = before - records.len();
        if removed > 0 {
            self.snapshot.store(&records).await?;
            self.metrics.cache.record_invalidation();
        }
        Ok(removed)
    }
}
