//! Partial-content hashing per inode group and duplicate flagging.
//!
//! Only the first `hash_bytes` of one representative path per group are
//! read. Distinct files sharing an identical prefix are reported as
//! duplicates; full-file hashing of multi-gigabyte media is not worth the
//! I/O for a housekeeping pass.

use crate::metrics::ScanMetrics;
use crate::scan::inode::{InodeKey, InodeMap};
use crate::types::FileRecord;
use futures::stream::{self, StreamExt};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Hash recorded for a group whose representative could not be read.
pub const HASH_ERROR: &str = "error";

/// SHA-256 over at most `budget` leading bytes of `path`, lowercase hex.
/// Short files are hashed as-is.
pub fn partial_hash(path: &Path, budget: usize) -> io::Result<String> {
    let mut reader = File::open(path)?.take(budget as u64);
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

fn hash_or_sentinel(path: &Path, budget: usize) -> String {
    match partial_hash(path, budget) {
        Ok(hash) => hash,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Partial hash failed");
            HASH_ERROR.to_string()
        }
    }
}

/// Hashes that can collide: non-empty and not the error sentinel.
pub fn is_comparable_hash(hash: &str) -> bool {
    !hash.is_empty() && hash != HASH_ERROR
}

/// Computes one partial hash per inode group with bounded parallelism.
pub struct DuplicateDetector {
    hash_bytes: usize,
    max_concurrent: usize,
    metrics: Option<Arc<ScanMetrics>>,
}

impl DuplicateDetector {
    pub fn new(hash_bytes: usize, max_concurrent: usize) -> Self {
        Self {
            hash_bytes,
            max_concurrent: max_concurrent.max(1),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ScanMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Hash the first path of every group. At most `max_concurrent` reads
    /// are in flight; a failing read yields [`HASH_ERROR`] for its group only.
    pub async fn hash_groups(&self, map: &InodeMap) -> HashMap<InodeKey, String> {
        let total = map.len();
        let budget = self.hash_bytes;
        let jobs: Vec<(InodeKey, PathBuf)> = map
            .iter()
            .filter_map(|(key, files)| files.first().map(|f| (*key, f.path.clone())))
            .collect();

        let mut results = stream::iter(jobs)
            .map(|(key, path)| async move {
                let hash = match tokio::task::spawn_blocking(move || hash_or_sentinel(&path, budget))
                    .await
                {
                    Ok(hash) => hash,
                    Err(e) => {
                        warn!(inode = %key, error = %e, "Hash task failed");
                        HASH_ERROR.to_string()
                    }
                };
                (key, hash)
            })
            .buffer_unordered(self.max_concurrent);

        let mut hashes = HashMap::with_capacity(total);
        let mut failures = 0usize;
        while let Some((key, hash)) = results.next().await {
            let failed = hash == HASH_ERROR;
            if failed {
                failures += 1;
            }
            if let Some(metrics) = &self.metrics {
                metrics.record_hash(failed);
            }
            hashes.insert(key, hash);
            if hashes.len() % 500 == 0 {
                debug!(hashed = hashes.len(), total, "Hash progress");
            }
        }

        info!(
            operation = "partial_hash",
            groups = total,
            failures,
            budget_bytes = budget,
            "Computed partial hashes"
        );
        hashes
    }
}

/// Hashes shared by two or more distinct inode groups.
pub fn duplicate_hashes(hashes: &HashMap<InodeKey, String>) -> HashSet<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for hash in hashes.values().filter(|h| is_comparable_hash(h)) {
        *counts.entry(hash.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(hash, _)| hash.to_string())
        .collect()
}

/// Recompute `hash_duplicate` over `records`, counting distinct inode ids
/// per hash so hardlinks of one file never flag each other.
pub fn mark_duplicates(records: &mut [FileRecord]) {
    let mut groups: HashMap<&str, HashSet<&str>> = HashMap::new();
    for record in records.iter().filter(|r| is_comparable_hash(&r.partial_hash)) {
        groups
            .entry(record.partial_hash.as_str())
            .or_default()
            .insert(record.inode_id.as_str());
    }
    let duplicated: HashSet<String> = groups
        .into_iter()
        .filter(|(_, inodes)| inodes.len() > 1)
        .map(|(hash, _)| hash.to_string())
        .collect();

    for record in records.iter_mut() {
        record.hash_duplicate = duplicated.contains(&record.partial_hash);
    }
}
