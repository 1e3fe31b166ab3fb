//! Recursive walk that groups regular files by `(device, inode)`.

use crate::metrics::ScanMetrics;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Identity of one physical file on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InodeKey {
    pub device: u64,
    pub inode: u64,
}

impl fmt::Display for InodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.device, self.inode)
    }
}

/// A path that shares an inode group, with its logical size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Inode groups in key order. Every group holds at least one file.
pub type InodeMap = BTreeMap<InodeKey, Vec<ScannedFile>>;

/// Counters for one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    pub files: usize,
    pub skipped: usize,
    pub groups: usize,
    pub hardlinked_files: usize,
}

/// Walks scan roots without following symlinks and stats every regular file.
#[derive(Default)]
pub struct InodeScanner {
    metrics: Option<Arc<ScanMetrics>>,
    #[cfg(not(unix))]
    next_fake_inode: std::cell::Cell<u64>,
}

impl InodeScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: Arc<ScanMetrics>) -> Self {
        Self {
            metrics: Some(metrics),
            ..Self::default()
        }
    }

    /// Scan every root into one inode map. Unreadable entries are skipped.
    pub fn scan<P: AsRef<Path>>(&self, roots: &[P]) -> (InodeMap, ScanSummary) {
        let mut map = InodeMap::new();
        let mut summary = ScanSummary::default();

        for root in roots {
            self.scan_root(root.as_ref(), &mut map, &mut summary);
        }

        summary.groups = map.len();
        summary.hardlinked_files = map
            .values()
            .filter(|files| files.len() > 1)
            .map(Vec::len)
            .sum();

        info!(
            operation = "inode_scan",
            roots = roots.len(),
            files = summary.files,
            skipped = summary.skipped,
            inode_groups = summary.groups,
            hardlinked_files = summary.hardlinked_files,
        );
        (map, summary)
    }

    fn scan_root(&self, root: &Path, map: &mut InodeMap, summary: &mut ScanSummary) {
        debug!(root = %root.display(), "Scanning root");

        for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        path = ?e.path(),
                        error = %e,
                        "Unable to read entry, skipping"
                    );
                    self.skip(summary);
                    continue;
                }
            };

            // Symlinks report their own type here and are never grouped
            if !entry.file_type().is_file() {
                continue;
            }

            let meta = match entry.metadata() {
                Ok(meta) => meta,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Unable to stat file, skipping");
                    self.skip(summary);
                    continue;
                }
            };

            let key = self.inode_key(&meta);
            let files = map.entry(key).or_default();
            // Overlapping roots must not turn one path into a fake hardlink
            if files.iter().any(|f| f.path == entry.path()) {
                continue;
            }
            files.push(ScannedFile {
                path: entry.into_path(),
                size: meta.len(),
            });

            summary.files += 1;
            if let Some(metrics) = &self.metrics {
                metrics.record_file();
            }
            if summary.files % 10_000 == 0 {
                debug!(files = summary.files, "Scan progress");
            }
        }
    }

    fn skip(&self, summary: &mut ScanSummary) {
        summary.skipped += 1;
        if let Some(metrics) = &self.metrics {
            metrics.record_stat_failure();
        }
    }

    #[cfg(unix)]
    fn inode_key(&self, meta: &std::fs::Metadata) -> InodeKey {
        use std::os::unix::fs::MetadataExt;
        InodeKey {
            device: meta.dev(),
            inode: meta.ino(),
        }
    }

    /// No stable inode identity off Unix: every path is its own group, so
    /// hardlink detection is a no-op there.
    #[cfg(not(unix))]
    fn inode_key(&self, _meta: &std::fs::Metadata) -> InodeKey {
        let inode = self.next_fake_inode.get() + 1;
        self.next_fake_inode.set(inode);
        InodeKey { device: 0, inode }
    }
}
