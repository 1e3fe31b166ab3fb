//! Per-directory rollups computed from a fresh walk.

use crate::error::{JanitorError, JanitorResult};
use crate::types::{DirectoryRecord, ManifestIndex};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Debug, Default)]
struct DirStats {
    total_size: u64,
    file_count: u64,
    direct_entries: u64,
    unreadable: bool,
}

/// Sums file sizes per directory below a root and checks manifest coverage.
///
/// Every call performs its own walk; nothing is shared with the file-record
/// snapshot.
pub struct DirectoryAggregator {
    index: ManifestIndex,
}

impl DirectoryAggregator {
    pub fn new(index: ManifestIndex) -> Self {
        Self { index }
    }

    /// Every directory strictly below `root`, sorted by path.
    pub fn get_directories(&self, root: &Path) -> JanitorResult<Vec<DirectoryRecord>> {
        let stats = walk(root)?;
        let dirs: Vec<_> = stats
            .into_iter()
            .map(|(path, s)| self.record(path, &s))
            .collect();
        info!(operation = "directories", root = %root.display(), count = dirs.len());
        Ok(dirs)
    }

    /// Directories with no entries of any kind.
    pub fn get_empty_folders(&self, root: &Path) -> JanitorResult<Vec<DirectoryRecord>> {
        let stats = walk(root)?;
        let dirs: Vec<_> = stats
            .into_iter()
            // An unreadable directory cannot be proven empty
            .filter(|(_, s)| s.direct_entries == 0 && !s.unreadable)
            .map(|(path, s)| self.record(path, &s))
            .collect();
        info!(operation = "empty_folders", root = %root.display(), count = dirs.len());
        Ok(dirs)
    }

    /// Directories whose recursive size is strictly below `threshold` bytes.
    pub fn get_small_folders(
        &self,
        root: &Path,
        threshold: u64,
    ) -> JanitorResult<Vec<DirectoryRecord>> {
        let stats = walk(root)?;
        let dirs: Vec<_> = stats
            .into_iter()
            .filter(|(_, s)| s.total_size < threshold)
            .map(|(path, s)| self.record(path, &s))
            .collect();
        info!(
            operation = "small_folders",
            root = %root.display(),
            threshold,
            count = dirs.len()
        );
        Ok(dirs)
    }

    fn record(&self, path: PathBuf, stats: &DirStats) -> DirectoryRecord {
        DirectoryRecord {
            folder_in_qbit: self.index.covers_dir(&path),
            path,
            total_size_bytes: stats.total_size,
            file_count: stats.file_count,
        }
    }
}

fn walk(root: &Path) -> JanitorResult<BTreeMap<PathBuf, DirStats>> {
    let meta = std::fs::metadata(root)?;
    if !meta.is_dir() {
        return Err(JanitorError::NotDirectory);
    }

    let mut dirs: BTreeMap<PathBuf, DirStats> = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = ?e.path(), error = %e, "Unable to read entry, skipping");
                // A failed read_dir reports the directory itself
                if let Some(path) = e.path().filter(|p| *p != root && p.starts_with(root)) {
                    dirs.entry(path.to_path_buf()).or_default().unreadable = true;
                }
                continue;
            }
        };

        let path = entry.path();
        if let Some(parent) = path.parent().filter(|p| *p != root) {
            dirs.entry(parent.to_path_buf()).or_default().direct_entries += 1;
        }

        let file_type = entry.file_type();
        if file_type.is_dir() {
            dirs.entry(path.to_path_buf()).or_default();
            continue;
        }
        if !file_type.is_file() {
            continue;
        }

        let size = match entry.metadata() {
            Ok(meta) => meta.len(),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Unable to stat file, skipping");
                continue;
            }
        };
        for dir in path.ancestors().skip(1) {
            if dir == root {
                break;
            }
            let stats = dirs.entry(dir.to_path_buf()).or_default();
            stats.total_size += size;
            stats.file_count += 1;
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("Show/Season 1")).unwrap();
        fs::create_dir_all(root.join("Empty")).unwrap();
        fs::create_dir_all(root.join("Hollow/Inner")).unwrap();
        fs::write(root.join("Show/Season 1/ep1.mkv"), vec![0u8; 300]).unwrap();
        fs::write(root.join("Show/Season 1/ep2.mkv"), vec![0u8; 200]).unwrap();
        fs::write(root.join("Show/poster.jpg"), vec![0u8; 50]).unwrap();
        fs::write(root.join("top.nfo"), b"x").unwrap();
        temp
    }

    fn paths(records: &[DirectoryRecord], root: &Path) -> Vec<PathBuf> {
        records
            .iter()
            .map(|r| r.path.strip_prefix(root).unwrap().to_path_buf())
            .collect()
    }

    #[test]
    fn test_directories_roll_up_recursively() {
        let temp = tree();
        let root = temp.path();
        let dirs = DirectoryAggregator::new(ManifestIndex::default())
            .get_directories(root)
            .unwrap();

        assert_eq!(
            paths(&dirs, root),
            vec![
                PathBuf::from("Empty"),
                PathBuf::from("Hollow"),
                PathBuf::from("Hollow/Inner"),
                PathBuf::from("Show"),
                PathBuf::from("Show/Season 1"),
            ]
        );
        let show = &dirs[3];
        assert_eq!(show.total_size_bytes, 550);
        assert_eq!(show.file_count, 3);
        assert_eq!(dirs[4].total_size_bytes, 500);
        assert!(!show.folder_in_qbit);
    }

    #[test]
    fn test_empty_folders_require_no_entries() {
        let temp = tree();
        let root = temp.path();
        let empty = DirectoryAggregator::new(ManifestIndex::default())
            .get_empty_folders(root)
            .unwrap();

        // Hollow holds a subdirectory, so only its leaf is empty
        assert_eq!(
            paths(&empty, root),
            vec![PathBuf::from("Empty"), PathBuf::from("Hollow/Inner")]
        );
    }

    #[test]
    fn test_small_folders_strictly_below_threshold() {
        let temp = tree();
        let root = temp.path();
        let small = DirectoryAggregator::new(ManifestIndex::default())
            .get_small_folders(root, 500)
            .unwrap();

        assert_eq!(
            paths(&small, root),
            vec![
                PathBuf::from("Empty"),
                PathBuf::from("Hollow"),
                PathBuf::from("Hollow/Inner"),
            ]
        );
    }

    #[test]
    fn test_manifest_coverage() {
        let temp = tree();
        let root = temp.path();
        let index = ManifestIndex::from_paths([root.join("Show/Season 1/ep1.mkv")]);
        let dirs = DirectoryAggregator::new(index).get_directories(root).unwrap();

        let covered: Vec<_> = dirs
            .iter()
            .filter(|d| d.folder_in_qbit)
            .map(|d| d.path.clone())
            .collect();
        assert_eq!(covered, vec![root.join("Show"), root.join("Show/Season 1")]);
    }

    #[test]
    fn test_root_errors() {
        let temp = tree();
        let aggregator = DirectoryAggregator::new(ManifestIndex::default());

        let missing = aggregator.get_directories(&temp.path().join("nope"));
        assert!(matches!(missing, Err(JanitorError::NotFound(_))));

        let file = aggregator.get_empty_folders(&temp.path().join("top.nfo"));
        assert!(matches!(file, Err(JanitorError::NotDirectory)));
    }
}
