//! Filesystem scanning: inode grouping, partial hashing and directory rollups.

pub mod directories;
pub mod hashing;
pub mod inode;

pub use directories::DirectoryAggregator;
pub use hashing::{
    duplicate_hashes, is_comparable_hash, mark_duplicates, partial_hash, DuplicateDetector,
    HASH_ERROR,
};
pub use inode::{InodeKey, InodeMap, InodeScanner, ScanSummary, ScannedFile};

use crate::types::{FileRecord, ManifestIndex};
use std::collections::HashMap;

/// Flatten inode groups into one record per path, sorted by path.
///
/// Groups missing from `hashes` get an empty hash (hashing skipped).
/// Duplicate flags are computed here from the same groups.
pub fn build_records(
    map: &InodeMap,
    hashes: &HashMap<InodeKey, String>,
    index: &ManifestIndex,
) -> Vec<FileRecord> {
    let mut records = Vec::with_capacity(map.values().map(Vec::len).sum());
    for (key, files) in map {
        let inode_id = key.to_string();
        let hash = hashes.get(key).cloned().unwrap_or_default();
        let is_hardlink = files.len() > 1;
        for file in files {
            let mut record = FileRecord::new(
                file.path.clone(),
                inode_id.clone(),
                file.size,
                is_hardlink,
                hash.clone(),
            );
            record.in_qbit = index.contains_file(&record.path);
            record.folder_in_qbit = index.folder_in_qbit(&record.folder_path);
            records.push(record);
        }
    }
    mark_duplicates(&mut records);
    records.sort_by(|a, b| a.path.cmp(&b.path));
    records
}
