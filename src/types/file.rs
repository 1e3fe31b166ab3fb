use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MIB: f64 = 1024.0 * 1024.0;

/// One scanned file path with its hardlink, duplicate and torrent flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: PathBuf,
    /// `"{device}:{inode}"`, shared by every hardlink of one physical file
    pub inode_id: String,
    pub size_bytes: u64,
    pub is_hardlink: bool,
    /// Empty when hashing was skipped, `"error"` when the read failed
    pub partial_hash: String,
    pub hash_duplicate: bool,
    pub folder_path: PathBuf,
    pub folder_name: String,
    pub in_qbit: bool,
    pub folder_in_qbit: bool,
}

impl FileRecord {
    /// Build a record, deriving the folder fields from `path`. Torrent and
    /// duplicate flags start cleared.
    pub fn new(
        path: PathBuf,
        inode_id: String,
        size_bytes: u64,
        is_hardlink: bool,
        partial_hash: String,
    ) -> Self {
        let folder_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let folder_name = folder_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            inode_id,
            size_bytes,
            is_hardlink,
            partial_hash,
            hash_duplicate: false,
            folder_path,
            folder_name,
            in_qbit: false,
            folder_in_qbit: false,
        }
    }

    pub fn size_gb(&self) -> f64 {
        (self.size_bytes as f64 / MIB / 1024.0 * 100.0).round() / 100.0
    }
}
