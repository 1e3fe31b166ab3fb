use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Recursive rollup for one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryRecord {
    pub path: PathBuf,
    pub total_size_bytes: u64,
    pub file_count: u64,
    pub folder_in_qbit: bool,
}

impl DirectoryRecord {
    pub fn size_mb(&self) -> f64 {
        (self.total_size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }

    pub fn size_gb(&self) -> f64 {
        (self.total_size_bytes as f64 / (1024.0 * 1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}
