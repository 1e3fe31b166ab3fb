//! Snapshot-file caches for the torrent manifest and the file record set.
//!
//! Lock order: [`FileRecordCache`] before [`ManifestCache`].

pub mod manifest;
pub mod records;
pub mod snapshot;

pub use manifest::{ManifestCache, TORRENTS_FILE, TORRENT_FILES_FILE};
pub use records::{FileRecordCache, RecordsGuard, FILE_RECORDS_FILE};
pub use snapshot::SnapshotFile;
