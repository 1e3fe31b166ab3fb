//! Core record types shared by the scanner, caches and query layer.

pub mod directory;
pub mod file;
pub mod manifest;

pub use directory::DirectoryRecord;
pub use file::FileRecord;
pub use manifest::ManifestIndex;
