//! Scope and flag filters over file records, plus column sorting.

use crate::error::{JanitorError, JanitorResult};
use crate::types::FileRecord;
use std::cmp::Ordering;
use std::path::Path;
use std::str::FromStr;
use strum::{Display, EnumString};

/// Optional exact-match predicates. `None` disables a predicate; the rest
/// are combined with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileFilter {
    pub hardlink: Option<bool>,
    pub in_qbit: Option<bool>,
    pub folder_in_qbit: Option<bool>,
    pub hash_duplicate: Option<bool>,
}

impl FileFilter {
    pub fn matches(&self, record: &FileRecord) -> bool {
        fn check(want: Option<bool>, actual: bool) -> bool {
            want.map_or(true, |w| w == actual)
        }
        check(self.hardlink, record.is_hardlink)
            && check(self.in_qbit, record.in_qbit)
            && check(self.folder_in_qbit, record.folder_in_qbit)
            && check(self.hash_duplicate, record.hash_duplicate)
    }

    /// Keep records whose folder is `scope` or below it and that match every
    /// set predicate. Scope matching is by path component, so `/a/b` does not
    /// include `/a/bc`. Order is preserved.
    pub fn apply<I>(&self, records: I, scope: &Path) -> Vec<FileRecord>
    where
        I: IntoIterator<Item = FileRecord>,
    {
        records
            .into_iter()
            .filter(|r| r.folder_path.starts_with(scope) && self.matches(r))
            .collect()
    }
}

/// Sortable record columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum SortColumn {
    Path,
    Size,
    Folder,
    Inode,
    Hash,
}

type Comparator = fn(&FileRecord, &FileRecord) -> Ordering;

impl SortColumn {
    pub fn parse(name: &str) -> JanitorResult<Self> {
        SortColumn::from_str(&name.to_ascii_lowercase())
            .map_err(|_| JanitorError::InvalidArgument(format!("unknown sort column '{}'", name)))
    }

    fn comparator(self) -> Comparator {
        match self {
            SortColumn::Path => |a: &FileRecord, b: &FileRecord| a.path.cmp(&b.path),
            SortColumn::Size => |a: &FileRecord, b: &FileRecord| a.size_bytes.cmp(&b.size_bytes),
            SortColumn::Folder => |a: &FileRecord, b: &FileRecord| a.folder_path.cmp(&b.folder_path),
            SortColumn::Inode => |a: &FileRecord, b: &FileRecord| a.inode_id.cmp(&b.inode_id),
            SortColumn::Hash => |a: &FileRecord, b: &FileRecord| a.partial_hash.cmp(&b.partial_hash),
        }
    }
}

/// Stable sort by `column`, ties broken by path ascending.
pub fn sort_records(records: &mut [FileRecord], column: SortColumn, descending: bool) {
    let cmp = column.comparator();
    records.sort_by(|a, b| {
        let primary = if descending { cmp(b, a) } else { cmp(a, b) };
        primary.then_with(|| a.path.cmp(&b.path))
    });
}
