//! Lookup index over the flattened torrent file manifest.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Answers "is this path or folder managed by the download client" in O(depth).
#[derive(Debug, Clone, Default)]
pub struct ManifestIndex {
    files: HashSet<PathBuf>,
    /// Direct parent of every manifest file
    file_dirs: HashSet<PathBuf>,
    /// Every ancestor directory of every manifest file
    covered_dirs: HashSet<PathBuf>,
}

impl ManifestIndex {
    pub fn from_paths<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut index = Self::default();
        for path in paths {
            let path = path.as_ref();
            if let Some(parent) = path.parent() {
                index.file_dirs.insert(parent.to_path_buf());
                for dir in parent.ancestors() {
                    if !index.covered_dirs.insert(dir.to_path_buf()) {
                        // Everything above was inserted by an earlier sibling
                        break;
                    }
                }
            }
            index.files.insert(path.to_path_buf());
        }
        index
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Path appears verbatim in the manifest.
    pub fn contains_file(&self, path: &Path) -> bool {
        self.files.contains(path)
    }

    /// Some manifest file lives in `dir` or below it.
    pub fn covers_dir(&self, dir: &Path) -> bool {
        self.covered_dirs.contains(dir)
    }

    /// Some manifest file's directory equals `folder`, lies below it, or
    /// contains it.
    ///
    /// The "contains" direction is what marks an `extra/` folder beside a
    /// torrent's files as covered. It also means a single-file torrent saved
    /// directly into a category root (`/torrent/Film/movie.mkv`) covers every
    /// folder under `/torrent/Film`.
    pub fn folder_in_qbit(&self, folder: &Path) -> bool {
        self.covers_dir(folder) || folder.ancestors().any(|dir| self.file_dirs.contains(dir))
    }
}
