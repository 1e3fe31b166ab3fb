//! In-memory [`TorrentSource`] for unit tests.

use crate::api::{TorrentFile, TorrentFilter, TorrentInfo, TorrentSource};
use crate::error::{JanitorError, JanitorResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
pub struct FakeSource {
    pub torrents: Vec<TorrentInfo>,
    pub files: HashMap<String, Vec<TorrentFile>>,
    pub list_calls: AtomicUsize,
    pub file_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_torrent(mut self, info: TorrentInfo, files: Vec<TorrentFile>) -> Self {
        self.files.insert(info.hash.clone(), files);
        self.torrents.push(info);
        self
    }
}

impl TorrentSource for FakeSource {
    async fn list_torrents(&self, _filter: TorrentFilter) -> JanitorResult<Vec<TorrentInfo>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.torrents.clone())
    }

    async fn list_files(&self, hash: &str) -> JanitorResult<Vec<TorrentFile>> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        self.files
            .get(hash)
            .cloned()
            .ok_or_else(|| JanitorError::NotFound(format!("torrent {}", hash)))
    }
}

pub fn torrent(hash: &str, save_path: &str) -> TorrentInfo {
    TorrentInfo {
        hash: hash.to_string(),
        save_path: save_path.to_string(),
        ..Default::default()
    }
}

pub fn file(name: &str) -> TorrentFile {
    TorrentFile {
        name: name.to_string(),
        ..Default::default()
    }
}
