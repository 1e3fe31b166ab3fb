use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Torrent list filter understood by `/api/v2/torrents/info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum TorrentFilter {
    #[default]
    All,
    Downloading,
    Seeding,
    Completed,
    Paused,
    Active,
    Inactive,
    Stalled,
    Errored,
}

/// One managed torrent, as returned by `/api/v2/torrents/info`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentInfo {
    pub hash: String,
    pub name: String,
    /// Selected size in bytes
    pub size: i64,
    /// 0..1
    pub progress: f64,
    pub save_path: String,
    /// Comma-separated
    pub tags: String,
    pub category: String,
    pub state: String,
    pub dlspeed: i64,
    pub upspeed: i64,
    pub eta: i64,
    pub content_path: String,
    pub total_size: i64,
}

impl TorrentInfo {
    /// Tags split on commas, trimmed, empties dropped.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn percent(&self) -> f64 {
        (self.progress * 10_000.0).round() / 100.0
    }

    pub fn total_size_gb(&self) -> f64 {
        let gb = self.total_size as f64 / (1024.0 * 1024.0 * 1024.0);
        (gb * 100.0).round() / 100.0
    }
}

/// One file inside a torrent, as returned by `/api/v2/torrents/files`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TorrentFile {
    pub index: i64,
    /// Path relative to the torrent's save path
    pub name: String,
    pub size: i64,
    pub progress: f64,
    pub priority: i64,
    pub availability: Option<f64>,
    pub is_seed: Option<bool>,
    pub piece_range: Option<Vec<i64>>,
}

impl TorrentFile {
    pub fn percent(&self) -> f64 {
        (self.progress * 10_000.0).round() / 100.0
    }
}
