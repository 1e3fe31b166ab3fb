//! WireMock helpers that answer the qBittorrent WebUI v2 endpoints.

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One torrent as served by the mock: hash, save path and relative file names.
pub struct MockTorrent {
    pub hash: &'static str,
    pub name: &'static str,
    pub save_path: String,
    pub files: Vec<&'static str>,
}

impl MockTorrent {
    pub fn info_json(&self) -> serde_json::Value {
        json!({
            "hash": self.hash,
            "name": self.name,
            "size": 1024,
            "progress": 1.0,
            "save_path": self.save_path,
            "tags": "tv, keep",
            "category": "tv",
            "state": "uploading",
            "dlspeed": 0,
            "upspeed": 0,
            "eta": 8640000,
            "content_path": format!("{}/{}", self.save_path, self.name),
            "total_size": 1024
        })
    }

    pub fn files_json(&self) -> serde_json::Value {
        let files: Vec<_> = self
            .files
            .iter()
            .enumerate()
            .map(|(index, name)| {
                json!({
                    "index": index,
                    "name": name,
                    "size": 512,
                    "progress": 1.0,
                    "priority": 1,
                    "is_seed": true,
                    "availability": -1
                })
            })
            .collect();
        json!(files)
    }
}

/// Mount the version, torrent list and per-torrent file endpoints.
///
/// The torrent list is expected exactly `list_calls` times; the server
/// verifies this when dropped.
pub async fn mount_qbit_api(server: &MockServer, torrents: &[MockTorrent], list_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/api/v2/app/version"))
        .respond_with(ResponseTemplate::new(200).set_body_string("v4.6.3"))
        .mount(server)
        .await;

    let list: Vec<_> = torrents.iter().map(MockTorrent::info_json).collect();
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .and(query_param("filter", "all"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(list)))
        .expect(list_calls)
        .mount(server)
        .await;

    for torrent in torrents {
        Mock::given(method("GET"))
            .and(path("/api/v2/torrents/files"))
            .and(query_param("hash", torrent.hash))
            .respond_with(ResponseTemplate::new(200).set_body_json(torrent.files_json()))
            .mount(server)
            .await;
    }
}

/// Mount a torrent list whose file listing always fails with `status`.
pub async fn mount_broken_files_endpoint(server: &MockServer, torrent: &MockTorrent, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([torrent.info_json()])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v2/torrents/files"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
