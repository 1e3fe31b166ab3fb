//! A small media library on disk.
//!
//! ```text
//! TV/a.mkv              hardlink of TV/b.mkv
//! TV/b.mkv
//! TV/c.mkv              same first MiB as a.mkv, different inode
//! TV/Show/ep1.mkv       listed by the download client
//! TV/Show/extra/ep1.mkv copy, not listed
//! Film/Movie/movie.mkv  listed by the download client
//! Film/Empty/
//! ```

use crate::common::mock_server::MockTorrent;
use qbit_janitor::Config;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const PREFIX_LEN: usize = 1024 * 1024;

pub struct MediaLibrary {
    _temp: TempDir,
    pub tv: PathBuf,
    pub film: PathBuf,
    pub cache_dir: PathBuf,
}

impl MediaLibrary {
    pub fn build() -> Self {
        let temp = TempDir::new().unwrap();
        let tv = temp.path().join("TV");
        let film = temp.path().join("Film");
        fs::create_dir_all(tv.join("Show/extra")).unwrap();
        fs::create_dir_all(film.join("Movie")).unwrap();
        fs::create_dir_all(film.join("Empty")).unwrap();

        let prefix = vec![0x5au8; PREFIX_LEN];
        fs::write(tv.join("a.mkv"), [prefix.as_slice(), b"first tail"].concat()).unwrap();
        fs::hard_link(tv.join("a.mkv"), tv.join("b.mkv")).unwrap();
        fs::write(tv.join("c.mkv"), [prefix.as_slice(), b"other tail"].concat()).unwrap();

        fs::write(tv.join("Show/ep1.mkv"), b"pilot episode").unwrap();
        fs::write(tv.join("Show/extra/ep1.mkv"), b"pilot episode, recut").unwrap();
        fs::write(film.join("Movie/movie.mkv"), vec![1u8; 4096]).unwrap();

        let cache_dir = temp.path().join("qbit_data");
        Self {
            _temp: temp,
            tv,
            film,
            cache_dir,
        }
    }

    pub fn torrents(&self) -> Vec<MockTorrent> {
        vec![
            MockTorrent {
                hash: "8c4a1f0e2b",
                name: "Show",
                save_path: self.tv.join("Show").to_string_lossy().into_owned(),
                files: vec!["ep1.mkv"],
            },
            MockTorrent {
                hash: "f00dfeed01",
                name: "Movie",
                save_path: self.film.to_string_lossy().into_owned(),
                files: vec!["Movie/movie.mkv"],
            },
        ]
    }

    pub fn config(&self, api_url: &str) -> Config {
        let mut config = Config::default();
        config.api.url = api_url.to_string();
        config.api.max_retries = 0;
        config.api.retry_delay_ms = 10;
        config.scan.roots = vec![self.tv.clone(), self.film.clone()];
        config.scan.hash_bytes = PREFIX_LEN;
        config.scan.max_concurrent_hashes = 4;
        config.cache.dir = self.cache_dir.clone();
        config
    }
}
