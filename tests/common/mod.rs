//! Shared test infrastructure: a mock qBittorrent WebUI and an on-disk
//! media library with hardlinks and prefix twins.

pub mod fixtures;
pub mod mock_server;
