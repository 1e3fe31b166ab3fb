pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod types;

pub use client::{create_api_client, QbitClient, TorrentSource};
pub use types::{TorrentFile, TorrentFilter, TorrentInfo};
