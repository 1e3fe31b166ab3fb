pub mod api;
pub mod cache;
pub mod config;
pub mod delete;
pub mod error;
pub mod metrics;
pub mod query;
pub mod scan;
pub mod service;
pub mod types;

pub use api::{QbitClient, TorrentSource};
pub use config::{CliArgs, Config};
pub use delete::{DeleteBatchResult, DeletionCoordinator};
pub use error::{JanitorError, JanitorResult};
pub use metrics::Metrics;
pub use query::FileFilter;
pub use service::Janitor;
pub use types::{DirectoryRecord, FileRecord};
