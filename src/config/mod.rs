//! Configuration management for CLI, environment variables, and config files.

use crate::error::{JanitorError, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Upper bound on the partial-hash byte budget.
pub const MAX_HASH_BYTES: usize = 64 * 1024 * 1024;

/// Main configuration for qbit-janitor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Configuration for the qBittorrent WebUI connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
    pub max_concurrent_requests: usize,
}

/// Configuration for the filesystem scan and duplicate detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub roots: Vec<PathBuf>,
    pub hash_check: bool,
    pub hash_bytes: usize,
    pub max_concurrent_hashes: usize,
    pub small_folder_threshold: u64,
}

/// Configuration for on-disk snapshot caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
}

/// Configuration for logging output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8080".to_string(),
            username: None,
            password: None,
            max_retries: 3,
            retry_delay_ms: 500,
            timeout_secs: 30,
            max_concurrent_requests: 6,
        }
    }
}

impl ApiConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("/torrent/TV"), PathBuf::from("/torrent/Film")],
            hash_check: true,
            hash_bytes: 8 * 1024 * 1024,
            max_concurrent_hashes: 16,
            small_folder_threshold: 10 * 1024 * 1024,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/qbit_data"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str) -> Result<T, JanitorError> {
    val.trim()
        .parse()
        .map_err(|_| JanitorError::InvalidArgument(format!("{} has invalid format", name)))
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &PathBuf) -> Result<Self, JanitorError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| JanitorError::IoError(e.to_string()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        match ext.as_deref() {
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| JanitorError::ParseError(e.to_string())),
            _ => toml::from_str(&content).map_err(|e| JanitorError::ParseError(e.to_string())),
        }
    }

    pub fn from_default_locations() -> Result<Self, JanitorError> {
        let config_dirs = [
            dirs::config_dir().map(|d| d.join("qbit-janitor/config.toml")),
            Some(PathBuf::from("/etc/qbit-janitor/config.toml")),
            Some(PathBuf::from("./qbit-janitor.toml")),
        ];

        for path in config_dirs.iter().flatten() {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    pub fn merge_from_env(mut self) -> Result<Self, JanitorError> {
        if let Ok(val) = std::env::var("QBIT_JANITOR_API_URL") {
            self.api.url = val;
        }
        if let Ok(val) = std::env::var("QBIT_JANITOR_ROOTS") {
            self.scan.roots = std::env::split_paths(&val)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Ok(val) = std::env::var("QBIT_JANITOR_CACHE_DIR") {
            self.cache.dir = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("QBIT_JANITOR_HASH_BYTES") {
            self.scan.hash_bytes = parse_env("QBIT_JANITOR_HASH_BYTES", &val)?;
        }
        if let Ok(val) = std::env::var("QBIT_JANITOR_MAX_CONCURRENT_HASHES") {
            self.scan.max_concurrent_hashes =
                parse_env("QBIT_JANITOR_MAX_CONCURRENT_HASHES", &val)?;
        }
        if let Ok(val) = std::env::var("QBIT_JANITOR_LOG_LEVEL") {
            self.logging.level = val;
        }

        // Auth credentials - support both individual fields and combined format
        if let Ok(auth_str) = std::env::var("QBIT_JANITOR_AUTH_USERPASS") {
            if let Some((username, password)) = auth_str.split_once(':') {
                self.api.username = Some(username.to_string());
                self.api.password = Some(password.to_string());
            }
        } else {
            if let Ok(val) = std::env::var("QBIT_JANITOR_USERNAME") {
                self.api.username = Some(val);
            }
            if let Ok(val) = std::env::var("QBIT_JANITOR_PASSWORD") {
                self.api.password = Some(val);
            }
        }

        Ok(self)
    }

    pub fn merge_from_cli(mut self, cli: &CliArgs) -> Self {
        if let Some(ref url) = cli.api_url {
            self.api.url = url.clone();
        }
        if let Some(ref username) = cli.username {
            self.api.username = Some(username.clone());
        }
        if let Some(ref password) = cli.password {
            self.api.password = Some(password.clone());
        }
        if !cli.roots.is_empty() {
            self.scan.roots = cli.roots.clone();
        }
        if let Some(ref dir) = cli.cache_dir {
            self.cache.dir = dir.clone();
        }
        if cli.no_hash {
            self.scan.hash_check = false;
        }

        self
    }

    pub fn load_with_cli(cli: &CliArgs) -> Result<Self, JanitorError> {
        let base = match cli.config_file {
            Some(ref path) => Self::from_file(path)?,
            None => Self::from_default_locations()?,
        };
        Ok(base.merge_from_env()?.merge_from_cli(cli))
    }

    pub fn validate(&self) -> Result<(), JanitorError> {
        let mut issues = Vec::new();

        if self.api.url.is_empty() {
            issues.push(ValidationIssue::new("api.url", "URL cannot be empty"));
        } else if let Err(e) = reqwest::Url::parse(&self.api.url) {
            issues.push(ValidationIssue::new(
                "api.url",
                format!("Invalid URL format: {}", e),
            ));
        }

        if self.api.max_concurrent_requests == 0 {
            issues.push(ValidationIssue::new(
                "api.max_concurrent_requests",
                "Must be at least 1",
            ));
        }

        if self.scan.roots.is_empty() {
            issues.push(ValidationIssue::new(
                "scan.roots",
                "At least one scan root is required",
            ));
        }
        for root in self.scan.roots.iter().filter(|r| !r.is_absolute()) {
            issues.push(ValidationIssue::new(
                "scan.roots",
                format!("Scan root must be an absolute path: {}", root.display()),
            ));
        }

        if self.scan.hash_bytes == 0 || self.scan.hash_bytes > MAX_HASH_BYTES {
            issues.push(ValidationIssue::new(
                "scan.hash_bytes",
                format!("Must be between 1 and {} bytes", MAX_HASH_BYTES),
            ));
        }

        if self.scan.max_concurrent_hashes == 0 || self.scan.max_concurrent_hashes > 256 {
            issues.push(ValidationIssue::new(
                "scan.max_concurrent_hashes",
                "Must be between 1 and 256",
            ));
        }

        if !self.cache.dir.is_absolute() {
            issues.push(ValidationIssue::new(
                "cache.dir",
                "Cache directory must be an absolute path",
            ));
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            issues.push(ValidationIssue::new(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Valid levels: {}",
                    self.logging.level,
                    valid_levels.join(", ")
                ),
            ));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(JanitorError::ValidationError(issues))
        }
    }
}

/// Command-line arguments that override configuration values.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub api_url: Option<String>,
    pub config_file: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub roots: Vec<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub no_hash: bool,
}
