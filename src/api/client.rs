use crate::api::types::*;
use crate::config::ApiConfig;
use crate::error::{JanitorError, JanitorResult};
use crate::metrics::ApiMetrics;
use base64::Engine;
use reqwest::{Client, StatusCode};

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, instrument, trace, warn};

/// Source of the download client's torrent manifest.
///
/// The caches depend on this seam rather than on the HTTP client so they can
/// be driven by an in-process fake.
pub trait TorrentSource: Send + Sync {
    /// List managed torrents matching `filter`.
    fn list_torrents(
        &self,
        filter: TorrentFilter,
    ) -> impl Future<Output = JanitorResult<Vec<TorrentInfo>>> + Send;

    /// List the files of one torrent, paths relative to its save path.
    fn list_files(&self, hash: &str) -> impl Future<Output = JanitorResult<Vec<TorrentFile>>> + Send;
}

/// HTTP client for the qBittorrent WebUI API (v2)
pub struct QbitClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
    auth_credentials: Option<(String, String)>,
    metrics: Option<Arc<ApiMetrics>>,
}

impl QbitClient {
    /// Create a new QbitClient with custom retry configuration
    pub fn with_config(
        base_url: String,
        max_retries: u32,
        retry_delay: Duration,
        timeout: Duration,
        auth_credentials: Option<(String, String)>,
        metrics: Option<Arc<ApiMetrics>>,
    ) -> JanitorResult<Self> {
        // Fail fast on invalid URL
        let _ = reqwest::Url::parse(&base_url)
            .map_err(|e| JanitorError::InvalidArgument(format!("Invalid URL: {}", e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| JanitorError::IoError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_retries,
            retry_delay,
            auth_credentials,
            metrics,
        })
    }

    /// Create Authorization header for HTTP Basic Auth
    fn create_auth_header(&self) -> Option<String> {
        self.auth_credentials.as_ref().map(|(username, password)| {
            let credentials = format!("{}:{}", username, password);
            let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
            format!("Basic {}", encoded)
        })
    }

    /// Execute request with automatic retry for transient failures
    async fn execute_with_retry<F, Fut>(
        &self,
        endpoint: &str,
        operation: F,
    ) -> JanitorResult<reqwest::Response>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = reqwest::Result<reqwest::Response>>,
    {
        let started = Instant::now();
        if let Some(metrics) = &self.metrics {
            metrics.record_request(endpoint);
        }

        let mut attempt = 0;
        let result = loop {
            match operation().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_server_error() && attempt < self.max_retries {
                        warn!(
                            endpoint,
                            status = status.as_u16(),
                            attempt = attempt + 1,
                            "Server error, retrying"
                        );
                        self.note_retry(endpoint, attempt);
                        sleep(self.retry_delay * (attempt + 1)).await;
                        attempt += 1;
                        continue;
                    }

                    if status == StatusCode::TOO_MANY_REQUESTS && attempt < self.max_retries {
                        let retry_after = response
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or_else(|| self.retry_delay * (attempt + 1));

                        warn!(
                            endpoint,
                            retry_after_secs = retry_after.as_secs(),
                            attempt = attempt + 1,
                            "Rate limited"
                        );
                        self.note_retry(endpoint, attempt);
                        sleep(retry_after).await;
                        attempt += 1;
                        continue;
                    }

                    break Ok(response);
                }
                Err(e) => {
                    let api_error: JanitorError = e.into();
                    if api_error.is_transient() && attempt < self.max_retries {
                        warn!(endpoint, attempt = attempt + 1, error = %api_error, "Retrying");
                        self.note_retry(endpoint, attempt);
                        sleep(self.retry_delay * (attempt + 1)).await;
                        attempt += 1;
                    } else {
                        break Err(api_error);
                    }
                }
            }
        };

        if let Some(metrics) = &self.metrics {
            match &result {
                Ok(_) => metrics.record_success(endpoint, started.elapsed()),
                Err(e) => metrics.record_failure(endpoint, &e.to_string()),
            }
        }
        result
    }

    fn note_retry(&self, endpoint: &str, attempt: u32) {
        if let Some(metrics) = &self.metrics {
            metrics.record_retry(endpoint, attempt + 1);
        }
    }

    /// Helper to check response status and convert errors
    async fn check_response(&self, response: reqwest::Response) -> JanitorResult<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let message = response.text().await.unwrap_or_default();
            Err(JanitorError::PermissionDenied(format!(
                "Authentication failed: {}",
                if message.is_empty() {
                    "Invalid credentials".to_string()
                } else {
                    message
                }
            )))
        } else {
            let message = response.text().await.map_err(|e| {
                JanitorError::NetworkError(format!("Failed to read error response body: {}", e))
            })?;
            Err(JanitorError::ApiError {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Generic GET request with query parameters that returns JSON
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> JanitorResult<T> {
        let url = format!("{}{}", self.base_url, endpoint);
        let response = self
            .execute_with_retry(endpoint, || {
                let mut req = self.client.get(&url).query(query);
                if let Some(auth_header) = self.create_auth_header() {
                    req = req.header("Authorization", auth_header);
                }
                req.send()
            })
            .await?;
        let response = self.check_response(response).await?;
        Ok(response.json().await?)
    }

    /// Fetch all torrents matching `filter`
    #[instrument(skip(self), fields(api_op = "torrents_info"))]
    pub async fn get_torrents(&self, filter: TorrentFilter) -> JanitorResult<Vec<TorrentInfo>> {
        let filter = filter.to_string();
        let torrents: Vec<TorrentInfo> = self
            .get_json("/api/v2/torrents/info", &[("filter", filter.as_str())])
            .await?;
        debug!(api_op = "torrents_info", count = torrents.len());
        Ok(torrents)
    }

    /// Fetch the full file list for a torrent
    #[instrument(skip(self), fields(api_op = "torrents_files"))]
    pub async fn get_files(&self, hash: &str) -> JanitorResult<Vec<TorrentFile>> {
        trace!(api_op = "torrents_files", hash = hash);

        match self
            .get_json::<Vec<TorrentFile>>("/api/v2/torrents/files", &[("hash", hash)])
            .await
        {
            Ok(files) => {
                debug!(api_op = "torrents_files", hash = hash, count = files.len());
                Ok(files)
            }
            Err(JanitorError::ApiError { status: 404, .. }) => {
                Err(JanitorError::NotFound(format!("torrent {}", hash)))
            }
            Err(e) => Err(e),
        }
    }

    /// Check if the WebUI answers at all, using a short timeout. An
    /// unreachable client is `Ok(false)`; any other failure is returned.
    pub async fn health_check(&self) -> JanitorResult<bool> {
        let url = format!("{}/api/v2/app/version", self.base_url);

        let health_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| JanitorError::IoError(format!("Failed to build health check client: {}", e)))?;

        let mut req = health_client.get(&url);
        if let Some(auth_header) = self.create_auth_header() {
            req = req.header("Authorization", auth_header);
        }

        match req.send().await {
            Ok(response) if response.status().is_success() => Ok(true),
            Ok(response) => {
                warn!("Health check returned status: {}", response.status());
                Ok(false)
            }
            Err(e) => {
                let api_error: JanitorError = e.into();
                if api_error.is_server_unavailable() {
                    warn!("Health check failed: {}", api_error);
                    Ok(false)
                } else {
                    Err(api_error)
                }
            }
        }
    }
}

impl TorrentSource for QbitClient {
    async fn list_torrents(&self, filter: TorrentFilter) -> JanitorResult<Vec<TorrentInfo>> {
        self.get_torrents(filter).await
    }

    async fn list_files(&self, hash: &str) -> JanitorResult<Vec<TorrentFile>> {
        self.get_files(hash).await
    }
}

/// Create a QbitClient from configuration, with Basic auth when both
/// username and password are set.
pub fn create_api_client(
    api_config: &ApiConfig,
    metrics: Option<Arc<ApiMetrics>>,
) -> JanitorResult<QbitClient> {
    let credentials = match (&api_config.username, &api_config.password) {
        (Some(username), Some(password)) => Some((username.clone(), password.clone())),
        _ => None,
    };
    QbitClient::with_config(
        api_config.url.clone(),
        api_config.max_retries,
        api_config.retry_delay(),
        api_config.timeout(),
        credentials,
        metrics,
    )
}
