use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Metrics for filesystem scans and partial hashing
#[derive(Debug, Default)]
pub struct ScanMetrics {
    /// Total number of full scans performed
    pub scan_count: AtomicU64,
    /// Regular files successfully stat'd
    pub files_scanned: AtomicU64,
    /// Entries skipped because they could not be read or stat'd
    pub stat_failures: AtomicU64,
    /// Distinct (device, inode) groups seen
    pub inode_groups: AtomicU64,
    /// Inode groups whose representative was hashed
    pub groups_hashed: AtomicU64,
    /// Hash attempts that produced the error sentinel
    pub hash_failures: AtomicU64,
    /// Total time spent in scans (nanoseconds)
    pub scan_latency_ns: AtomicU64,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_file(&self) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stat_failure(&self) {
        self.stat_failures.fetch_add(1, Ordering::Relaxed);
        trace!(scan_op = "stat_failure");
    }

    pub fn record_hash(&self, failed: bool) {
        self.groups_hashed.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.hash_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a completed scan with its group count and latency
    pub fn record_scan(&self, inode_groups: usize, latency: Duration) {
        self.scan_count.fetch_add(1, Ordering::Relaxed);
        self.inode_groups
            .fetch_add(inode_groups as u64, Ordering::Relaxed);
        self.scan_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        debug!(
            scan_op = "scan",
            inode_groups = inode_groups,
            latency_ms = latency.as_millis() as u64
        );
    }

    /// Average scan duration in milliseconds
    pub fn avg_scan_ms(&self) -> f64 {
        let count = self.scan_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total_ns = self.scan_latency_ns.load(Ordering::Relaxed);
        (total_ns as f64 / count as f64) / 1_000_000.0
    }

    pub fn log_summary(&self) {
        info!(
            operation = "scan_metrics_summary",
            scans = self.scan_count.load(Ordering::Relaxed),
            files_scanned = self.files_scanned.load(Ordering::Relaxed),
            stat_failures = self.stat_failures.load(Ordering::Relaxed),
            inode_groups = self.inode_groups.load(Ordering::Relaxed),
            groups_hashed = self.groups_hashed.load(Ordering::Relaxed),
            hash_failures = self.hash_failures.load(Ordering::Relaxed),
            avg_scan_ms = self.avg_scan_ms(),
        );
    }
}

/// Metrics for download-client API operations
#[derive(Debug, Default)]
pub struct ApiMetrics {
    /// Total number of API requests
    pub request_count: AtomicU64,
    /// Total number of successful responses
    pub success_count: AtomicU64,
    /// Total number of failed requests
    pub failure_count: AtomicU64,
    /// Total number of retries
    pub retry_count: AtomicU64,
    /// Total time spent in API calls (nanoseconds)
    pub total_latency_ns: AtomicU64,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, endpoint: &str) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        trace!(api_op = "request", endpoint = endpoint);
    }

    pub fn record_success(&self, endpoint: &str, latency: Duration) {
        self.success_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        trace!(
            api_op = "success",
            endpoint = endpoint,
            latency_ms = latency.as_millis() as u64
        );
    }

    pub fn record_failure(&self, endpoint: &str, error: &str) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
        trace!(api_op = "failure", endpoint = endpoint, error = error);
    }

    pub fn record_retry(&self, endpoint: &str, attempt: u32) {
        self.retry_count.fetch_add(1, Ordering::Relaxed);
        debug!(api_op = "retry", endpoint = endpoint, attempt = attempt);
    }

    /// Calculate average latency in milliseconds
    pub fn avg_latency_ms(&self) -> f64 {
        let count = self.success_count.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        let total_ns = self.total_latency_ns.load(Ordering::Relaxed);
        (total_ns as f64 / count as f64) / 1_000_000.0
    }

    /// Get success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.request_count.load(Ordering::Relaxed);
        if total == 0 {
            return 100.0;
        }
        let success = self.success_count.load(Ordering::Relaxed);
        (success as f64 / total as f64) * 100.0
    }

    pub fn log_summary(&self) {
        info!(
            operation = "api_metrics_summary",
            total_requests = self.request_count.load(Ordering::Relaxed),
            successful = self.success_count.load(Ordering::Relaxed),
            failed = self.failure_count.load(Ordering::Relaxed),
            retries = self.retry_count.load(Ordering::Relaxed),
            success_rate_pct = self.success_rate(),
            avg_latency_ms = self.avg_latency_ms(),
        );
    }
}

/// Metrics for snapshot cache operations
#[derive(Debug, Default)]
pub struct CacheMetrics {
    /// Snapshot reads that found a usable file
    pub hits: AtomicU64,
    /// Snapshot reads that had to rebuild
    pub misses: AtomicU64,
    /// Explicit clears and post-delete rewrites
    pub invalidations: AtomicU64,
}

impl CacheMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        (hits as f64 / total as f64) * 100.0
    }

    pub fn log_summary(&self) {
        info!(
            operation = "cache_metrics_summary",
            hits = self.hits.load(Ordering::Relaxed),
            misses = self.misses.load(Ordering::Relaxed),
            hit_rate_pct = self.hit_rate(),
            invalidations = self.invalidations.load(Ordering::Relaxed),
        );
    }
}

/// Combined metrics for the entire system
pub struct Metrics {
    pub scan: Arc<ScanMetrics>,
    pub api: Arc<ApiMetrics>,
    pub cache: Arc<CacheMetrics>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            scan: Arc::new(ScanMetrics::new()),
            api: Arc::new(ApiMetrics::new()),
            cache: Arc::new(CacheMetrics::new()),
            start_time: Instant::now(),
        }
    }

    /// Log a complete metrics summary
    pub fn log_full_summary(&self) {
        info!(
            "=== qbit-janitor metrics ({:.1}s) ===",
            self.elapsed().as_secs_f64()
        );
        self.scan.log_summary();
        self.api.log_summary();
        self.cache.log_summary();
    }

    /// Get elapsed time since metrics creation
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
