//! Transfer statistics
//!
//! Counts what a CLI session actually did - API calls, retries, files and
//! bytes moved, failures - and renders a summary for the end of the run.
//! Counters are atomic so the client can bump them from anywhere without
//! locking.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared statistics collector
#[derive(Clone)]
pub struct TransferStats {
    inner: Arc<Inner>,
}

struct Inner {
    api_requests: AtomicU64,
    retries: AtomicU64,
    files_downloaded: AtomicU64,
    bytes_downloaded: AtomicU64,
    files_uploaded: AtomicU64,
    bytes_uploaded: AtomicU64,
    failures: AtomicU64,
    started: Instant,
}

impl Default for TransferStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TransferStats {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                api_requests: AtomicU64::new(0),
                retries: AtomicU64::new(0),
                files_downloaded: AtomicU64::new(0),
                bytes_downloaded: AtomicU64::new(0),
                files_uploaded: AtomicU64::new(0),
                bytes_uploaded: AtomicU64::new(0),
                failures: AtomicU64::new(0),
                started: Instant::now(),
            }),
        }
    }

    pub fn record_request(&self) {
        self.inner.api_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.inner.retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_download(&self, bytes: u64) {
        self.inner.files_downloaded.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_upload(&self, bytes: u64) {
        self.inner.files_uploaded.fetch_add(1, Ordering::Relaxed);
        self.inner.bytes_uploaded.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.inner.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn api_requests(&self) -> u64 {
        self.inner.api_requests.load(Ordering::Relaxed)
    }

    pub fn files_downloaded(&self) -> u64 {
        self.inner.files_downloaded.load(Ordering::Relaxed)
    }

    pub fn files_uploaded(&self) -> u64 {
        self.inner.files_uploaded.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    /// End-of-run summary for the terminal
    pub fn summary(&self) -> String {
        let i = &self.inner;
        let elapsed = i.started.elapsed().as_secs_f64();
        format!(
            "\n  API requests:  {} ({} retried)\n  Downloaded:    {} file(s), {}\n  Uploaded:      {} file(s), {}\n  Failures:      {}\n  Elapsed:       {:.1}s\n",
            i.api_requests.load(Ordering::Relaxed),
            i.retries.load(Ordering::Relaxed),
            i.files_downloaded.load(Ordering::Relaxed),
            human_bytes(i.bytes_downloaded.load(Ordering::Relaxed)),
            i.files_uploaded.load(Ordering::Relaxed),
            human_bytes(i.bytes_uploaded.load(Ordering::Relaxed)),
            i.failures.load(Ordering::Relaxed),
            elapsed,
        )
    }
}

/// Render a byte count with a binary unit suffix
fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = TransferStats::new();
        stats.record_request();
        stats.record_request();
        stats.record_retry();
        stats.record_download(2048);
        stats.record_failure();

        assert_eq!(stats.api_requests(), 2);
        assert_eq!(stats.files_downloaded(), 1);
        assert_eq!(stats.failures(), 1);
    }

    #[test]
    fn test_shared_across_clones() {
        let stats = TransferStats::new();
        let other = stats.clone();
        other.record_upload(100);
        assert_eq!(stats.files_uploaded(), 1);
    }

    #[test]
    fn test_human_bytes() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.0 KiB");
        assert_eq!(human_bytes(5 * 1024 * 1024), "5.0 MiB");
    }

    #[test]
    fn test_summary_contains_counts() {
        let stats = TransferStats::new();
        stats.record_download(1024);
        let summary = stats.summary();
        assert!(summary.contains("Downloaded"));
        assert!(summary.contains("1 file(s)"));
    }
}
