//! Progress-callback trait for download events.
//!
//! Inject an [`Arc<dyn FetchProgressCallback>`] via
//! [`crate::config::FetchConfigBuilder::progress_callback`] to receive events
//! while the fetcher streams a response body to disk. The CLI uses this to
//! drive a terminal progress bar; library callers can forward events to a
//! channel, a log, or nothing at all.
//!
//! # Example
//!
//! ```rust
//! use pdf_harvest::{FetchConfig, FetchProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
//!
//! struct ByteCounter {
//!     seen: AtomicU64,
//! }
//!
//! impl FetchProgressCallback for ByteCounter {
//!     fn on_bytes(&self, _url: &str, downloaded: u64, _total: Option<u64>) {
//!         self.seen.store(downloaded, Ordering::SeqCst);
//!     }
//! }
//!
//! let counter = Arc::new(ByteCounter { seen: AtomicU64::new(0) });
//!
//! let config = FetchConfig::builder()
//!     .progress_callback(counter as Arc<dyn FetchProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the fetcher as a download progresses.
///
/// Implementations must be `Send + Sync`: several documents may be fetched
/// concurrently by [`crate::harvest::process_many`] with one shared config.
/// All methods have default no-op implementations.
pub trait FetchProgressCallback: Send + Sync {
    /// Called once the response headers arrived with a success status.
    ///
    /// # Arguments
    /// * `url`: the URL being fetched
    /// * `content_length`: body size announced by the server, if any
    fn on_fetch_start(&self, url: &str, content_length: Option<u64>) {
        let _ = (url, content_length);
    }

    /// Called after each chunk is written to the temporary file.
    ///
    /// # Arguments
    /// * `url`: the URL being fetched
    /// * `downloaded`: total bytes written so far
    /// * `total`: announced body size, if any
    fn on_bytes(&self, url: &str, downloaded: u64, total: Option<u64>) {
        let _ = (url, downloaded, total);
    }

    /// Called after the file has been committed at its final path.
    fn on_fetch_complete(&self, url: &str, bytes: u64) {
        let _ = (url, bytes);
    }

    /// Called when the fetch fails for any reason.
    fn on_fetch_error(&self, url: &str, error: &str) {
        let _ = (url, error);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl FetchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::FetchConfig`].
pub type ProgressCallback = Arc<dyn FetchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        last_bytes: AtomicU64,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl FetchProgressCallback for TrackingCallback {
        fn on_fetch_start(&self, _url: &str, _content_length: Option<u64>) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_bytes(&self, _url: &str, downloaded: u64, _total: Option<u64>) {
            self.last_bytes.store(downloaded, Ordering::SeqCst);
        }

        fn on_fetch_complete(&self, _url: &str, _bytes: u64) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_fetch_error(&self, _url: &str, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_fetch_start("https://example.com/a.pdf", Some(10));
        cb.on_bytes("https://example.com/a.pdf", 5, Some(10));
        cb.on_fetch_complete("https://example.com/a.pdf", 10);
        cb.on_fetch_error("https://example.com/a.pdf", "boom");
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: AtomicUsize::new(0),
            last_bytes: AtomicU64::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };

        tracker.on_fetch_start("u", None);
        tracker.on_bytes("u", 512, None);
        tracker.on_bytes("u", 1024, None);
        tracker.on_fetch_complete("u", 1024);

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.last_bytes.load(Ordering::SeqCst), 1024);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 0);
    }
}
