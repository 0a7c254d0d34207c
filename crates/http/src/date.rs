//! HTTP date header value management.
//!
//! The teacher's async `DateService` refreshed a cached RFC-1123 string
//! every 700ms from a tokio task to avoid reformatting on every request.
//! There is no async runtime here, so the same idea is expressed as a
//! detached `std::thread` updating an `ArcSwap<String>`; readers never block
//! on the writer.

use arc_swap::ArcSwap;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime};

/// Formats `time` as an RFC-1123 GMT date string, e.g. `Tue, 15 Nov 1994 08:12:31 GMT`.
pub fn format_http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// Background service maintaining an always-fresh RFC-1123 date string.
///
/// Used by the response framer (§4.8) so every response can read `Date:`
/// (and the identical `Expires:`) without formatting a timestamp per request.
pub struct DateService {
    current: Arc<ArcSwap<String>>,
    stop: Arc<std::sync::atomic::AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DateService {
    pub fn start() -> Self {
        let current = Arc::new(ArcSwap::new(Arc::new(format_http_date(SystemTime::now()))));
        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let current_clone = Arc::clone(&current);
        let stop_clone = Arc::clone(&stop);
        let handle = std::thread::spawn(move || {
            while !stop_clone.load(std::sync::atomic::Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(700));
                current_clone.store(Arc::new(format_http_date(SystemTime::now())));
            }
        });

        Self { current, stop, handle: Some(handle) }
    }

    pub fn current(&self) -> String {
        (**self.current.load()).clone()
    }

    /// A cheap, `Clone`-able handle onto the same cached string, for handing
    /// out to worker threads without sharing the `DateService` itself (whose
    /// `Drop` stops the refresh thread).
    pub fn reader(&self) -> DateReader {
        DateReader(Arc::clone(&self.current))
    }
}

/// Read-only view onto a [`DateService`]'s cached date string.
#[derive(Clone)]
pub struct DateReader(Arc<ArcSwap<String>>);

impl DateReader {
    pub fn current(&self) -> String {
        (**self.0.load()).clone()
    }
}

impl Drop for DateService {
    fn drop(&mut self) {
        self.stop.store(true, std::sync::atomic::Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_rfc1123() {
        let epoch = SystemTime::UNIX_EPOCH;
        assert_eq!(format_http_date(epoch), "Thu, 01 Jan 1970 00:00:00 GMT");
    }

    #[test]
    fn date_service_reports_a_current_value() {
        let service = DateService::start();
        let date = service.current();
        assert!(date.ends_with("GMT"));
    }
}
