//! The listener handle shared with the controlling thread (§3 "Listener Handle", §4.1).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rws_http::date::DateService;
use tracing::warn;

/// How long `shutdown` waits for in-flight workers to drain before detaching
/// the accept thread instead of joining it (§4.1).
const SHUTDOWN_POLL_BUDGET: Duration = Duration::from_millis(100);
const SHUTDOWN_POLL_STEP: Duration = Duration::from_millis(1);

/// Counts in-flight workers under a mutex held only across increment/decrement,
/// with a condvar so shutdown can wait without busy-polling.
#[derive(Default)]
pub struct WorkerCounter {
    count: Mutex<usize>,
    drained: Condvar,
}

impl WorkerCounter {
    pub fn increment(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count += 1;
    }

    pub fn decrement(&self) {
        let mut count = self.count.lock().unwrap_or_else(|e| e.into_inner());
        *count -= 1;
        if *count == 0 {
            self.drained.notify_all();
        }
    }

    pub fn current(&self) -> usize {
        *self.count.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// An RAII guard that decrements a [`WorkerCounter`] when a worker thread
/// exits, replacing the source's manual decrement with ordinary `Drop`.
pub struct WorkerGuard(Arc<WorkerCounter>);

impl WorkerGuard {
    pub fn new(counter: Arc<WorkerCounter>) -> Self {
        counter.increment();
        Self(counter)
    }
}

impl Drop for WorkerGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Handle returned by [`crate::listener::Listener::start`]; the controlling
/// thread uses it to observe listener state and request shutdown.
pub struct ListenerHandle {
    pub(crate) running: Arc<AtomicBool>,
    pub(crate) exit_now: Arc<AtomicBool>,
    pub(crate) worker_counter: Arc<WorkerCounter>,
    pub(crate) accept_thread: Option<JoinHandle<()>>,
    pub(crate) local_addr: Option<std::net::SocketAddr>,
    /// Kept alive for the handle's lifetime so the `Date`/`Expires` refresh
    /// thread stops (via `Drop`) when the listener is torn down. `None` when
    /// binding never succeeded.
    pub(crate) date_service: Option<DateService>,
}

impl ListenerHandle {
    /// `true` once the bind succeeded and the accept loop is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// The bound local address, once binding has succeeded.
    pub fn local_addr(&self) -> Option<std::net::SocketAddr> {
        self.local_addr
    }

    pub fn worker_count(&self) -> usize {
        self.worker_counter.current()
    }

    /// Initiates graceful shutdown: sets `exit_now` (observed by the accept
    /// loop's next poll-timeout tick, per §5's "poll with a configured
    /// timeout" suspension point), then waits up to 100ms for the accept
    /// thread to notice and drain. If the deadline is exceeded, the accept
    /// thread is detached (not joined) rather than blocking forever.
    pub fn shutdown(mut self) {
        self.exit_now.store(true, Ordering::Release);

        let deadline = Instant::now() + SHUTDOWN_POLL_BUDGET;
        while self.running.load(Ordering::Acquire) && Instant::now() < deadline {
            std::thread::sleep(SHUTDOWN_POLL_STEP);
        }

        match self.accept_thread.take() {
            Some(handle) if !self.running.load(Ordering::Acquire) => {
                let _ = handle.join();
            }
            Some(_) => {
                warn!("listener shutdown deadline exceeded; detaching accept thread");
            }
            None => {}
        }
    }
}
