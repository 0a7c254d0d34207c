//! The accept loop (§4.1).

use std::net::TcpListener as StdTcpListener;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rustls::ServerConfig;
use tracing::{error, info, warn};

use crate::config::{ListenerConfig, TransportMode};
use crate::handle::{ListenerHandle, WorkerCounter, WorkerGuard};
use crate::worker;

/// How long the accept loop blocks on a single `accept` attempt before
/// checking `exit_now` again, per §5's "poll with a configured timeout"
/// suspension point.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(50);
const BIND_RETRY_INTERVAL: Duration = Duration::from_secs(1);

pub struct Listener;

impl Listener {
    /// Binds and starts accepting connections for `config`, spawning one
    /// detached worker thread per accepted connection. Binding is retried
    /// once per second until it succeeds or `config.accept_retry_timeout`
    /// elapses (never, if `Duration::ZERO`); on timeout the returned handle
    /// reports `is_running() == false`.
    pub fn start(config: ListenerConfig) -> ListenerHandle {
        let config = Arc::new(config);
        let running = Arc::new(AtomicBool::new(false));
        let exit_now = Arc::new(AtomicBool::new(false));
        let worker_counter = Arc::new(WorkerCounter::default());

        let tls_config = match &config.transport {
            TransportMode::Plain => None,
            TransportMode::Tls { cert_path, key_path } => match rws_http::tls::load_server_config(cert_path, key_path) {
                Ok(cfg) => Some(Arc::new(cfg)),
                Err(err) => {
                    error!(cause = %err, "failed to load TLS material; listener will not start");
                    return ListenerHandle {
                        running,
                        exit_now,
                        worker_counter,
                        accept_thread: None,
                        local_addr: None,
                        date_service: None,
                    };
                }
            },
        };

        let Some(socket) = bind_with_retry(&config.bind_addr, config.accept_retry_timeout, &exit_now) else {
            return ListenerHandle { running, exit_now, worker_counter, accept_thread: None, local_addr: None, date_service: None };
        };
        let local_addr = socket.local_addr().ok();
        if let Err(err) = socket.set_nonblocking(true) {
            error!(cause = %err, "failed to set accept socket nonblocking; listener will not start");
            return ListenerHandle { running, exit_now, worker_counter, accept_thread: None, local_addr: None, date_service: None };
        }

        running.store(true, Ordering::Release);
        info!(addr = ?local_addr, "listener started");

        let date_service = rws_http::date::DateService::start();
        let date_reader = date_service.reader();

        let accept_thread = {
            let config = Arc::clone(&config);
            let running = Arc::clone(&running);
            let exit_now = Arc::clone(&exit_now);
            let worker_counter = Arc::clone(&worker_counter);

            std::thread::spawn(move || {
                accept_loop(socket, config, &exit_now, &worker_counter, tls_config, date_reader);
                running.store(false, Ordering::Release);
            })
        };

        ListenerHandle {
            running,
            exit_now,
            worker_counter,
            accept_thread: Some(accept_thread),
            local_addr,
            date_service: Some(date_service),
        }
    }
}

fn bind_with_retry(addr: &str, timeout: Duration, exit_now: &AtomicBool) -> Option<StdTcpListener> {
    let deadline = (!timeout.is_zero()).then(|| Instant::now() + timeout);

    loop {
        match StdTcpListener::bind(addr) {
            Ok(listener) => return Some(listener),
            Err(err) => {
                warn!(cause = %err, %addr, "bind failed, retrying");
            }
        }

        if exit_now.load(Ordering::Acquire) {
            return None;
        }
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                error!(%addr, "bind retry timeout exceeded");
                return None;
            }
        }
        std::thread::sleep(BIND_RETRY_INTERVAL);
    }
}

fn accept_loop(
    socket: StdTcpListener,
    config: Arc<ListenerConfig>,
    exit_now: &AtomicBool,
    worker_counter: &Arc<WorkerCounter>,
    tls_config: Option<Arc<ServerConfig>>,
    date_reader: rws_http::date::DateReader,
) {
    loop {
        if exit_now.load(Ordering::Acquire) {
            break;
        }

        let stream = match socket.accept() {
            Ok((stream, _addr)) => stream,
            Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_POLL_INTERVAL);
                continue;
            }
            Err(err) => {
                warn!(cause = %err, "accept failed");
                continue;
            }
        };

        let guard = WorkerGuard::new(Arc::clone(worker_counter));
        let config = Arc::clone(&config);
        let tls_config = tls_config.clone();
        let date_reader = date_reader.clone();

        std::thread::spawn(move || {
            let _guard = guard;
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                worker::serve(stream, &config, tls_config, date_reader);
            }));
            if result.is_err() {
                error!("connection worker panicked; connection dropped");
            }
        });
    }
}
