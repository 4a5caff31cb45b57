//! Reachability watchdog for the PLC host.
//!
//! Runs an OS-level ping on a fixed interval from a background thread and
//! invokes the failure callback at most once per detected outage, then
//! stops itself. The watchdog is independent of the client session: it
//! never touches the ISO connection and the core never drives it.
//!
//! # Example
//!
//! ```no_run
//! use s7comm::PingWatchdog;
//! use std::time::Duration;
//!
//! let mut watchdog = PingWatchdog::start("192.168.0.1", Duration::from_secs(5), |reason| {
//!     eprintln!("PLC gone: {reason}");
//! })?;
//! // ... talk to the PLC ...
//! watchdog.stop();
//! # Ok::<(), std::io::Error>(())
//! ```

use std::io;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{trace, warn};

/// Periodic host reachability check with a one-shot failure callback.
pub struct PingWatchdog {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl PingWatchdog {
    /// Starts a watchdog pinging `host` every `interval` via the OS ping
    /// binary. `on_failure` fires once when the host stops answering; the
    /// watchdog stops afterwards.
    pub fn start<F>(host: impl Into<String>, interval: Duration, on_failure: F) -> io::Result<Self>
    where
        F: FnOnce(String) + Send + 'static,
    {
        Self::start_with_probe(host, interval, os_ping, on_failure)
    }

    /// Starts a watchdog with a custom reachability probe.
    ///
    /// The probe receives the host and returns whether it answered; used by
    /// tests and by callers whose network forbids ICMP.
    pub fn start_with_probe<P, F>(
        host: impl Into<String>,
        interval: Duration,
        probe: P,
        on_failure: F,
    ) -> io::Result<Self>
    where
        P: Fn(&str) -> bool + Send + 'static,
        F: FnOnce(String) + Send + 'static,
    {
        let host = host.into();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name("ping-watchdog".into())
            .spawn(move || {
                let mut on_failure = Some(on_failure);
                loop {
                    // sleep in short steps so stop() stays responsive
                    let deadline = Instant::now() + interval;
                    while Instant::now() < deadline {
                        if flag.load(Ordering::Relaxed) {
                            return;
                        }
                        thread::sleep(Duration::from_millis(10).min(interval));
                    }
                    if flag.load(Ordering::Relaxed) {
                        return;
                    }
                    let started = Instant::now();
                    let reachable = probe(&host);
                    trace!(host = %host, reachable, elapsed = ?started.elapsed(), "ping");
                    if !reachable {
                        warn!(host = %host, "host not reachable");
                        if let Some(callback) = on_failure.take() {
                            callback(format!("host {host} not reachable"));
                        }
                        flag.store(true, Ordering::Relaxed);
                        return;
                    }
                }
            })?;
        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Returns whether the watchdog thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stops the watchdog and waits for its thread to exit. Idempotent.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for PingWatchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for PingWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PingWatchdog")
            .field("running", &self.is_running())
            .finish()
    }
}

/// Single ping through the platform's ping binary.
fn os_ping(host: &str) -> bool {
    let count_flag = if cfg!(windows) { "-n" } else { "-c" };
    Command::new("ping")
        .args([count_flag, "1", host])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_failure_callback_fires_once_and_stops() {
        let (tx, rx) = mpsc::channel();
        let watchdog = PingWatchdog::start_with_probe(
            "plc.example",
            Duration::from_millis(20),
            |_| false,
            move |reason| tx.send(reason).unwrap(),
        )
        .unwrap();

        let reason = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(reason.contains("plc.example"));
        // sender was moved into the one-shot callback; a second fire is
        // impossible and the channel is now closed
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        // the thread winds down by itself
        let deadline = Instant::now() + Duration::from_secs(2);
        while watchdog.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!watchdog.is_running());
    }

    #[test]
    fn test_stop_before_failure() {
        let (tx, rx) = mpsc::channel();
        let mut watchdog = PingWatchdog::start_with_probe(
            "plc.example",
            Duration::from_secs(60),
            |_| true,
            move |reason| tx.send(reason).unwrap(),
        )
        .unwrap();
        assert!(watchdog.is_running());
        watchdog.stop();
        assert!(!watchdog.is_running());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reachable_host_keeps_running() {
        let (tx, rx) = mpsc::channel();
        let mut watchdog = PingWatchdog::start_with_probe(
            "plc.example",
            Duration::from_millis(10),
            |_| true,
            move |reason| tx.send(reason).unwrap(),
        )
        .unwrap();
        thread::sleep(Duration::from_millis(100));
        assert!(watchdog.is_running());
        assert!(rx.try_recv().is_err());
        watchdog.stop();
    }
}
