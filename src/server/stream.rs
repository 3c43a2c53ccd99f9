//! Periodic stream worker.
//!
//! One background thread samples and pushes at a fixed cadence. The
//! worker is intentionally decoupled from acquisition and socket I/O:
//! it runs whatever tick closure it is given, which keeps the cadence
//! and lifecycle logic independently testable.
//!
//! Lifecycle rules:
//! * `start` on a running stream replaces it (stop, join, fresh timer).
//! * `stop` is idempotent and always joins before returning, so no two
//!   workers ever overlap.
//! * A tick may end the stream from inside (e.g. the client vanished
//!   mid-push) by returning [`TickOutcome::Stop`].

use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use log::{info, warn};

/// What the tick closure wants to happen next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Handle to the live worker, if any.
struct StreamWorker {
    stop_tx: mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

/// Owns at most one stream worker thread.
pub struct StreamPublisher {
    worker: Option<StreamWorker>,
}

impl StreamPublisher {
    pub fn new() -> Self {
        Self { worker: None }
    }

    /// True while a worker thread is alive (a self-terminated tick
    /// counts as stopped even before the handle is reaped).
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.thread.is_finished())
    }

    /// Launch the worker, replacing any previous one. The first tick
    /// fires one full `interval` after the call.
    pub fn start<F>(&mut self, interval: Duration, tick: F)
    where
        F: FnMut() -> TickOutcome + Send + 'static,
    {
        self.stop();

        let (stop_tx, stop_rx) = mpsc::channel();
        let thread = thread::spawn(move || run_loop(interval, &stop_rx, tick));
        self.worker = Some(StreamWorker { stop_tx, thread });
        info!("stream: started, interval {} ms", interval.as_millis());
    }

    /// Stop and join the worker. Returns whether one was running.
    pub fn stop(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        // Send may fail if the worker already exited on its own.
        let _ = worker.stop_tx.send(());
        if worker.thread.join().is_err() {
            warn!("stream: worker thread panicked");
        }
        info!("stream: stopped");
        true
    }
}

impl Default for StreamPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for StreamPublisher {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Deadline-based cadence: ticks stay `interval` apart regardless of
/// how long each tick takes, and an overrun realigns instead of
/// bursting to catch up.
fn run_loop<F>(interval: Duration, stop_rx: &mpsc::Receiver<()>, mut tick: F)
where
    F: FnMut() -> TickOutcome,
{
    let mut deadline = Instant::now() + interval;
    loop {
        let wait = deadline.saturating_duration_since(Instant::now());
        match stop_rx.recv_timeout(wait) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => return,
            Err(RecvTimeoutError::Timeout) => {}
        }

        if tick() == TickOutcome::Stop {
            warn!("stream: tick requested stop");
            return;
        }

        deadline += interval;
        let now = Instant::now();
        if deadline < now {
            deadline = now + interval;
        }
    }
}
