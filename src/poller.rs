//! Periodic background reads.
//!
//! A [`Poller`] runs at most one background thread that reads a small window
//! of the V area once per interval and hands the decoded bits to a sink.
//!
//! - [`Poller::start`] is a no-op while a loop is running
//! - [`Poller::stop`] fires the running loop's cancellation signal exactly once
//! - every loop gets a fresh signal, so a stop never leaks into the next start
//! - failed reads are logged and the loop keeps going; it never ends on its own
//!
//! A read already in flight when `stop` is called is allowed to finish. Its
//! result is discarded and no further read is started.
//!
//! # Example
//!
//! ```
//! use s7_bitview::sim::SimulatedPlc;
//! use s7_bitview::{Poller, PollerConfig, ReadWindow, Session};
//! use std::sync::{mpsc, Arc};
//! use std::time::Duration;
//!
//! let plc = SimulatedPlc::new(64);
//! plc.write(10, &[0x80]);
//!
//! let session = Arc::new(Session::new(plc));
//! session.connect("192.168.1.11")?;
//!
//! let config = PollerConfig::new().with_interval(Duration::from_millis(10));
//! let poller = Poller::with_config(Arc::clone(&session), config);
//!
//! let (tx, rx) = mpsc::channel();
//! poller.start(ReadWindow::polling(10, 1), move |bits| {
//!     let _ = tx.send(bits);
//! });
//!
//! let bits = rx.recv_timeout(Duration::from_secs(2)).unwrap();
//! assert_eq!(bits.len(), 8);
//! assert!(bits[0]);
//! poller.stop();
//! # Ok::<(), s7_bitview::ViewerError>(())
//! ```

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::codec;
use crate::session::Session;
use crate::transport::Connector;
use crate::window::{ReadWindow, MAX_POLL_BYTES};

/// Default time between two polling reads.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Configuration for a [`Poller`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PollerConfig {
    /// Time between two reads.
    pub interval: Duration,
    /// Upper bound for the byte count of every polling read.
    pub max_bytes: usize,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: POLL_INTERVAL,
            max_bytes: MAX_POLL_BYTES,
        }
    }
}

impl PollerConfig {
    /// Creates the default configuration (1 s interval, 4 bytes per read).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time between reads.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[derive(Default)]
struct PollState {
    running: bool,
    generation: u64,
    cancel: Option<Sender<()>>,
    workers: Vec<JoinHandle<()>>,
}

/// Clears the running flag when a loop exits, unless a newer loop owns it.
struct LoopGuard {
    state: Arc<Mutex<PollState>>,
    generation: u64,
}

impl Drop for LoopGuard {
    fn drop(&mut self) {
        let mut state = lock(&self.state);
        if state.generation != self.generation || !state.running {
            return;
        }
        state.running = false;
        state.cancel = None;
        if thread::panicking() {
            warn!(generation = self.generation, "poll loop died, monitoring stopped");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Start/stop controlled background polling through a shared [`Session`].
pub struct Poller<C: Connector + 'static> {
    session: Arc<Session<C>>,
    config: PollerConfig,
    state: Arc<Mutex<PollState>>,
}

impl<C: Connector + 'static> Poller<C> {
    /// Creates an idle poller with the default configuration.
    pub fn new(session: Arc<Session<C>>) -> Self {
        Self::with_config(session, PollerConfig::default())
    }

    /// Creates an idle poller with a custom configuration.
    pub fn with_config(session: Arc<Session<C>>, config: PollerConfig) -> Self {
        Self {
            session,
            config,
            state: Arc::new(Mutex::new(PollState::default())),
        }
    }

    /// Starts the polling loop.
    ///
    /// `window` is clamped to the configured maximum byte count. `sink`
    /// receives `count * 8` bits per successful tick, called from the
    /// polling thread.
    ///
    /// Returns `true` if a new loop was launched and `false` if one was
    /// already running (or the thread could not be spawned).
    pub fn start<F>(&self, window: ReadWindow, sink: F) -> bool
    where
        F: FnMut(Vec<bool>) + Send + 'static,
    {
        let mut state = lock(&self.state);
        if state.running {
            debug!("poll loop already running");
            return false;
        }

        let window = window.limit(self.config.max_bytes);
        let (cancel_tx, cancel_rx) = mpsc::channel();
        let session = Arc::clone(&self.session);
        let interval = self.config.interval;
        let generation = state.generation.wrapping_add(1);
        let guard_state = Arc::clone(&self.state);

        let spawned = thread::Builder::new()
            .name("s7-poller".into())
            .spawn(move || {
                let _guard = LoopGuard {
                    state: guard_state,
                    generation,
                };
                poll_loop(&session, window, interval, &cancel_rx, sink);
            });
        let worker = match spawned {
            Ok(worker) => worker,
            Err(error) => {
                warn!(%error, "failed to spawn poll thread");
                return false;
            }
        };

        state.running = true;
        state.generation = generation;
        state.cancel = Some(cancel_tx);
        state.workers.retain(|worker| !worker.is_finished());
        state.workers.push(worker);
        info!(%window, interval_ms = interval.as_millis() as u64, "monitoring started");
        true
    }

    /// Stops the polling loop.
    ///
    /// Returns `true` if a running loop was signalled, `false` if none was
    /// running. Does not wait for an in-flight read.
    pub fn stop(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.running {
            return false;
        }
        if let Some(cancel) = state.cancel.take() {
            // The loop may already be gone; the signal is single use either way.
            let _ = cancel.send(());
        }
        state.running = false;
        info!("monitoring stopped");
        true
    }

    /// Returns `true` while a loop is running.
    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Returns the poller configuration.
    pub fn config(&self) -> &PollerConfig {
        &self.config
    }
}

impl<C: Connector + 'static> Drop for Poller<C> {
    fn drop(&mut self) {
        self.stop();
        let workers = std::mem::take(&mut lock(&self.state).workers);
        for worker in workers {
            if worker.thread().id() != thread::current().id() {
                let _ = worker.join();
            }
        }
    }
}

impl<C: Connector + 'static> std::fmt::Debug for Poller<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .field("running", &self.is_running())
            .finish()
    }
}

fn cancelled(cancel: &Receiver<()>) -> bool {
    !matches!(cancel.try_recv(), Err(TryRecvError::Empty))
}

fn poll_loop<C, F>(
    session: &Session<C>,
    window: ReadWindow,
    interval: Duration,
    cancel: &Receiver<()>,
    mut sink: F,
) where
    C: Connector,
    F: FnMut(Vec<bool>),
{
    debug!(%window, "poll loop started");
    let mut next_tick = Instant::now() + interval;

    loop {
        let wait = next_tick.saturating_duration_since(Instant::now());
        match cancel.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        // Missed ticks are dropped rather than replayed.
        let now = Instant::now();
        next_tick += interval;
        if next_tick <= now {
            next_tick = now + interval;
        }

        let reading = session.read_window(window);
        if cancelled(cancel) {
            break;
        }
        match reading {
            Ok(bytes) => sink(codec::to_bits(&bytes)),
            Err(error) => warn!(%window, %error, "poll read failed"),
        }
    }

    debug!(%window, "poll loop stopped");
}
