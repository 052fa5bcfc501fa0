//! Connection lifecycle and bounded reads against one PLC.
//!
//! [`Session`] owns at most one transport link. It is either connected with
//! a fully opened link or disconnected with none; there is no observable
//! state in between.
//!
//! # Reading the V area
//!
//! On S7-200 SMART controllers the V area is exposed as data block 1, but some
//! firmware variants only answer to flat memory addressing. Every read first
//! tries the data block and falls back to flat memory at the same offset. Only
//! when both fail is [`ViewerError::Read`] returned, carrying both causes.
//! There are no further retries.
//!
//! # Thread Safety
//!
//! A `Session` is meant to be shared (`Arc<Session<_>>`) between the
//! foreground caller and the polling thread. Session state sits behind one
//! mutex that is held only for state transitions, and the link behind a
//! second mutex that serializes requests. Neither reads nor connects block on
//! the network while holding the state mutex. Connects are serialized by a
//! third mutex held across teardown, the grace pause and the open, so the
//! previous link is always closed before the next one is opened.
//!
//! # Example
//!
//! ```
//! use s7_bitview::sim::SimulatedPlc;
//! use s7_bitview::Session;
//!
//! let plc = SimulatedPlc::new(256);
//! plc.write(100, &[0x12, 0x34]);
//!
//! let session = Session::new(plc);
//! session.connect("192.168.1.11")?;
//!
//! let data = session.read_once(100, 2)?;
//! assert_eq!(data, vec![0x12, 0x34]);
//!
//! session.disconnect();
//! assert!(!session.is_connected());
//! # Ok::<(), s7_bitview::ViewerError>(())
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::{Result, ViewerError};
use crate::transport::{
    ConnectParams, Connector, Link, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_RACK,
    DEFAULT_SLOT, V_AREA_DATA_BLOCK,
};
use crate::window::ReadWindow;

/// Pause between tearing down an existing link and opening a new one.
pub const RECONNECT_GRACE: Duration = Duration::from_millis(100);

/// Configuration for a [`Session`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SessionConfig {
    /// Rack of the CPU module.
    pub rack: u16,
    /// Slot of the CPU module.
    pub slot: u16,
    /// Timeout for opening a link.
    pub connect_timeout: Duration,
    /// Idle timeout of an open link.
    pub idle_timeout: Duration,
    /// Pause between teardown and re-open when connecting while connected.
    pub reconnect_grace: Duration,
    /// Data block the V area is mapped to.
    pub data_block: u16,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            rack: DEFAULT_RACK,
            slot: DEFAULT_SLOT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
            reconnect_grace: RECONNECT_GRACE,
            data_block: V_AREA_DATA_BLOCK,
        }
    }
}

impl SessionConfig {
    /// Creates the S7-200 SMART default configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::SessionConfig;
    /// use std::time::Duration;
    ///
    /// let config = SessionConfig::new();
    /// assert_eq!(config.rack, 0);
    /// assert_eq!(config.slot, 1);
    /// assert_eq!(config.connect_timeout, Duration::from_secs(5));
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a custom connect timeout (default is 5 seconds).
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets a custom idle timeout (default is 60 seconds).
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets the pause enforced before reconnecting (default is 100 ms).
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::SessionConfig;
    /// use std::time::Duration;
    ///
    /// let config = SessionConfig::new().with_reconnect_grace(Duration::ZERO);
    /// assert!(config.reconnect_grace.is_zero());
    /// ```
    pub fn with_reconnect_grace(mut self, grace: Duration) -> Self {
        self.reconnect_grace = grace;
        self
    }

    /// Builds the transport parameters for `host`.
    pub fn connect_params(&self, host: &str) -> ConnectParams {
        ConnectParams {
            host: host.to_owned(),
            rack: self.rack,
            slot: self.slot,
            connect_timeout: self.connect_timeout,
            idle_timeout: self.idle_timeout,
        }
    }
}

struct Active<L> {
    host: String,
    link: Arc<Mutex<L>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A connection to one PLC, possibly absent.
pub struct Session<C: Connector> {
    connector: C,
    config: SessionConfig,
    active: Mutex<Option<Active<C::Link>>>,
    connecting: Mutex<()>,
}

impl<C: Connector> Session<C> {
    /// Creates a disconnected session with the default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, SessionConfig::default())
    }

    /// Creates a disconnected session with a custom configuration.
    pub fn with_config(connector: C, config: SessionConfig) -> Self {
        Self {
            connector,
            config,
            active: Mutex::new(None),
            connecting: Mutex::new(()),
        }
    }

    /// Connects to `host`.
    ///
    /// An existing link is closed first, followed by the reconnect grace
    /// pause, so two links are never owned at the same time.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Connection`] if the link cannot be opened. The
    /// session is disconnected afterwards, even if it was connected before.
    pub fn connect(&self, host: &str) -> Result<()> {
        let _connecting = lock(&self.connecting);

        let previous = lock(&self.active).take();
        if let Some(previous) = previous {
            info!(host = %previous.host, "closing existing PLC connection before reconnect");
            close_link(&previous.link);
            thread::sleep(self.config.reconnect_grace);
        }

        let params = self.config.connect_params(host);
        let link = self.connector.open(&params).map_err(|source| {
            warn!(host, error = %source, "PLC connection failed");
            ViewerError::connection(host, source)
        })?;

        *lock(&self.active) = Some(Active {
            host: host.to_owned(),
            link: Arc::new(Mutex::new(link)),
        });
        info!(host, rack = params.rack, slot = params.slot, "PLC connected");
        Ok(())
    }

    /// Closes the link if there is one.
    ///
    /// Returns `true` if a link was closed, `false` if the session was
    /// already disconnected. A read in progress on another thread finishes
    /// before the link is closed.
    pub fn disconnect(&self) -> bool {
        let previous = lock(&self.active).take();
        match previous {
            Some(previous) => {
                close_link(&previous.link);
                info!(host = %previous.host, "PLC disconnected");
                true
            }
            None => false,
        }
    }

    /// Returns `true` while a link is open.
    pub fn is_connected(&self) -> bool {
        lock(&self.active).is_some()
    }

    /// Returns the host of the open link.
    pub fn host(&self) -> Option<String> {
        lock(&self.active).as_ref().map(|active| active.host.clone())
    }

    /// Returns the session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Reads `window` from the V area.
    ///
    /// # Errors
    ///
    /// - [`ViewerError::NotConnected`] if no link is open; the transport is
    ///   not touched.
    /// - [`ViewerError::Read`] if both the data block read and the flat
    ///   memory read fail.
    pub fn read_window(&self, window: ReadWindow) -> Result<Vec<u8>> {
        let link = lock(&self.active)
            .as_ref()
            .map(|active| Arc::clone(&active.link))
            .ok_or(ViewerError::NotConnected)?;
        let mut link = lock(&link);

        let mut buf = vec![0u8; window.count()];
        match link.read_data_block(self.config.data_block, window.start(), &mut buf) {
            Ok(()) => {
                debug!(%window, db = self.config.data_block, "read V area via data block");
                Ok(buf)
            }
            Err(data_block) => {
                debug!(%window, error = %data_block, "data block read failed, trying flat memory");
                match link.read_flat_memory(window.start(), &mut buf) {
                    Ok(()) => Ok(buf),
                    Err(flat_memory) => Err(ViewerError::Read {
                        data_block,
                        flat_memory,
                    }),
                }
            }
        }
    }

    /// Reads up to 80 bytes starting at V byte `start`.
    ///
    /// `length` is clamped into `1..=80`, the capacity of the 20×32 bit grid.
    ///
    /// # Errors
    ///
    /// Same as [`read_window`](Self::read_window).
    pub fn read_once(&self, start: u32, length: i64) -> Result<Vec<u8>> {
        self.read_window(ReadWindow::single_shot(start, length))
    }
}

fn close_link<L: Link>(link: &Mutex<L>) {
    lock(link).close();
}

impl<C: Connector> Drop for Session<C> {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl<C: Connector> std::fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimulatedPlc;
    use crate::window::MAX_READ_BYTES;
    use std::time::Instant;

    fn fast_config() -> SessionConfig {
        SessionConfig::new().with_reconnect_grace(Duration::ZERO)
    }

    fn connected(plc: &SimulatedPlc) -> Session<SimulatedPlc> {
        let session = Session::with_config(plc.clone(), fast_config());
        session.connect("sim").unwrap();
        session
    }

    #[test]
    fn test_session_config_default() {
        let config = SessionConfig::default();
        assert_eq!(config.rack, DEFAULT_RACK);
        assert_eq!(config.slot, DEFAULT_SLOT);
        assert_eq!(config.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(config.idle_timeout, DEFAULT_IDLE_TIMEOUT);
        assert_eq!(config.reconnect_grace, RECONNECT_GRACE);
        assert_eq!(config.data_block, V_AREA_DATA_BLOCK);
    }

    #[test]
    fn test_connect_passes_params() {
        let plc = SimulatedPlc::new(16);
        let session = Session::new(plc.clone());
        session.connect("192.168.1.11").unwrap();

        let params = plc.last_params().unwrap();
        assert_eq!(params, ConnectParams::new("192.168.1.11"));
        assert!(session.is_connected());
        assert_eq!(session.host().as_deref(), Some("192.168.1.11"));
    }

    #[test]
    fn test_read_without_session_never_touches_transport() {
        let plc = SimulatedPlc::new(16);
        let session = Session::new(plc.clone());

        let err = session.read_once(0, 4).unwrap_err();
        assert!(matches!(err, ViewerError::NotConnected));

        let stats = plc.stats();
        assert_eq!(stats.opens, 0);
        assert_eq!(stats.data_block_reads, 0);
        assert_eq!(stats.flat_memory_reads, 0);
    }

    #[test]
    fn test_connect_failure_stays_disconnected() {
        let plc = SimulatedPlc::new(16);
        plc.set_open_failure(true);
        let session = Session::new(plc.clone());

        let err = session.connect("10.0.0.1").unwrap_err();
        assert!(matches!(err, ViewerError::Connection { ref host, .. } if host == "10.0.0.1"));
        assert!(!session.is_connected());
        assert!(matches!(session.read_once(0, 1), Err(ViewerError::NotConnected)));
    }

    #[test]
    fn test_failed_reconnect_drops_previous_link() {
        let plc = SimulatedPlc::new(16);
        let session = connected(&plc);
        plc.set_open_failure(true);

        assert!(session.connect("sim").is_err());
        assert!(!session.is_connected());
        assert_eq!(plc.stats().live_links, 0);
    }

    #[test]
    fn test_reconnect_closes_old_link_first() {
        let plc = SimulatedPlc::new(16);
        let session = connected(&plc);
        session.connect("sim").unwrap();
        session.connect("sim").unwrap();

        let stats = plc.stats();
        assert_eq!(stats.opens, 3);
        assert_eq!(stats.closes, 2);
        assert_eq!(stats.live_links, 1);
        assert_eq!(stats.max_live_links, 1);
    }

    #[test]
    fn test_reconnect_waits_grace_period() {
        let plc = SimulatedPlc::new(16);
        let grace = Duration::from_millis(60);
        let session =
            Session::with_config(plc, SessionConfig::new().with_reconnect_grace(grace));
        session.connect("sim").unwrap();

        let started = Instant::now();
        session.connect("sim").unwrap();
        assert!(started.elapsed() >= grace);
    }

    #[test]
    fn test_state_queries_do_not_wait_for_open() {
        let plc = SimulatedPlc::new(16);
        plc.set_open_delay(Duration::from_millis(300));
        let session = Arc::new(Session::with_config(plc, fast_config()));

        let connector = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.connect("sim"))
        };
        thread::sleep(Duration::from_millis(30));

        let started = Instant::now();
        assert!(!session.is_connected());
        assert!(session.host().is_none());
        assert!(matches!(session.read_once(0, 1), Err(ViewerError::NotConnected)));
        assert!(started.elapsed() < Duration::from_millis(150));

        connector.join().unwrap().unwrap();
        assert!(session.is_connected());
    }

    #[test]
    fn test_concurrent_connects_never_share_links() {
        let plc = SimulatedPlc::new(16);
        plc.set_open_delay(Duration::from_millis(20));
        let session = Arc::new(Session::with_config(plc.clone(), fast_config()));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let session = Arc::clone(&session);
                thread::spawn(move || session.connect("sim"))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stats = plc.stats();
        assert_eq!(stats.opens, 4);
        assert_eq!(stats.live_links, 1);
        assert_eq!(stats.max_live_links, 1);
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let plc = SimulatedPlc::new(16);
        let session = connected(&plc);

        assert!(session.disconnect());
        assert!(!session.disconnect());
        assert!(!session.is_connected());
        assert_eq!(plc.stats().closes, 1);
    }

    #[test]
    fn test_read_prefers_data_block() {
        let plc = SimulatedPlc::new(256);
        plc.write(100, &hex::decode("00ff10").unwrap());
        let session = connected(&plc);

        assert_eq!(session.read_once(100, 3).unwrap(), vec![0x00, 0xFF, 0x10]);
        let stats = plc.stats();
        assert_eq!(stats.data_block_reads, 1);
        assert_eq!(stats.flat_memory_reads, 0);
    }

    #[test]
    fn test_read_falls_back_to_flat_memory() {
        let plc = SimulatedPlc::new(256);
        plc.write(8, &[0xAA]);
        plc.set_data_block_failure(true);
        let session = connected(&plc);

        assert_eq!(session.read_once(8, 1).unwrap(), vec![0xAA]);
        let stats = plc.stats();
        assert_eq!(stats.data_block_reads, 1);
        assert_eq!(stats.flat_memory_reads, 1);
    }

    #[test]
    fn test_read_fails_when_both_paths_fail() {
        let plc = SimulatedPlc::new(256);
        plc.set_data_block_failure(true);
        plc.set_flat_memory_failure(true);
        let session = connected(&plc);

        let err = session.read_once(0, 2).unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ViewerError::Read { .. }));
        assert!(message.contains("data block not available"));
        assert!(message.contains("flat memory access denied"));
        assert!(session.is_connected());
    }

    #[test]
    fn test_read_once_clamps_length() {
        let plc = SimulatedPlc::new(256);
        let session = connected(&plc);

        assert_eq!(session.read_once(0, 0).unwrap().len(), 1);
        assert_eq!(session.read_once(0, -3).unwrap().len(), 1);
        assert_eq!(session.read_once(0, 1000).unwrap().len(), MAX_READ_BYTES);
    }

    #[test]
    fn test_disconnect_during_read_does_not_deadlock() {
        let plc = SimulatedPlc::new(64);
        plc.set_read_delay(Duration::from_millis(100));
        let session = Arc::new(connected(&plc));

        let reader = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.read_once(0, 4))
        };
        thread::sleep(Duration::from_millis(20));
        assert!(session.disconnect());

        // The in-flight read completes on the old link; its result is irrelevant.
        let _ = reader.join().unwrap();
        assert!(!session.is_connected());
        assert_eq!(plc.stats().live_links, 0);
    }

    #[test]
    fn test_drop_closes_link() {
        let plc = SimulatedPlc::new(16);
        drop(connected(&plc));
        assert_eq!(plc.stats().live_links, 0);
    }
}
