//! The viewer facade handed to a front end.
//!
//! A [`Viewer`] bundles one [`Session`] and one [`Poller`] sharing it. The
//! front end owns the viewer and calls into it from its event handlers; no
//! global state is involved.
//!
//! # Example
//!
//! ```
//! use s7_bitview::sim::SimulatedPlc;
//! use s7_bitview::Viewer;
//!
//! let plc = SimulatedPlc::new(256);
//! plc.write(100, &[0x01, 0x02, 0x03]);
//!
//! let viewer = Viewer::new(plc);
//! viewer.connect("192.168.1.11")?;
//!
//! let reading = viewer.read_once(100, 3)?;
//! assert_eq!(reading.words(), vec![258, 3]);
//! assert_eq!(reading.bits().len(), 24);
//! # Ok::<(), s7_bitview::ViewerError>(())
//! ```

use std::sync::Arc;

use crate::codec;
use crate::display::{self, BitGrid};
use crate::error::Result;
use crate::poller::{Poller, PollerConfig};
use crate::session::{Session, SessionConfig};
use crate::transport::Connector;
use crate::window::ReadWindow;

/// Bytes returned by one single-shot read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reading {
    /// First V byte of the reading.
    pub start: u32,
    /// Raw bytes as returned by the PLC.
    pub bytes: Vec<u8>,
}

impl Reading {
    /// Big-endian 16-bit words of the reading.
    pub fn words(&self) -> Vec<u16> {
        codec::to_words(&self.bytes)
    }

    /// Bits of the reading, most significant bit first per byte.
    pub fn bits(&self) -> Vec<bool> {
        codec::to_bits(&self.bytes)
    }

    /// The reading laid out on the bit grid.
    pub fn grid(&self) -> BitGrid {
        BitGrid::from_bits(&self.bits())
    }

    /// The words formatted for the register text field.
    pub fn words_text(&self) -> String {
        display::format_words(&self.words())
    }
}

/// Session plus poller for one PLC.
pub struct Viewer<C: Connector + 'static> {
    session: Arc<Session<C>>,
    poller: Poller<C>,
}

impl<C: Connector + 'static> Viewer<C> {
    /// Creates a disconnected viewer with default configuration.
    pub fn new(connector: C) -> Self {
        Self::with_config(connector, SessionConfig::default(), PollerConfig::default())
    }

    /// Creates a disconnected viewer with custom configuration.
    pub fn with_config(connector: C, session: SessionConfig, poller: PollerConfig) -> Self {
        let session = Arc::new(Session::with_config(connector, session));
        let poller = Poller::with_config(Arc::clone(&session), poller);
        Self { session, poller }
    }

    /// Connects to `host`, replacing any existing connection.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Connection`](crate::ViewerError::Connection)
    /// if the PLC cannot be reached.
    pub fn connect(&self, host: &str) -> Result<()> {
        self.session.connect(host)
    }

    /// Connects using the raw text of the host field.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Input`](crate::ViewerError::Input) for blank
    /// text without touching the session.
    pub fn connect_text(&self, host: &str) -> Result<()> {
        let host = display::parse_host(host)?;
        self.connect(&host)
    }

    /// Closes the connection. Monitoring, if active, keeps running and its
    /// reads fail until the next connect.
    pub fn disconnect(&self) -> bool {
        self.session.disconnect()
    }

    /// Reads up to 80 bytes starting at V byte `start`.
    ///
    /// # Errors
    ///
    /// See [`Session::read_window`].
    pub fn read_once(&self, start: u32, length: i64) -> Result<Reading> {
        let window = ReadWindow::single_shot(start, length);
        let bytes = self.session.read_window(window)?;
        Ok(Reading { start, bytes })
    }

    /// Reads using the raw text of the address and length fields.
    ///
    /// # Errors
    ///
    /// Returns [`ViewerError::Input`](crate::ViewerError::Input) for
    /// malformed text, otherwise as [`read_once`](Self::read_once).
    pub fn read_text(&self, start: &str, length: &str) -> Result<Reading> {
        let start = display::parse_address(start)?;
        let length = display::parse_length(length)?;
        self.read_once(start, length)
    }

    /// Starts monitoring up to 4 bytes at V byte `start`.
    ///
    /// Returns `false` if monitoring is already running.
    pub fn start_monitoring<F>(&self, start: u32, length: i64, sink: F) -> bool
    where
        F: FnMut(Vec<bool>) + Send + 'static,
    {
        self.poller.start(ReadWindow::polling(start, length), sink)
    }

    /// Stops monitoring. Returns `false` if it was not running.
    pub fn stop_monitoring(&self) -> bool {
        self.poller.stop()
    }

    /// Returns `true` while connected.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Returns `true` while monitoring.
    pub fn is_monitoring(&self) -> bool {
        self.poller.is_running()
    }

    /// Returns the shared session.
    pub fn session(&self) -> &Arc<Session<C>> {
        &self.session
    }
}

impl<C: Connector + 'static> std::fmt::Debug for Viewer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Viewer")
            .field("session", &self.session)
            .field("poller", &self.poller)
            .finish()
    }
}
