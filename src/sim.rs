//! In-memory PLC for tests and demos.
//!
//! [`SimulatedPlc`] implements [`Connector`] over a byte buffer standing in
//! for the V area. Both addressing paths serve the same buffer, and each can
//! be switched to fail independently:
//!
//! - `set_open_failure(true)` makes [`Connector::open`] return `Refused`
//! - `set_data_block_failure(true)` makes DB reads return `Rejected`
//! - `set_flat_memory_failure(true)` makes flat memory reads return `Rejected`
//! - reads past the end of the buffer are `Rejected`
//!
//! The simulator also counts opens, closes and live links, so tests can
//! check that the session never owns two links at once.
//!
//! # Example
//!
//! ```
//! use s7_bitview::sim::SimulatedPlc;
//! use s7_bitview::{ConnectParams, Connector, Link};
//!
//! let plc = SimulatedPlc::new(256);
//! plc.write(100, &[0xAB, 0xCD]);
//!
//! let mut link = plc.open(&ConnectParams::new("sim")).unwrap();
//! let mut buf = [0u8; 2];
//! link.read_data_block(1, 100, &mut buf).unwrap();
//! assert_eq!(buf, [0xAB, 0xCD]);
//! link.close();
//! assert_eq!(plc.stats().live_links, 0);
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

use crate::error::{TransportError, TransportResult};
use crate::transport::{ConnectParams, Connector, Link, V_AREA_DATA_BLOCK};

/// Counters collected by a [`SimulatedPlc`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimStats {
    /// Successful opens.
    pub opens: usize,
    /// Closes.
    pub closes: usize,
    /// Links opened and not yet closed.
    pub live_links: usize,
    /// Highest number of simultaneously live links seen.
    pub max_live_links: usize,
    /// Data block read attempts.
    pub data_block_reads: usize,
    /// Flat memory read attempts.
    pub flat_memory_reads: usize,
}

#[derive(Debug)]
struct SimState {
    memory: Vec<u8>,
    fail_open: bool,
    fail_data_block: bool,
    fail_flat_memory: bool,
    read_delay: Duration,
    open_delay: Duration,
    last_params: Option<ConnectParams>,
    stats: SimStats,
}

impl SimState {
    fn copy_out(&self, start: u32, buf: &mut [u8]) -> TransportResult<()> {
        let start = start as usize;
        let end = start
            .checked_add(buf.len())
            .filter(|&end| end <= self.memory.len())
            .ok_or_else(|| {
                TransportError::rejected(format!(
                    "address {}+{} outside {} byte area",
                    start,
                    buf.len(),
                    self.memory.len()
                ))
            })?;
        buf.copy_from_slice(&self.memory[start..end]);
        Ok(())
    }
}

/// A simulated S7-200 SMART controller.
///
/// Cloning yields another handle to the same controller.
#[derive(Debug, Clone)]
pub struct SimulatedPlc {
    state: Arc<Mutex<SimState>>,
}

impl SimulatedPlc {
    /// Creates a controller with a zeroed V area of `size` bytes.
    pub fn new(size: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                memory: vec![0; size],
                fail_open: false,
                fail_data_block: false,
                fail_flat_memory: false,
                read_delay: Duration::ZERO,
                open_delay: Duration::ZERO,
                last_params: None,
                stats: SimStats::default(),
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes `data` into the V area at byte `start`, growing it if needed.
    pub fn write(&self, start: usize, data: &[u8]) {
        let mut state = self.state();
        let end = start + data.len();
        if state.memory.len() < end {
            state.memory.resize(end, 0);
        }
        state.memory[start..end].copy_from_slice(data);
    }

    /// Makes subsequent opens fail.
    pub fn set_open_failure(&self, fail: bool) {
        self.state().fail_open = fail;
    }

    /// Makes subsequent data block reads fail.
    pub fn set_data_block_failure(&self, fail: bool) {
        self.state().fail_data_block = fail;
    }

    /// Makes subsequent flat memory reads fail.
    pub fn set_flat_memory_failure(&self, fail: bool) {
        self.state().fail_flat_memory = fail;
    }

    /// Delays every read by `delay` to emulate a slow controller.
    pub fn set_read_delay(&self, delay: Duration) {
        self.state().read_delay = delay;
    }

    /// Delays every open by `delay` to emulate a slow handshake.
    pub fn set_open_delay(&self, delay: Duration) {
        self.state().open_delay = delay;
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> SimStats {
        self.state().stats
    }

    /// Returns the parameters of the most recent open attempt.
    pub fn last_params(&self) -> Option<ConnectParams> {
        self.state().last_params.clone()
    }
}

impl Connector for SimulatedPlc {
    type Link = SimulatedLink;

    fn open(&self, params: &ConnectParams) -> TransportResult<SimulatedLink> {
        let delay = self.state().open_delay;
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state();
        state.last_params = Some(params.clone());
        if state.fail_open {
            return Err(TransportError::refused(format!("{} unreachable", params.host)));
        }
        state.stats.opens += 1;
        state.stats.live_links += 1;
        state.stats.max_live_links = state.stats.max_live_links.max(state.stats.live_links);
        Ok(SimulatedLink {
            state: Arc::clone(&self.state),
            closed: false,
        })
    }
}

/// Link produced by [`SimulatedPlc`].
#[derive(Debug)]
pub struct SimulatedLink {
    state: Arc<Mutex<SimState>>,
    closed: bool,
}

impl SimulatedLink {
    fn read(&mut self, flat: bool, start: u32, buf: &mut [u8]) -> TransportResult<()> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let delay = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if flat {
                state.stats.flat_memory_reads += 1;
            } else {
                state.stats.data_block_reads += 1;
            }
            state.read_delay
        };
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if flat && state.fail_flat_memory {
            return Err(TransportError::rejected("flat memory access denied"));
        }
        if !flat && state.fail_data_block {
            return Err(TransportError::rejected("data block not available"));
        }
        state.copy_out(start, buf)
    }
}

impl Link for SimulatedLink {
    fn read_data_block(&mut self, db: u16, start: u32, buf: &mut [u8]) -> TransportResult<()> {
        if db != V_AREA_DATA_BLOCK {
            return Err(TransportError::rejected(format!("DB{db} does not exist")));
        }
        self.read(false, start, buf)
    }

    fn read_flat_memory(&mut self, start: u32, buf: &mut [u8]) -> TransportResult<()> {
        self.read(true, start, buf)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.stats.closes += 1;
        state.stats.live_links = state.stats.live_links.saturating_sub(1);
    }
}
