//! Transport boundary between the viewer core and an S7 protocol client.
//!
//! The core never speaks the wire protocol itself. It only needs four
//! operations from a client implementation:
//!
//! - open a link to a host with rack/slot and timeouts ([`Connector::open`])
//! - read bytes from a numbered data block ([`Link::read_data_block`])
//! - read bytes from the flat memory area ([`Link::read_flat_memory`])
//! - close the link ([`Link::close`])
//!
//! Any client library can be plugged in by implementing these two traits.
//! [`SimulatedPlc`](crate::sim::SimulatedPlc) is an in-memory implementation
//! used by the tests and demos.
//!
//! # Constants
//!
//! - [`DEFAULT_RACK`] / [`DEFAULT_SLOT`] - CPU location on S7-200 SMART (0 / 1)
//! - [`DEFAULT_CONNECT_TIMEOUT`] - Connection timeout (5 seconds)
//! - [`DEFAULT_IDLE_TIMEOUT`] - Idle timeout (60 seconds)
//! - [`V_AREA_DATA_BLOCK`] - Data block the V area is mapped to (1)

use std::time::Duration;

use crate::error::TransportResult;

/// Rack of the CPU module on S7-200 SMART controllers.
pub const DEFAULT_RACK: u16 = 0;

/// Slot of the CPU module on S7-200 SMART controllers.
pub const DEFAULT_SLOT: u16 = 1;

/// Default timeout for establishing a link.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default idle timeout after which the transport may drop the link.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Data block index the V memory area is exposed through.
pub const V_AREA_DATA_BLOCK: u16 = 1;

/// Parameters handed to [`Connector::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    /// PLC host name or IP address.
    pub host: String,
    /// Rack of the CPU module.
    pub rack: u16,
    /// Slot of the CPU module.
    pub slot: u16,
    /// Timeout for establishing the link.
    pub connect_timeout: Duration,
    /// Idle timeout of an established link.
    pub idle_timeout: Duration,
}

impl ConnectParams {
    /// Creates parameters for `host` with the S7-200 SMART defaults.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::{ConnectParams, DEFAULT_SLOT};
    ///
    /// let params = ConnectParams::new("192.168.1.11");
    /// assert_eq!(params.slot, DEFAULT_SLOT);
    /// ```
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            rack: DEFAULT_RACK,
            slot: DEFAULT_SLOT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }
}

/// Opens links to a PLC.
///
/// Implementations must be shareable between the foreground caller and the
/// polling thread, hence `Send + Sync`.
pub trait Connector: Send + Sync {
    /// Link type produced by this connector.
    type Link: Link;

    /// Establishes a new link.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`](crate::TransportError) if the PLC cannot
    /// be reached within `params.connect_timeout`.
    fn open(&self, params: &ConnectParams) -> TransportResult<Self::Link>;
}

/// An established link to one PLC.
///
/// Requests on a link are strictly sequential; the session serializes access
/// so implementations never see concurrent calls.
pub trait Link: Send {
    /// Fills `buf` with bytes from data block `db`, starting at byte `start`.
    fn read_data_block(&mut self, db: u16, start: u32, buf: &mut [u8]) -> TransportResult<()>;

    /// Fills `buf` with bytes from the flat memory area, starting at byte `start`.
    fn read_flat_memory(&mut self, start: u32, buf: &mut [u8]) -> TransportResult<()>;

    /// Releases the link. Called exactly once by the session.
    fn close(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_constants() {
        assert_eq!(DEFAULT_RACK, 0);
        assert_eq!(DEFAULT_SLOT, 1);
        assert_eq!(DEFAULT_CONNECT_TIMEOUT, Duration::from_secs(5));
        assert_eq!(DEFAULT_IDLE_TIMEOUT, Duration::from_secs(60));
        assert_eq!(V_AREA_DATA_BLOCK, 1);
    }

    #[test]
    fn test_connect_params_new() {
        let params = ConnectParams::new("10.0.0.5");
        assert_eq!(params.host, "10.0.0.5");
        assert_eq!(params.rack, DEFAULT_RACK);
        assert_eq!(params.slot, DEFAULT_SLOT);
        assert_eq!(params.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(params.idle_timeout, DEFAULT_IDLE_TIMEOUT);
    }
}
