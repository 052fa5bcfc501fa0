//! Error types for the viewer core and the transport boundary.

use std::io;
use thiserror::Error;

/// Result type alias for viewer operations.
pub type Result<T> = std::result::Result<T, ViewerError>;

/// Result type alias for transport operations.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Errors reported by a transport [`Link`](crate::Link) or
/// [`Connector`](crate::Connector).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The PLC did not answer within the configured timeout.
    #[error("communication timeout")]
    Timeout,

    /// I/O error on the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The connection attempt was refused.
    #[error("connection refused: {reason}")]
    Refused {
        /// Description of why the connection was refused.
        reason: String,
    },

    /// The PLC answered but rejected the request.
    #[error("request rejected: {reason}")]
    Rejected {
        /// Description of the rejection.
        reason: String,
    },

    /// The link has already been closed.
    #[error("link closed")]
    Closed,
}

impl TransportError {
    /// Creates a new `Refused` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::TransportError;
    ///
    /// let err = TransportError::refused("no route to host");
    /// assert_eq!(err.to_string(), "connection refused: no route to host");
    /// ```
    pub fn refused(reason: impl Into<String>) -> Self {
        Self::Refused {
            reason: reason.into(),
        }
    }

    /// Creates a new `Rejected` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::TransportError;
    ///
    /// let err = TransportError::rejected("address out of range");
    /// ```
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while driving the viewer.
#[derive(Debug, Error)]
pub enum ViewerError {
    /// Opening the link to the PLC failed. The session stays disconnected.
    #[error("failed to connect to PLC at {host}: {source}")]
    Connection {
        /// Host the connection was attempted to.
        host: String,
        /// Transport failure.
        #[source]
        source: TransportError,
    },

    /// A read was attempted with no active session.
    #[error("PLC not connected")]
    NotConnected,

    /// Both the data block read and the flat memory read failed.
    #[error("V area read failed: {data_block}; flat memory read failed: {flat_memory}")]
    Read {
        /// Failure of the data block read.
        data_block: TransportError,
        /// Failure of the flat memory fallback.
        flat_memory: TransportError,
    },

    /// Malformed text coming from the front end.
    #[error("invalid {field}: {reason}")]
    Input {
        /// Name of the offending field.
        field: String,
        /// Description of why the text was rejected.
        reason: String,
    },
}

impl ViewerError {
    /// Creates a new `Connection` error.
    pub fn connection(host: impl Into<String>, source: TransportError) -> Self {
        Self::Connection {
            host: host.into(),
            source,
        }
    }

    /// Creates a new `Input` error.
    ///
    /// # Example
    ///
    /// ```
    /// use s7_bitview::ViewerError;
    ///
    /// let err = ViewerError::input("length", "not a number");
    /// assert_eq!(err.to_string(), "invalid length: not a number");
    /// ```
    pub fn input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Input {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors that leave the session in a usable state,
    /// i.e. everything except a failed connect.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Read { .. } | Self::Input { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_connected_display() {
        assert_eq!(ViewerError::NotConnected.to_string(), "PLC not connected");
    }

    #[test]
    fn test_read_error_carries_both_causes() {
        let err = ViewerError::Read {
            data_block: TransportError::rejected("DB1 missing"),
            flat_memory: TransportError::Timeout,
        };
        assert_eq!(
            err.to_string(),
            "V area read failed: request rejected: DB1 missing; flat memory read failed: communication timeout"
        );
    }

    #[test]
    fn test_connection_error_source() {
        use std::error::Error as _;

        let err = ViewerError::connection("192.168.1.11", TransportError::refused("reset"));
        assert_eq!(
            err.to_string(),
            "failed to connect to PLC at 192.168.1.11: connection refused: reset"
        );
        assert!(err.source().is_some());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset by peer");
        let err: TransportError = io_err.into();
        assert!(matches!(err, TransportError::Io(_)));
    }
}
