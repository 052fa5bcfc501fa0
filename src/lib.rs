//! # S7 Bit View
//!
//! Core of a viewer that polls the V memory area of Siemens S7-200 SMART
//! controllers and shows the bytes as a bit grid and as 16-bit words.
//!
//! The crate covers the parts with real invariants:
//!
//! - **Session** — one link at a time, safe teardown, bounded reads with a
//!   data block / flat memory fallback
//! - **Poller** — at most one background loop, start/stop without races
//! - **Codec** — bytes to big-endian words and MSB-first bits
//!
//! The wire protocol is not implemented here. Plug in a client library by
//! implementing [`Connector`] and [`Link`]. The front end is not part of the
//! crate either; [`display`] has the helpers it needs.
//!
//! ## Quick Start
//!
//! ```
//! use s7_bitview::sim::SimulatedPlc;
//! use s7_bitview::Viewer;
//!
//! fn main() -> s7_bitview::Result<()> {
//!     // Any `Connector` works; the simulator stands in for a real PLC here.
//!     let plc = SimulatedPlc::new(1024);
//!     plc.write(100, &[0b1010_0000, 0xFF]);
//!
//!     let viewer = Viewer::new(plc);
//!     viewer.connect("192.168.1.11")?;
//!
//!     // Read VB100..VB101 (length is clamped to 1..=80)
//!     let reading = viewer.read_once(100, 2)?;
//!     println!("words: {}", reading.words_text());
//!     println!("{}", reading.grid());
//!
//!     viewer.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! ## Monitoring
//!
//! ```no_run
//! # use s7_bitview::sim::SimulatedPlc;
//! # use s7_bitview::Viewer;
//! # let viewer = Viewer::new(SimulatedPlc::new(1024));
//! # viewer.connect("192.168.1.11")?;
//! // Read up to 4 bytes at VB100 once per second
//! viewer.start_monitoring(100, 4, |bits| {
//!     println!("{} bits", bits.len());
//! });
//!
//! // ...
//! viewer.stop_monitoring();
//! # Ok::<(), s7_bitview::ViewerError>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return [`Result<T, ViewerError>`]. Nothing in the crate
//! panics or ends the process; the worst case is a stable disconnected,
//! not-monitoring viewer.
//!
//! ```
//! use s7_bitview::sim::SimulatedPlc;
//! use s7_bitview::{Viewer, ViewerError};
//!
//! let viewer = Viewer::new(SimulatedPlc::new(16));
//!
//! match viewer.read_once(0, 1) {
//!     Ok(reading) => println!("{:?}", reading.bytes),
//!     Err(ViewerError::NotConnected) => println!("connect first"),
//!     Err(ViewerError::Read { data_block, flat_memory }) => {
//!         println!("DB read: {data_block}, flat read: {flat_memory}");
//!     }
//!     Err(e) => println!("Error: {}", e),
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]. Connects and disconnects are logged
//! at `info`, every read and fallback at `debug`, failed poll reads at `warn`.
//! No subscriber is installed by the library.

#![warn(clippy::all)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod codec;
pub mod display;
mod error;
mod poller;
mod session;
pub mod sim;
mod transport;
mod viewer;
mod window;

// Public re-exports
pub use error::{Result, TransportError, TransportResult, ViewerError};
pub use poller::{Poller, PollerConfig, POLL_INTERVAL};
pub use session::{Session, SessionConfig, RECONNECT_GRACE};
pub use transport::{
    ConnectParams, Connector, Link, DEFAULT_CONNECT_TIMEOUT, DEFAULT_IDLE_TIMEOUT, DEFAULT_RACK,
    DEFAULT_SLOT, V_AREA_DATA_BLOCK,
};
pub use viewer::{Reading, Viewer};
pub use window::{ReadWindow, MAX_POLL_BYTES, MAX_READ_BYTES};
