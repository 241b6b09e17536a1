//! EOD-framed serial protocol
//!
//! Implements the three-step start/parameters/result exchange with a
//! microcontroller that terminates every message it sends with a sentinel byte.
//!
//! Device to client frames end with the sentinel. Client to device messages
//! carry no sentinel.

mod error;
pub mod frame;
pub mod handshake;
pub mod scanner;
pub mod serial;
pub mod session;
pub mod transport;

pub use error::{ConfigStep, ErrorKind, ProtocolError};
pub use frame::{locate_start_marker, Frame, ParameterMessage};
pub use handshake::{
    Handshake, HandshakeError, HandshakeEvent, HandshakeOutcome, HandshakeScript, HandshakeState,
};
pub use scanner::{find_port, scan, PortCandidates};
pub use serial::{list_ports, PortInfo, SerialConnector, SerialTransport};
pub use session::{Session, SessionOptions};
pub use transport::{Connector, LineSettings, Transport};

/// Default baud rate for the demo link
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// End-of-delivery byte appended by the device to every message
pub const DEFAULT_SENTINEL: u8 = b'#';

/// Start message the device sends once it has booted after reset
pub const START_MARKER: &[u8] = b"!start!#";

/// The two integers sent to the device
pub const DEFAULT_PARAMETERS: [u16; 2] = [111, 222];

/// Delay after asserting the reset line before the device is ready, in milliseconds
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 200;

/// Largest frame accepted from the device
pub const DEFAULT_FRAME_CAPACITY: usize = 1000;

/// Port indices probed by the scanner
pub const DEFAULT_SCAN_FIRST: u8 = 0;
/// Last port index probed by the scanner (inclusive)
pub const DEFAULT_SCAN_LAST: u8 = 9;

/// Read poll timeout used by the serial transport while waiting for the sentinel
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 100;
