use serde::{Deserialize, Serialize};
use serialport::{DataBits, FlowControl, Parity, StopBits};
use std::io;

use super::DEFAULT_BAUD_RATE;

/// Line parameters of a serial link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSettings {
    /// Bits per second
    pub baud_rate: u32,
    /// Bits per character
    pub data_bits: DataBits,
    /// Parity checking
    pub parity: Parity,
    /// Stop bits per character
    pub stop_bits: StopBits,
    /// Always none for the demo boards
    pub flow_control: FlowControl,
}

impl Default for LineSettings {
    /// 9600 baud, 8N1, no flow control
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
            flow_control: FlowControl::None,
        }
    }
}

/// Abstraction over the operating system's serial capability.
///
/// Dropping a transport closes the underlying device.
pub trait Transport {
    /// Report the current line settings. Fails for handles that are not serial devices.
    fn line_settings(&mut self) -> io::Result<LineSettings>;

    /// Apply line settings
    fn configure(&mut self, settings: &LineSettings) -> io::Result<()>;

    /// Drive the DTR line. Asserting it resets an attached Arduino-style board.
    fn set_reset_line(&mut self, level: bool) -> io::Result<()>;

    /// Arm end-of-delivery detection for `sentinel`
    fn arm_sentinel(&mut self, sentinel: u8) -> io::Result<()>;

    /// Block, with no timeout, until an unread sentinel byte has been received
    fn wait_for_sentinel(&mut self) -> io::Result<()>;

    /// Number of received bytes ready to be read
    fn bytes_queued(&mut self) -> io::Result<usize>;

    /// Read up to `buf.len()` queued bytes
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;

    /// Send `data` in a single write; returns how many bytes were accepted
    fn write(&mut self, data: &[u8]) -> io::Result<usize>;
}

/// Opens device identifiers into transports
pub trait Connector {
    /// Transport produced by this connector
    type Transport: Transport;

    /// Open `port` for exclusive, synchronous read/write access
    fn open(&mut self, port: &str) -> io::Result<Self::Transport>;
}
