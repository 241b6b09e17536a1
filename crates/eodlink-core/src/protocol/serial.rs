//! Serial port handling
//!
//! Provides the `serialport`-backed [`Transport`] and port enumeration.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::io::{self, Read, Write};
use std::time::Duration;

use super::transport::{Connector, LineSettings, Transport};
use super::{DEFAULT_BAUD_RATE, DEFAULT_POLL_TIMEOUT_MS};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Port name (e.g., "/dev/ttyACM0" or "COM3")
    pub name: String,

    /// USB vendor ID (if USB device)
    pub vid: Option<u16>,

    /// USB product ID (if USB device)
    pub pid: Option<u16>,

    /// Manufacturer name (if available)
    pub manufacturer: Option<String>,

    /// Product name (if available)
    pub product: Option<String>,

    /// Serial number (if available)
    pub serial_number: Option<String>,
}

impl PortInfo {
    fn bare(name: String) -> Self {
        Self {
            name,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial_number: None,
        }
    }
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        match info.port_type {
            SerialPortType::UsbPort(usb_info) => Self {
                name: info.port_name,
                vid: Some(usb_info.vid),
                pid: Some(usb_info.pid),
                manufacturer: usb_info.manufacturer,
                product: usb_info.product,
                serial_number: usb_info.serial_number,
            },
            _ => Self::bare(info.port_name),
        }
    }
}

/// Natural order: name stem first, then the trailing number, so COM2
/// sorts before COM10
fn port_sort_key(name: &str) -> (&str, u64) {
    let stem = name.trim_end_matches(|c: char| c.is_ascii_digit());
    let index = name[stem.len()..].parse().unwrap_or(0);
    (stem, index)
}

/// Serial ports the operating system knows about, in natural order
pub fn list_ports() -> Vec<PortInfo> {
    let mut ports: Vec<PortInfo> = match serialport::available_ports() {
        Ok(found) => found.into_iter().map(PortInfo::from).collect(),
        Err(e) => {
            tracing::warn!("port enumeration failed: {e}");
            Vec::new()
        }
    };
    ports.sort_by(|a, b| port_sort_key(&a.name).cmp(&port_sort_key(&b.name)));
    ports
}

fn to_io(e: serialport::Error) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e)
}

/// Serial port wrapper implementing [`Transport`].
///
/// Portable serial APIs have no event-character notification, so EOD
/// detection pulls bytes from the port into a receive queue and scans the
/// unread part of it for the armed sentinel.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    rx_queue: Vec<u8>,
    sentinel: Option<u8>,
    poll_interval: Duration,
}

impl SerialTransport {
    /// Wrap an opened port
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            rx_queue: Vec::new(),
            sentinel: None,
            poll_interval: Duration::from_millis(2),
        }
    }

    /// Name reported by the underlying port, if any
    pub fn name(&self) -> Option<String> {
        self.port.name()
    }

    /// Move whatever the OS has buffered into the receive queue
    fn pump(&mut self) -> io::Result<usize> {
        let available = self.port.bytes_to_read().map_err(to_io)? as usize;
        if available == 0 {
            return Ok(0);
        }

        let mut chunk = vec![0u8; available];
        match self.port.read(&mut chunk) {
            Ok(n) => {
                self.rx_queue.extend_from_slice(&chunk[..n]);
                tracing::trace!(
                    "pulled {} bytes, queue = {}: {:02x?}",
                    n,
                    self.rx_queue.len(),
                    &chunk[..n]
                );
                Ok(n)
            }
            Err(ref e)
                if e.kind() == io::ErrorKind::TimedOut || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(0)
            }
            Err(e) => Err(e),
        }
    }
}

impl Transport for SerialTransport {
    fn line_settings(&mut self) -> io::Result<LineSettings> {
        Ok(LineSettings {
            baud_rate: self.port.baud_rate().map_err(to_io)?,
            data_bits: self.port.data_bits().map_err(to_io)?,
            parity: self.port.parity().map_err(to_io)?,
            stop_bits: self.port.stop_bits().map_err(to_io)?,
            flow_control: self.port.flow_control().map_err(to_io)?,
        })
    }

    fn configure(&mut self, settings: &LineSettings) -> io::Result<()> {
        self.port.set_baud_rate(settings.baud_rate).map_err(to_io)?;
        self.port.set_data_bits(settings.data_bits).map_err(to_io)?;
        self.port.set_parity(settings.parity).map_err(to_io)?;
        self.port.set_stop_bits(settings.stop_bits).map_err(to_io)?;
        self.port
            .set_flow_control(settings.flow_control)
            .map_err(to_io)
    }

    fn set_reset_line(&mut self, level: bool) -> io::Result<()> {
        self.port.write_data_terminal_ready(level).map_err(to_io)
    }

    fn arm_sentinel(&mut self, sentinel: u8) -> io::Result<()> {
        self.sentinel = Some(sentinel);
        Ok(())
    }

    fn wait_for_sentinel(&mut self) -> io::Result<()> {
        let sentinel = self.sentinel.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "EOD detection not armed")
        })?;

        loop {
            if self.rx_queue.contains(&sentinel) {
                return Ok(());
            }
            if self.pump()? == 0 {
                std::thread::sleep(self.poll_interval);
            }
        }
    }

    fn bytes_queued(&mut self) -> io::Result<usize> {
        self.pump()?;
        Ok(self.rx_queue.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.rx_queue.is_empty() {
            self.pump()?;
        }
        let n = buf.len().min(self.rx_queue.len());
        buf[..n].copy_from_slice(&self.rx_queue[..n]);
        self.rx_queue.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let sent = self.port.write(data)?;
        self.port.flush()?;
        Ok(sent)
    }
}

/// Opens ports through the `serialport` crate
#[derive(Debug, Clone)]
pub struct SerialConnector {
    baud_rate: u32,
    poll_timeout: Duration,
}

impl SerialConnector {
    /// Connector opening ports at `baud_rate`
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            poll_timeout: Duration::from_millis(DEFAULT_POLL_TIMEOUT_MS),
        }
    }
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self::new(DEFAULT_BAUD_RATE)
    }
}

impl Connector for SerialConnector {
    type Transport = SerialTransport;

    fn open(&mut self, port: &str) -> io::Result<SerialTransport> {
        // Exclusive access is the serialport default on every platform
        let port = serialport::new(port, self.baud_rate)
            .timeout(self.poll_timeout)
            .open()
            .map_err(to_io)?;
        Ok(SerialTransport::new(port))
    }
}
