//! Session lifecycle and the framed read/write primitives

use std::time::Duration;

use super::{
    ConfigStep, Frame, LineSettings, ProtocolError, Transport, DEFAULT_FRAME_CAPACITY,
    DEFAULT_SENTINEL, DEFAULT_SETTLE_DELAY_MS,
};

/// Parameters applied to the committed port
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Line parameters
    pub line: LineSettings,
    /// End-of-delivery byte
    pub sentinel: u8,
    /// Wait after reset for the device to boot
    pub settle_delay: Duration,
    /// Largest frame accepted by [`Session::read_frame`]
    pub frame_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            line: LineSettings::default(),
            sentinel: DEFAULT_SENTINEL,
            settle_delay: Duration::from_millis(DEFAULT_SETTLE_DELAY_MS),
            frame_capacity: DEFAULT_FRAME_CAPACITY,
        }
    }
}

/// Open, configured connection to one device.
///
/// The device is closed when the session is dropped.
pub struct Session<T: Transport> {
    port_name: String,
    transport: T,
    line: LineSettings,
    sentinel: u8,
    frame_capacity: usize,
}

impl<T: Transport> Session<T> {
    /// Commit to an opened port: apply line settings, assert the reset
    /// line, arm EOD detection, then wait for the device to boot.
    ///
    /// Every failure here is fatal for the run.
    pub fn establish(
        port_name: impl Into<String>,
        mut transport: T,
        options: &SessionOptions,
    ) -> Result<Self, ProtocolError> {
        let port_name = port_name.into();
        let fail = |step: ConfigStep, e: std::io::Error| ProtocolError::Configuration {
            port: port_name.clone(),
            step,
            reason: e.to_string(),
        };

        transport
            .configure(&options.line)
            .map_err(|e| fail(ConfigStep::LineSettings, e))?;
        // Resets the microcontroller; it only starts the handshake after a reset
        transport
            .set_reset_line(true)
            .map_err(|e| fail(ConfigStep::ResetLine, e))?;
        transport
            .arm_sentinel(options.sentinel)
            .map_err(|e| fail(ConfigStep::Sentinel, e))?;

        tracing::debug!(
            "{}: configured {:?}, EOD 0x{:02x}, settling {}ms",
            port_name,
            options.line,
            options.sentinel,
            options.settle_delay.as_millis()
        );
        if !options.settle_delay.is_zero() {
            std::thread::sleep(options.settle_delay);
        }

        Ok(Self {
            port_name,
            transport,
            line: options.line,
            sentinel: options.sentinel,
            frame_capacity: options.frame_capacity,
        })
    }

    /// Device identifier the session was opened under
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Applied line settings
    pub fn line_settings(&self) -> &LineSettings {
        &self.line
    }

    /// Armed EOD byte
    pub fn sentinel(&self) -> u8 {
        self.sentinel
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Block (forever, if need be) until the device signals EOD, then drain
    /// exactly the bytes queued at that moment.
    pub fn read_frame(&mut self) -> Result<Frame, ProtocolError> {
        tracing::debug!("{}: waiting for EOD (no timeout)", self.port_name);
        self.transport.wait_for_sentinel()?;

        let queued = self.transport.bytes_queued()?;
        tracing::debug!("{}: {} bytes queued", self.port_name, queued);
        if queued == 0 {
            return Err(ProtocolError::NoData);
        }
        if queued > self.frame_capacity {
            return Err(ProtocolError::FrameOverflow {
                queued,
                capacity: self.frame_capacity,
            });
        }

        let mut buf = vec![0u8; queued];
        let mut filled = 0;
        while filled < queued {
            let n = self.transport.read(&mut buf[filled..])?;
            if n == 0 {
                return Err(ProtocolError::IoError(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("queue drained after {} of {} bytes", filled, queued),
                )));
            }
            filled += n;
        }

        tracing::trace!("{}: frame {:02x?}", self.port_name, buf);
        Ok(Frame::from_bytes(buf))
    }

    /// Send `data` in one write. A complete write is followed by an EOD
    /// wait so the next read cannot interleave with it.
    pub fn write_exact(&mut self, data: &[u8]) -> Result<usize, ProtocolError> {
        let written = self.transport.write(data)?;
        tracing::debug!(
            "{}: wrote {} of {} bytes: {:02x?}",
            self.port_name,
            written,
            data.len(),
            data
        );
        if written != data.len() {
            return Err(ProtocolError::ShortWrite {
                written,
                requested: data.len(),
            });
        }

        self.transport.wait_for_sentinel()?;
        Ok(written)
    }

    /// Close the device
    pub fn close(self) {
        tracing::debug!("{}: closing", self.port_name);
    }
}
