#![allow(dead_code)]

use eodlink_core::protocol::{Connector, LineSettings, Transport};
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};

/// Something the mock device does when the client waits for EOD
pub enum Delivery {
    /// Bytes arrive on the line
    Bytes(Vec<u8>),
    /// EOD is signalled although nothing is queued
    SpuriousWake,
}

/// Mock serial port replaying scripted deliveries
pub struct MockSerial {
    pub rx_queue: Vec<u8>,
    pub deliveries: VecDeque<Delivery>,
    /// Bytes the device received, shared so tests can inspect them after close
    pub sent: Arc<Mutex<Vec<u8>>>,
    pub accept_limit: Option<usize>,
    pub sentinel: Option<u8>,
    pub applied: Option<LineSettings>,
    pub dtr: bool,
    pub fail_settings: bool,
    pub fail_configure: bool,
    pub fail_reset_line: bool,
    pub fail_arm: bool,
    /// When the script runs dry, block on this until the test drops the sender
    pub stall: Option<Receiver<()>>,
    pub closes: Arc<AtomicUsize>,
}

impl MockSerial {
    pub fn new() -> Self {
        Self {
            rx_queue: Vec::new(),
            deliveries: VecDeque::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            accept_limit: None,
            sentinel: None,
            applied: None,
            dtr: false,
            fail_settings: false,
            fail_configure: false,
            fail_reset_line: false,
            fail_arm: false,
            stall: None,
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Device that sends each frame in turn
    pub fn with_frames(frames: &[&[u8]]) -> Self {
        let mut mock = Self::new();
        for frame in frames {
            mock.deliveries.push_back(Delivery::Bytes(frame.to_vec()));
        }
        mock
    }

    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.closes)
    }

    pub fn sent_log(&self) -> Arc<Mutex<Vec<u8>>> {
        Arc::clone(&self.sent)
    }
}

impl Drop for MockSerial {
    fn drop(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

fn refused(what: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, what.to_string())
}

impl Transport for MockSerial {
    fn line_settings(&mut self) -> io::Result<LineSettings> {
        if self.fail_settings {
            return Err(refused("not a comm device"));
        }
        Ok(self.applied.unwrap_or_default())
    }

    fn configure(&mut self, settings: &LineSettings) -> io::Result<()> {
        if self.fail_configure {
            return Err(refused("SetCommState refused"));
        }
        self.applied = Some(*settings);
        Ok(())
    }

    fn set_reset_line(&mut self, level: bool) -> io::Result<()> {
        if self.fail_reset_line {
            return Err(refused("DTR refused"));
        }
        self.dtr = level;
        Ok(())
    }

    fn arm_sentinel(&mut self, sentinel: u8) -> io::Result<()> {
        if self.fail_arm {
            return Err(refused("SetCommMask refused"));
        }
        self.sentinel = Some(sentinel);
        Ok(())
    }

    fn wait_for_sentinel(&mut self) -> io::Result<()> {
        let sentinel = self
            .sentinel
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "not armed"))?;
        loop {
            if self.rx_queue.contains(&sentinel) {
                return Ok(());
            }
            match self.deliveries.pop_front() {
                Some(Delivery::Bytes(bytes)) => self.rx_queue.extend_from_slice(&bytes),
                Some(Delivery::SpuriousWake) => return Ok(()),
                None => {
                    if let Some(stall) = &self.stall {
                        // Only returns once the test hangs up
                        let _ = stall.recv();
                    }
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "device went quiet",
                    ));
                }
            }
        }
    }

    fn bytes_queued(&mut self) -> io::Result<usize> {
        Ok(self.rx_queue.len())
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.rx_queue.len());
        buf[..n].copy_from_slice(&self.rx_queue[..n]);
        self.rx_queue.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let n = self.accept_limit.map_or(data.len(), |limit| limit.min(data.len()));
        self.sent
            .lock()
            .map_err(|_| refused("poisoned"))?
            .extend_from_slice(&data[..n]);
        Ok(n)
    }
}

/// What a port name resolves to
pub enum Slot {
    Missing,
    Ready(MockSerial),
}

/// Connector handing out mock ports by name
pub struct MockConnector {
    pub slots: Vec<(String, Slot)>,
    pub attempts: Vec<String>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            attempts: Vec::new(),
        }
    }

    pub fn with(mut self, name: &str, slot: Slot) -> Self {
        self.slots.push((name.to_string(), slot));
        self
    }
}

impl Connector for MockConnector {
    type Transport = MockSerial;

    fn open(&mut self, port: &str) -> io::Result<MockSerial> {
        self.attempts.push(port.to_string());
        let slot = self
            .slots
            .iter_mut()
            .find(|(name, _)| name == port)
            .map(|(_, slot)| std::mem::replace(slot, Slot::Missing));
        match slot {
            Some(Slot::Ready(mock)) => Ok(mock),
            _ => Err(io::Error::new(io::ErrorKind::NotFound, "no such port")),
        }
    }
}
