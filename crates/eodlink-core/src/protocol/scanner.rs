//! Port scanning
//!
//! Probes a fixed list of device identifiers and commits to the first one
//! that opens and reports serial line settings.

use std::ops::RangeInclusive;

use super::{
    Connector, ProtocolError, Session, SessionOptions, Transport, DEFAULT_SCAN_FIRST,
    DEFAULT_SCAN_LAST,
};

/// Prefix of numbered port names on this platform
#[cfg(windows)]
pub const PLATFORM_PORT_PREFIX: &str = "COM";
/// Prefix of numbered port names on this platform
#[cfg(target_os = "macos")]
pub const PLATFORM_PORT_PREFIX: &str = "/dev/cu.usbmodem";
/// Prefix of numbered port names on this platform
#[cfg(not(any(windows, target_os = "macos")))]
pub const PLATFORM_PORT_PREFIX: &str = "/dev/ttyACM";

/// Ordered device identifiers to probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortCandidates {
    names: Vec<String>,
}

impl PortCandidates {
    /// `prefix` followed by each index in `range`, e.g. COM0 ... COM9
    pub fn numbered(prefix: &str, range: RangeInclusive<u8>) -> Self {
        Self {
            names: range.map(|i| format!("{}{}", prefix, i)).collect(),
        }
    }

    /// A single explicit port
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            names: vec![name.into()],
        }
    }

    /// Indices 0..=9 with the platform prefix
    pub fn platform_default() -> Self {
        Self::numbered(PLATFORM_PORT_PREFIX, DEFAULT_SCAN_FIRST..=DEFAULT_SCAN_LAST)
    }

    /// Candidate names in probe order
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

impl Default for PortCandidates {
    fn default() -> Self {
        Self::platform_default()
    }
}

/// Open the first candidate that reports serial line settings.
///
/// Ports that fail to open or cannot report line settings are skipped and
/// closed again. Nothing is configured yet.
pub fn find_port<C: Connector>(
    connector: &mut C,
    candidates: &PortCandidates,
) -> Result<(String, C::Transport), ProtocolError> {
    for name in candidates.names() {
        let mut transport = match connector.open(name) {
            Ok(t) => t,
            Err(e) => {
                let skip = ProtocolError::OpenFailed {
                    port: name.clone(),
                    reason: e.to_string(),
                };
                tracing::debug!("skipping: {skip}");
                continue;
            }
        };

        match transport.line_settings() {
            Ok(current) => {
                tracing::info!("active port: {} (was {:?})", name, current);
                return Ok((name.clone(), transport));
            }
            Err(e) => {
                let skip = ProtocolError::NotASerialDevice {
                    port: name.clone(),
                    reason: e.to_string(),
                };
                tracing::debug!("skipping: {skip}");
            }
        }
    }

    Err(ProtocolError::NoPortFound {
        tried: candidates.names().to_vec(),
    })
}

/// Open the first usable candidate and establish a session on it.
///
/// Once a port has been committed to, configuration failures are returned
/// as-is; no further candidates are tried.
pub fn scan<C: Connector>(
    connector: &mut C,
    candidates: &PortCandidates,
    options: &SessionOptions,
) -> Result<Session<C::Transport>, ProtocolError> {
    let (name, transport) = find_port(connector, candidates)?;
    Session::establish(name, transport, options)
}
