//! Console transcript of a handshake

use eodlink_core::protocol::{HandshakeEvent, HandshakeState, PortInfo};
use std::fmt::Write;

/// Lines printed when `event` happens, without the trailing newline
pub fn event(event: &HandshakeEvent<'_>) -> Option<String> {
    let text = match event {
        HandshakeEvent::Entered(HandshakeState::AwaitingStart) => "get start message".to_string(),
        HandshakeEvent::Entered(HandshakeState::SendingParameters) => "send parameters".to_string(),
        HandshakeEvent::Entered(HandshakeState::AwaitingResult) => "get result".to_string(),
        HandshakeEvent::Entered(_) => return None,
        HandshakeEvent::PortCommitted(port) => format!("active port: {}", port),
        HandshakeEvent::StartReceived(frame) => {
            format!("start buffer contains {} bytes", frame.len())
        }
        HandshakeEvent::StartMarker(marker) => {
            format!("start message:\n> \n{}< ", String::from_utf8_lossy(marker))
        }
        HandshakeEvent::ParametersSent(bytes) => format!("parameters sent: {} bytes", bytes.len()),
        HandshakeEvent::ResultReceived(frame) => format!(
            "result contains {} bytes:\n> \n{}< ",
            frame.len(),
            frame.to_text_lossy()
        ),
    };
    Some(text)
}

/// Final line of a failed run
pub fn failure(error: &anyhow::Error) -> String {
    format!("Error {:#}, exit", error)
}

/// One line per port for `--list`; `probed` ports are the scan candidates
pub fn port_line(port: &PortInfo, probed: bool) -> String {
    let mut line = format!("{} {}", if probed { '*' } else { ' ' }, port.name);
    if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        let _ = write!(line, "  [{:04x}:{:04x}]", vid, pid);
    }
    let label: Vec<&str> = [port.manufacturer.as_deref(), port.product.as_deref()]
        .into_iter()
        .flatten()
        .collect();
    if !label.is_empty() {
        let _ = write!(line, "  {}", label.join(" "));
    }
    if let Some(serial) = &port.serial_number {
        let _ = write!(line, "  s/n {}", serial);
    }
    line
}
