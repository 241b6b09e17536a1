//! Frames received from the device and messages sent to it

use std::borrow::Cow;

use super::{ProtocolError, DEFAULT_PARAMETERS};

/// Bytes drained from the transport after an EOD notification.
///
/// The payload may carry leading noise (stray nulls, even spurious
/// sentinels). Consumers that expect a specific message take a suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Vec<u8>,
}

impl Frame {
    /// Wrap received bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw frame content
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the frame, returning its bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Number of bytes received
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if no bytes were received
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Last `n` bytes, or `None` if the frame is shorter
    pub fn suffix(&self, n: usize) -> Option<&[u8]> {
        let start = self.bytes.len().checked_sub(n)?;
        Some(&self.bytes[start..])
    }

    /// True if the last byte is `sentinel`
    pub fn ends_with_sentinel(&self, sentinel: u8) -> bool {
        self.bytes.last() == Some(&sentinel)
    }

    /// Lossy text rendering for display
    pub fn to_text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }
}

/// Find `marker` at the end of `frame`, tolerating leading noise
pub fn locate_start_marker<'a>(frame: &'a Frame, marker: &[u8]) -> Result<&'a [u8], ProtocolError> {
    let tail = frame
        .suffix(marker.len())
        .ok_or(ProtocolError::StartMarkerTooShort {
            received: frame.len(),
            expected: marker.len(),
        })?;

    if tail != marker {
        return Err(ProtocolError::StartMarkerMismatch {
            expected: String::from_utf8_lossy(marker).into_owned(),
            actual: String::from_utf8_lossy(tail).into_owned(),
        });
    }

    Ok(tail)
}

/// Two three-digit integers separated by a tab, e.g. `111\t222`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterMessage {
    first: u16,
    second: u16,
}

impl ParameterMessage {
    /// Encoded length on the wire
    pub const LEN: usize = 7;

    /// Build a message; each value must fit in three decimal digits
    pub fn new(first: u16, second: u16) -> Result<Self, ProtocolError> {
        for value in [first, second] {
            if value > 999 {
                return Err(ProtocolError::ParameterOutOfRange(value));
            }
        }
        Ok(Self { first, second })
    }

    /// The two values
    pub fn values(&self) -> (u16, u16) {
        (self.first, self.second)
    }

    /// Wire encoding, zero padded, no sentinel
    pub fn encode(&self) -> Vec<u8> {
        format!("{:03}\t{:03}", self.first, self.second).into_bytes()
    }
}

impl Default for ParameterMessage {
    fn default() -> Self {
        Self {
            first: DEFAULT_PARAMETERS[0],
            second: DEFAULT_PARAMETERS[1],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_marker_found_after_noise() {
        let frame = Frame::from_bytes(b"\0#X!start!#".to_vec());
        let marker = locate_start_marker(&frame, b"!start!#").unwrap();
        assert_eq!(marker, b"!start!#");
    }

    #[test]
    fn test_marker_exact() {
        let frame = Frame::from_bytes(b"!start!#".to_vec());
        assert!(locate_start_marker(&frame, b"!start!#").is_ok());
    }

    #[test]
    fn test_marker_too_short() {
        let frame = Frame::from_bytes(b"!sta#".to_vec());
        match locate_start_marker(&frame, b"!start!#") {
            Err(ProtocolError::StartMarkerTooShort { received, expected }) => {
                assert_eq!((received, expected), (5, 8));
            }
            other => panic!("expected StartMarkerTooShort, got {:?}", other),
        }
    }

    #[test]
    fn test_marker_mismatch() {
        let frame = Frame::from_bytes(b"garbage!#".to_vec());
        assert!(matches!(
            locate_start_marker(&frame, b"!start!#"),
            Err(ProtocolError::StartMarkerMismatch { .. })
        ));
    }

    #[test]
    fn test_frame_helpers() {
        let frame = Frame::from_bytes(b"42 OK#".to_vec());
        assert_eq!(frame.len(), 6);
        assert!(frame.ends_with_sentinel(b'#'));
        assert_eq!(frame.suffix(3), Some(&b"OK#"[..]));
        assert_eq!(frame.suffix(7), None);
        assert_eq!(frame.to_text_lossy(), "42 OK#");
    }

    #[test]
    fn test_parameter_encoding() {
        let msg = ParameterMessage::new(111, 222).unwrap();
        assert_eq!(msg.encode(), b"111\t222".to_vec());
        assert_eq!(msg.encode().len(), ParameterMessage::LEN);

        assert_eq!(ParameterMessage::default(), msg);

        let padded = ParameterMessage::new(7, 42).unwrap();
        assert_eq!(padded.encode(), b"007\t042".to_vec());
    }

    #[test]
    fn test_parameter_out_of_range() {
        assert!(matches!(
            ParameterMessage::new(1000, 1),
            Err(ProtocolError::ParameterOutOfRange(1000))
        ));
    }
}
