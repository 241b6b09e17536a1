//! Handshake sequencer
//!
//! Drives the fixed exchange with the device:
//!
//! ```text
//! ScanningPorts -> AwaitingStart -> SendingParameters -> AwaitingResult -> Done
//!        \               \                 \                    \
//!         +---------------+-----------------+--------------------+--> Aborted
//! ```
//!
//! Every failure aborts immediately. Nothing is retried.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::{
    find_port, locate_start_marker, Connector, ErrorKind, Frame, ParameterMessage,
    PortCandidates, ProtocolError, Session, SessionOptions, START_MARKER,
};

/// Sequencer state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandshakeState {
    /// Probing candidate ports
    ScanningPorts,
    /// Waiting for the device's start message
    AwaitingStart,
    /// Sending the parameter message
    SendingParameters,
    /// Waiting for the device's result
    AwaitingResult,
    /// Result received
    Done,
    /// A step failed
    Aborted,
}

impl fmt::Display for HandshakeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HandshakeState::ScanningPorts => "scanning ports",
            HandshakeState::AwaitingStart => "awaiting start message",
            HandshakeState::SendingParameters => "sending parameters",
            HandshakeState::AwaitingResult => "awaiting result",
            HandshakeState::Done => "done",
            HandshakeState::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What gets exchanged with the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeScript {
    /// Expected start message, sentinel included
    pub start_marker: Vec<u8>,
    /// Values sent once the start message arrived
    pub parameters: ParameterMessage,
}

impl Default for HandshakeScript {
    fn default() -> Self {
        Self {
            start_marker: START_MARKER.to_vec(),
            parameters: ParameterMessage::default(),
        }
    }
}

/// Everything observed during a successful handshake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeOutcome {
    /// Port the session ran on
    pub port_name: String,
    /// First frame as received, leading noise included
    pub start_frame: Frame,
    /// Start marker located at the end of `start_frame`
    pub start_marker: Vec<u8>,
    /// Parameter bytes written
    pub parameters: Vec<u8>,
    /// Result frame, sentinel included
    pub result: Frame,
}

/// Progress reported while a handshake runs, in the order it happens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeEvent<'a> {
    /// The sequencer entered a state
    Entered(HandshakeState),
    /// The scanner committed to this port; it is configured next
    PortCommitted(&'a str),
    /// First frame read, before the start marker is checked
    StartReceived(&'a Frame),
    /// Start marker found at the end of the first frame
    StartMarker(&'a [u8]),
    /// Parameter bytes written and acknowledged by EOD
    ParametersSent(&'a [u8]),
    /// Result frame read
    ResultReceived(&'a Frame),
}

type Observer<'o> = dyn FnMut(HandshakeEvent<'_>) + 'o;

/// A failed handshake: which step failed and why.
///
/// Displays as the failing step; the cause is available through `source()`.
#[derive(Error, Debug)]
#[error("{stage}")]
pub struct HandshakeError {
    /// State the sequencer was in when the failure occurred
    pub stage: HandshakeState,
    /// Port the session was opened on, if one was
    pub port: Option<String>,
    /// Underlying failure
    #[source]
    pub source: ProtocolError,
}

impl HandshakeError {
    /// Classification of the underlying failure
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Handshake state machine.
///
/// Owns the session for the duration of [`Handshake::run`]; the device is
/// closed exactly once whichever way the run ends.
pub struct Handshake<C: Connector> {
    connector: C,
    candidates: PortCandidates,
    options: SessionOptions,
    script: HandshakeScript,
    state: HandshakeState,
    transitions: Vec<HandshakeState>,
}

impl<C: Connector> Handshake<C> {
    /// Create a sequencer (nothing is opened yet)
    pub fn new(
        connector: C,
        candidates: PortCandidates,
        options: SessionOptions,
        script: HandshakeScript,
    ) -> Self {
        Self {
            connector,
            candidates,
            options,
            script,
            state: HandshakeState::ScanningPorts,
            transitions: Vec::new(),
        }
    }

    /// Current state
    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Every state entered during the last run, in order
    pub fn transitions(&self) -> &[HandshakeState] {
        &self.transitions
    }

    /// Connector used to open ports
    pub fn connector(&self) -> &C {
        &self.connector
    }

    fn enter(&mut self, state: HandshakeState, on_event: &mut Observer<'_>) {
        tracing::debug!("handshake: {:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
        on_event(HandshakeEvent::Entered(state));
    }

    /// Run the whole exchange
    pub fn run(&mut self) -> Result<HandshakeOutcome, HandshakeError> {
        self.run_with(|_| {})
    }

    /// Run the whole exchange, reporting progress to `on_event` as it
    /// happens. Reads block without a timeout, so this is the only way to see
    /// how far a stuck run got.
    pub fn run_with<F>(&mut self, mut on_event: F) -> Result<HandshakeOutcome, HandshakeError>
    where
        F: FnMut(HandshakeEvent<'_>),
    {
        self.transitions.clear();
        self.enter(HandshakeState::ScanningPorts, &mut on_event);

        let mut port = None;
        match self.drive(&mut port, &mut on_event) {
            Ok(outcome) => {
                self.enter(HandshakeState::Done, &mut on_event);
                Ok(outcome)
            }
            Err(source) => {
                let stage = self.state;
                self.enter(HandshakeState::Aborted, &mut on_event);
                tracing::warn!("handshake aborted while {stage}: {source:?}");
                Err(HandshakeError {
                    stage,
                    port,
                    source,
                })
            }
        }
    }

    fn drive(
        &mut self,
        port: &mut Option<String>,
        on_event: &mut Observer<'_>,
    ) -> Result<HandshakeOutcome, ProtocolError> {
        let (name, transport) = find_port(&mut self.connector, &self.candidates)?;
        on_event(HandshakeEvent::PortCommitted(&name));
        *port = Some(name.clone());

        let session = Session::establish(name, transport, &self.options)?;
        self.exchange(session, on_event)
    }

    /// Steps that need the session. It is dropped, closing the device, on
    /// every return from here.
    fn exchange(
        &mut self,
        mut session: Session<C::Transport>,
        on_event: &mut Observer<'_>,
    ) -> Result<HandshakeOutcome, ProtocolError> {
        self.enter(HandshakeState::AwaitingStart, on_event);
        let start_frame = session.read_frame()?;
        tracing::info!("start buffer contains {} bytes", start_frame.len());
        on_event(HandshakeEvent::StartReceived(&start_frame));
        let start_marker = locate_start_marker(&start_frame, &self.script.start_marker)?.to_vec();
        on_event(HandshakeEvent::StartMarker(&start_marker));

        self.enter(HandshakeState::SendingParameters, on_event);
        let parameters = self.script.parameters.encode();
        let sent = session.write_exact(&parameters)?;
        tracing::info!("parameters sent: {} bytes", sent);
        on_event(HandshakeEvent::ParametersSent(&parameters[..sent]));

        self.enter(HandshakeState::AwaitingResult, on_event);
        let result = session.read_frame()?;
        tracing::info!("result contains {} bytes", result.len());
        on_event(HandshakeEvent::ResultReceived(&result));

        let port_name = session.port_name().to_string();
        session.close();

        Ok(HandshakeOutcome {
            port_name,
            start_frame,
            start_marker,
            parameters,
            result,
        })
    }
}
