use std::fmt;
use std::time::Duration;

use crate::http::url_builder::UrlBuildError;
use crate::http::writer::SerializationError;

/// One of the measured network operations of a probe cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Building the URL and serializing the request, before any network I/O
    Prepare,
    Resolve,
    Connect,
    Send,
    Receive,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Resolve => "resolve",
            Phase::Connect => "connect",
            Phase::Send => "send",
            Phase::Receive => "receive",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a probe cycle failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UrlBuild,
    Serialization,
    ResolutionFailed,
    ConnectFailed,
    SendFailed,
    ReceiveFailed,
    ReceiveTimeout,
    EmptyResponse,
    MalformedResponse,
}

impl ErrorKind {
    /// The phase an error of this kind aborts.
    pub fn phase(&self) -> Phase {
        match self {
            ErrorKind::UrlBuild | ErrorKind::Serialization => Phase::Prepare,
            ErrorKind::ResolutionFailed => Phase::Resolve,
            ErrorKind::ConnectFailed => Phase::Connect,
            ErrorKind::SendFailed => Phase::Send,
            ErrorKind::ReceiveFailed
            | ErrorKind::ReceiveTimeout
            | ErrorKind::EmptyResponse
            | ErrorKind::MalformedResponse => Phase::Receive,
        }
    }
}

/// A failed phase together with its underlying cause.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{phase} phase failed ({kind:?}): {cause}")]
pub struct ProbeError {
    pub kind: ErrorKind,
    pub phase: Phase,
    pub cause: String,
}

impl ProbeError {
    pub fn new(kind: ErrorKind, cause: impl fmt::Display) -> Self {
        Self {
            kind,
            phase: kind.phase(),
            cause: cause.to_string(),
        }
    }
}

impl From<UrlBuildError> for ProbeError {
    fn from(e: UrlBuildError) -> Self {
        ProbeError::new(ErrorKind::UrlBuild, e)
    }
}

impl From<SerializationError> for ProbeError {
    fn from(e: SerializationError) -> Self {
        ProbeError::new(ErrorKind::Serialization, e)
    }
}

/// Wall-clock duration of each phase of one probe cycle.
///
/// A phase that was never reached stays `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub resolve: Option<Duration>,
    pub connect: Option<Duration>,
    pub send: Option<Duration>,
    pub receive: Option<Duration>,
}

impl PhaseTimings {
    pub fn get(&self, phase: Phase) -> Option<Duration> {
        match phase {
            Phase::Prepare => None,
            Phase::Resolve => self.resolve,
            Phase::Connect => self.connect,
            Phase::Send => self.send,
            Phase::Receive => self.receive,
        }
    }

    pub(crate) fn record(&mut self, phase: Phase, elapsed: Duration) {
        match phase {
            Phase::Prepare => {}
            Phase::Resolve => self.resolve = Some(elapsed),
            Phase::Connect => self.connect = Some(elapsed),
            Phase::Send => self.send = Some(elapsed),
            Phase::Receive => self.receive = Some(elapsed),
        }
    }

    /// Sum of all measured phases.
    pub fn total(&self) -> Duration {
        [self.resolve, self.connect, self.send, self.receive]
            .into_iter()
            .flatten()
            .sum()
    }
}

/// Result of probing one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Endpoint identity, e.g. `GET http://example.com/x?a=1`
    pub endpoint: String,
    pub timings: PhaseTimings,
    pub success: bool,
    pub error: Option<ProbeError>,
    /// Status code of the final response, when one was parsed
    pub status: Option<u16>,
    /// Raw bytes read before the response boundary
    pub bytes_received: usize,
}

impl ProbeOutcome {
    pub fn succeeded(
        endpoint: impl Into<String>,
        timings: PhaseTimings,
        status: Option<u16>,
        bytes_received: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            timings,
            success: true,
            error: None,
            status,
            bytes_received,
        }
    }

    pub fn failed(endpoint: impl Into<String>, timings: PhaseTimings, error: ProbeError) -> Self {
        Self {
            endpoint: endpoint.into(),
            timings,
            success: false,
            error: Some(error),
            status: None,
            bytes_received: 0,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}
