//! The per-endpoint probe state machine.

use std::net::SocketAddr;
use tokio::net::{lookup_host, TcpStream};
use tokio::time::timeout;
use tracing::debug;

use crate::http::parser::BoundaryPolicy;
use crate::http::reader::{ReadError, ResponseReader};
use crate::http::response::Response;
use crate::http::writer::{RequestWriter, SerializedRequest};
use crate::probe::outcome::{ErrorKind, Phase, PhaseTimings, ProbeError};
use crate::probe::timer::timed;
use crate::probe::ProbeSettings;

pub enum CycleState {
    Idle,
    Resolving,
    Connecting(SocketAddr),
    Sending(TcpStream),
    Receiving(TcpStream),
    Done(Response),
    Failed(ProbeError),
}

/// One resolve → connect → send → receive pass against a single host.
///
/// The connection lives inside the `Sending`/`Receiving` states, so it is
/// dropped (and closed) as soon as the cycle leaves them, on every path.
pub struct ProbeCycle<'a> {
    host: &'a str,
    port: u16,
    settings: &'a ProbeSettings,
    writer: RequestWriter,
    timings: PhaseTimings,
    state: CycleState,
}

impl<'a> ProbeCycle<'a> {
    pub fn new(host: &'a str, port: u16, request: SerializedRequest, settings: &'a ProbeSettings) -> Self {
        Self {
            host,
            port,
            settings,
            writer: RequestWriter::new(request),
            timings: PhaseTimings::default(),
            state: CycleState::Idle,
        }
    }

    pub async fn run(mut self) -> (PhaseTimings, Result<Response, ProbeError>) {
        loop {
            let state = std::mem::replace(&mut self.state, CycleState::Idle);

            self.state = match state {
                CycleState::Idle => CycleState::Resolving,

                CycleState::Resolving => {
                    let (result, elapsed) = timed(self.resolve()).await;
                    self.record(Phase::Resolve, elapsed);

                    match result {
                        Ok(addr) => CycleState::Connecting(addr),
                        Err(e) => CycleState::Failed(e),
                    }
                }

                CycleState::Connecting(addr) => {
                    let (result, elapsed) = timed(self.connect(addr)).await;
                    self.record(Phase::Connect, elapsed);

                    match result {
                        Ok(stream) => CycleState::Sending(stream),
                        Err(e) => CycleState::Failed(e),
                    }
                }

                CycleState::Sending(mut stream) => {
                    let (result, elapsed) = timed(self.send(&mut stream)).await;
                    self.record(Phase::Send, elapsed);

                    match result {
                        Ok(()) => CycleState::Receiving(stream),
                        Err(e) => CycleState::Failed(e),
                    }
                }

                CycleState::Receiving(mut stream) => {
                    let (result, elapsed) = timed(self.receive(&mut stream)).await;
                    self.record(Phase::Receive, elapsed);
                    drop(stream);

                    match result {
                        Ok(response) => CycleState::Done(response),
                        Err(e) => CycleState::Failed(e),
                    }
                }

                CycleState::Done(response) => return (self.timings, Ok(response)),

                CycleState::Failed(error) => return (self.timings, Err(error)),
            };
        }
    }

    fn record(&mut self, phase: Phase, elapsed: std::time::Duration) {
        debug!(phase = %phase, elapsed = ?elapsed, "phase finished");
        self.timings.record(phase, elapsed);
    }

    async fn resolve(&self) -> Result<SocketAddr, ProbeError> {
        let limit = self.settings.resolve_timeout;

        let mut addrs = timeout(limit, lookup_host((self.host, self.port)))
            .await
            .map_err(|_| {
                ProbeError::new(
                    ErrorKind::ResolutionFailed,
                    format!("resolving {} timed out after {:?}", self.host, limit),
                )
            })?
            .map_err(|e| ProbeError::new(ErrorKind::ResolutionFailed, format!("resolving {}: {e}", self.host)))?;

        addrs.next().ok_or_else(|| {
            ProbeError::new(
                ErrorKind::ResolutionFailed,
                format!("no addresses found for {}", self.host),
            )
        })
    }

    async fn connect(&self, addr: SocketAddr) -> Result<TcpStream, ProbeError> {
        let limit = self.settings.connect_timeout;

        timeout(limit, TcpStream::connect(addr))
            .await
            .map_err(|_| {
                ProbeError::new(
                    ErrorKind::ConnectFailed,
                    format!("connecting to {addr} timed out after {limit:?}"),
                )
            })?
            .map_err(|e| ProbeError::new(ErrorKind::ConnectFailed, format!("connecting to {addr}: {e}")))
    }

    async fn send(&mut self, stream: &mut TcpStream) -> Result<(), ProbeError> {
        let limit = self.settings.send_timeout;

        timeout(limit, self.writer.write_to_stream(stream))
            .await
            .map_err(|_| {
                ProbeError::new(
                    ErrorKind::SendFailed,
                    format!(
                        "sending request timed out after {limit:?} ({} bytes written)",
                        self.writer.written()
                    ),
                )
            })?
            .map_err(|e| ProbeError::new(ErrorKind::SendFailed, e))
    }

    async fn receive(&self, stream: &mut TcpStream) -> Result<Response, ProbeError> {
        let policy = self.settings.policy;
        let mut reader = ResponseReader::new(policy, self.settings.read_timeout)
            .with_body_limit(self.settings.max_body_size);

        let response = reader.read_response(stream).await.map_err(|e| {
            let kind = match &e {
                ReadError::Empty => ErrorKind::EmptyResponse,
                ReadError::Timeout(_) => ErrorKind::ReceiveTimeout,
                ReadError::Malformed(_) => ErrorKind::MalformedResponse,
                ReadError::Closed(_) | ReadError::BodyTooLarge(_) | ReadError::Io(_) => {
                    ErrorKind::ReceiveFailed
                }
            };
            ProbeError::new(kind, e)
        })?;

        if policy == BoundaryPolicy::Full && response.body.is_empty() {
            let cause = match response.status() {
                Some(status) => format!("{status} response has an empty body"),
                None => "response has an empty body".to_string(),
            };
            return Err(ProbeError::new(ErrorKind::EmptyResponse, cause));
        }

        Ok(response)
    }
}
