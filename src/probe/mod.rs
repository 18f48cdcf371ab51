//! Phased latency probing.
//!
//! Endpoints are probed strictly one after another. For each endpoint the
//! request is prepared up front (URL + raw bytes), then a [`ProbeCycle`]
//! walks through resolve, connect, send and receive, timing each phase on
//! its own. A failure only ends the current endpoint; the run moves on.

pub mod cycle;
pub mod outcome;
pub mod timer;

pub use cycle::ProbeCycle;
pub use outcome::{ErrorKind, Phase, PhaseTimings, ProbeError, ProbeOutcome};

use std::time::Duration;
use tracing::{info, warn};

use crate::config::{EndpointSpec, TargetConfig};
use crate::http::parser::BoundaryPolicy;
use crate::http::url_builder::build_url;
use crate::http::writer::{RequestSerializer, SerializedRequest, DEFAULT_USER_AGENT};

pub const DEFAULT_MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Knobs shared by every probe cycle of a run.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub policy: BoundaryPolicy,
    pub resolve_timeout: Duration,
    pub connect_timeout: Duration,
    pub send_timeout: Duration,
    /// Longest wait for the next bytes of a response
    pub read_timeout: Duration,
    /// Largest response body accepted under the full policy
    pub max_body_size: usize,
    pub user_agent: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            policy: BoundaryPolicy::Full,
            resolve_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            send_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(10),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// A request ready to be probed.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: String,
    pub request: SerializedRequest,
}

pub struct Prober {
    settings: ProbeSettings,
    serializer: RequestSerializer,
}

impl Prober {
    pub fn new(settings: ProbeSettings) -> Self {
        let serializer = RequestSerializer::new(settings.user_agent.clone());
        Self {
            settings,
            serializer,
        }
    }

    /// Builds the URL and the raw request for `endpoint`. No network I/O.
    pub fn prepare(&self, target: &TargetConfig, endpoint: &EndpointSpec) -> Result<PreparedRequest, ProbeError> {
        let url = build_url(&target.base_url(endpoint), &endpoint.query_params)?;
        let request = self
            .serializer
            .serialize(endpoint.method, &url, &endpoint.body_params)?;

        Ok(PreparedRequest { url, request })
    }

    /// Runs one full probe cycle for `endpoint`.
    pub async fn probe_endpoint(&self, target: &TargetConfig, endpoint: &EndpointSpec) -> ProbeOutcome {
        let prepared = match self.prepare(target, endpoint) {
            Ok(prepared) => prepared,
            Err(error) => {
                let identity = format!("{} {}", endpoint.method, target.base_url(endpoint));
                warn!(endpoint = %identity, error = %error, "Endpoint could not be prepared");
                return ProbeOutcome::failed(identity, PhaseTimings::default(), error);
            }
        };

        let identity = format!("{} {}", endpoint.method, prepared.url);
        let cycle = ProbeCycle::new(&target.host, target.port, prepared.request, &self.settings);

        match cycle.run().await {
            (timings, Ok(response)) => {
                info!(
                    endpoint = %identity,
                    status = ?response.status(),
                    bytes = response.bytes_read,
                    total = ?timings.total(),
                    "Endpoint probed successfully"
                );
                ProbeOutcome::succeeded(identity, timings, response.status(), response.bytes_read)
            }
            (timings, Err(error)) => {
                warn!(
                    endpoint = %identity,
                    phase = %error.phase,
                    error = %error,
                    "Endpoint probe failed"
                );
                ProbeOutcome::failed(identity, timings, error)
            }
        }
    }

    /// Probes every endpoint of `target` in configuration order.
    ///
    /// `on_outcome` sees each outcome as soon as its cycle ends.
    pub async fn probe_all<F>(&self, target: &TargetConfig, mut on_outcome: F) -> Vec<ProbeOutcome>
    where
        F: FnMut(&ProbeOutcome),
    {
        let mut outcomes = Vec::with_capacity(target.endpoints.len());

        for endpoint in &target.endpoints {
            let outcome = self.probe_endpoint(target, endpoint).await;
            on_outcome(&outcome);
            outcomes.push(outcome);
        }

        outcomes
    }
}
