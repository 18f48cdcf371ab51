//! Human-readable rendering of probe outcomes.

use std::fmt::Write as _;
use std::time::Duration;

use crate::probe::{Phase, ProbeOutcome};

const REPORTED_PHASES: [Phase; 4] = [Phase::Resolve, Phase::Connect, Phase::Send, Phase::Receive];

/// Renders one outcome: the endpoint, the four phase timings in fixed
/// order, then the result line.
///
/// Phases that were never reached are shown as `-`.
pub fn render_outcome(outcome: &ProbeOutcome) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", outcome.endpoint);

    for phase in REPORTED_PHASES {
        let value = outcome
            .timings
            .get(phase)
            .map(format_duration)
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "  {:<8} {}", format!("{phase}:"), value);
    }

    match &outcome.error {
        None => {
            let status = outcome
                .status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "?".to_string());
            let _ = writeln!(out, "  ok: status {status}, {} bytes", outcome.bytes_received);
        }
        Some(error) => {
            let _ = writeln!(out, "  failed: {error}");
        }
    }

    out
}

fn format_duration(d: Duration) -> String {
    format!("{:.3}ms", d.as_secs_f64() * 1000.0)
}

/// Tally of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        let succeeded = outcomes.iter().filter(|o| o.success).count();
        Self {
            total: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
        }
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for RunSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} endpoints probed, {} succeeded, {} failed",
            self.total, self.succeeded, self.failed
        )
    }
}
