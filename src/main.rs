use std::process::ExitCode;

use phaseprobe::config::Config;
use phaseprobe::probe::Prober;
use phaseprobe::report::{render_outcome, RunSummary};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cfg = Config::load()?;
    tracing::info!(
        host = %cfg.target.host,
        port = cfg.target.port,
        endpoints = cfg.target.endpoints.len(),
        policy = ?cfg.settings.policy,
        "Starting probe run"
    );

    let prober = Prober::new(cfg.settings);

    let outcomes = tokio::select! {
        outcomes = prober.probe_all(&cfg.target, |outcome| println!("{}", render_outcome(outcome))) => outcomes,

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
            return Ok(ExitCode::from(130));
        }
    };

    let summary = RunSummary::from_outcomes(&outcomes);
    println!("{summary}");

    if summary.all_succeeded() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
