//! Run configuration: the probed target (from a YAML/JSON file) and the
//! probe settings (from command-line flags or environment variables).

use anyhow::{Context, bail};
use clap::Parser;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::http::params::Params;
use crate::http::parser::BoundaryPolicy;
use crate::http::request::Method;
use crate::http::writer::DEFAULT_USER_AGENT;
use crate::probe::ProbeSettings;

/// One HTTP endpoint to probe.
///
/// The original tool's field names (`type`, `argsGet`, `argsPost`) are
/// accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EndpointSpec {
    #[serde(default)]
    pub path: String,
    #[serde(default, alias = "type")]
    pub method: Method,
    #[serde(default, alias = "argsGet")]
    pub query_params: Params,
    #[serde(default, alias = "argsPost")]
    pub body_params: Params,
}

/// The host every endpoint is probed on.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TargetConfig {
    #[serde(default = "default_scheme", alias = "proto", deserialize_with = "deserialize_scheme")]
    pub scheme: String,
    #[serde(alias = "base")]
    pub host: String,
    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,
    #[serde(default, alias = "links", alias = "link")]
    pub endpoints: Vec<EndpointSpec>,
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_port() -> u16 {
    80
}

fn deserialize_scheme<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim().trim_end_matches("://").to_ascii_lowercase())
}

fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PortValue {
        Number(u64),
        Text(String),
    }

    let port = match PortValue::deserialize(deserializer)? {
        PortValue::Number(n) => u16::try_from(n).ok(),
        PortValue::Text(s) => s.trim().parse::<u16>().ok(),
    };

    match port {
        Some(p) if p != 0 => Ok(p),
        _ => Err(serde::de::Error::custom("port must be a number between 1 and 65535")),
    }
}

impl TargetConfig {
    /// Reads and validates a target file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading target file {}", path.display()))?;

        Self::parse(&contents).with_context(|| format!("parsing target file {}", path.display()))
    }

    /// Parses a YAML (or JSON) target document.
    pub fn parse(contents: &str) -> anyhow::Result<Self> {
        let target: TargetConfig = serde_yaml::from_str(contents)?;
        target.validate()?;
        Ok(target)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.scheme != "http" {
            bail!("unsupported scheme `{}`: only plain http is probed", self.scheme);
        }

        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }

        if self.host.contains('/') {
            bail!("host `{}` must be a bare host name, without a path", self.host);
        }

        Ok(())
    }

    /// `scheme://host:port/path` for an endpoint, without its query string.
    pub fn base_url(&self, endpoint: &EndpointSpec) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };

        format!("{}://{}:{}{}", self.scheme, host, self.port, endpoint.path)
    }
}

/// Command-line flags.
#[derive(Debug, Parser)]
#[command(
    name = "phaseprobe",
    version,
    about = "Times DNS resolution, TCP connect, send and receive of raw HTTP requests"
)]
pub struct Cli {
    /// Target file (YAML or JSON)
    #[arg(short = 'f', long = "file", env = "PHASEPROBE_FILE")]
    pub file: PathBuf,

    /// When the receive phase ends
    #[arg(long, value_enum, default_value_t = BoundaryPolicy::Full, env = "PHASEPROBE_POLICY")]
    pub policy: BoundaryPolicy,

    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..), env = "PHASEPROBE_RESOLVE_TIMEOUT_MS")]
    pub resolve_timeout_ms: u64,

    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..), env = "PHASEPROBE_CONNECT_TIMEOUT_MS")]
    pub connect_timeout_ms: u64,

    #[arg(long, default_value_t = 5000, value_parser = clap::value_parser!(u64).range(1..), env = "PHASEPROBE_SEND_TIMEOUT_MS")]
    pub send_timeout_ms: u64,

    /// Inactivity window while reading the response
    #[arg(long, default_value_t = 10000, value_parser = clap::value_parser!(u64).range(1..), env = "PHASEPROBE_READ_TIMEOUT_MS")]
    pub read_timeout_ms: u64,

    /// Largest response body read under the full policy
    #[arg(long, default_value_t = 16 * 1024 * 1024, value_parser = clap::value_parser!(u64).range(1..), env = "PHASEPROBE_MAX_BODY_BYTES")]
    pub max_body_bytes: u64,

    #[arg(long, env = "PHASEPROBE_USER_AGENT")]
    pub user_agent: Option<String>,
}

impl Cli {
    pub fn settings(&self) -> ProbeSettings {
        ProbeSettings {
            policy: self.policy,
            resolve_timeout: Duration::from_millis(self.resolve_timeout_ms),
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            send_timeout: Duration::from_millis(self.send_timeout_ms),
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            max_body_size: usize::try_from(self.max_body_bytes).unwrap_or(usize::MAX),
            user_agent: self
                .user_agent
                .clone()
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub target: TargetConfig,
    pub settings: ProbeSettings,
}

impl Config {
    /// Parses the process arguments and loads the target file.
    pub fn load() -> anyhow::Result<Self> {
        Self::from_cli(&Cli::parse())
    }

    pub fn from_cli(cli: &Cli) -> anyhow::Result<Self> {
        Ok(Self {
            target: TargetConfig::load(&cli.file)?,
            settings: cli.settings(),
        })
    }
}
