use std::io::Write;
use std::time::Duration;

use clap::Parser;
use phaseprobe::config::{Cli, Config, TargetConfig};
use phaseprobe::http::parser::BoundaryPolicy;
use phaseprobe::http::request::Method;

const YAML_TARGET: &str = r#"
scheme: http
host: example.com
port: 8080
endpoints:
  - path: /x
    method: GET
    query_params:
      a: 1
      b: "2"
  - path: /submit
    method: post
    body_params:
      action: dummy_ajax_call
"#;

// Same shape as the original tool's input files
const LEGACY_JSON_TARGET: &str = r#"{
  "proto": "http://",
  "base": "example.com",
  "port": "80",
  "links": [
    { "path": "/", "type": "GET", "argsGet": { "q": ["one", "two"] }, "argsPost": {} },
    { "path": "/admin-ajax.php", "type": "POST", "argsPost": { "action": "dummy_ajax_call" } }
  ]
}"#;

#[test]
fn test_parse_yaml_target() {
    let target = TargetConfig::parse(YAML_TARGET).unwrap();

    assert_eq!(target.scheme, "http");
    assert_eq!(target.host, "example.com");
    assert_eq!(target.port, 8080);
    assert_eq!(target.endpoints.len(), 2);

    let first = &target.endpoints[0];
    assert_eq!(first.method, Method::GET);
    assert_eq!(first.query_params.encode(), "a=1&b=2");
    assert!(first.body_params.is_empty());

    let second = &target.endpoints[1];
    assert_eq!(second.method, Method::POST);
    assert_eq!(second.body_params.encode(), "action=dummy_ajax_call");
}

#[test]
fn test_parse_legacy_json_target() {
    let target = TargetConfig::parse(LEGACY_JSON_TARGET).unwrap();

    assert_eq!(target.scheme, "http");
    assert_eq!(target.host, "example.com");
    assert_eq!(target.port, 80);
    assert_eq!(target.endpoints.len(), 2);

    let values: Vec<&str> = target.endpoints[0].query_params.get_all("q").collect();
    assert_eq!(values, vec!["one", "two"]);
    assert_eq!(target.endpoints[1].method, Method::POST);
}

#[test]
fn test_method_defaults_to_get() {
    let target = TargetConfig::parse("host: localhost\nendpoints:\n  - path: /\n").unwrap();

    assert_eq!(target.port, 80);
    assert_eq!(target.endpoints[0].method, Method::GET);
}

#[test]
fn test_base_url() {
    let target = TargetConfig::parse(YAML_TARGET).unwrap();
    assert_eq!(target.base_url(&target.endpoints[0]), "http://example.com:8080/x");

    let v6 = TargetConfig::parse("host: \"::1\"\nport: 9000\nendpoints:\n  - path: /a\n").unwrap();
    assert_eq!(v6.base_url(&v6.endpoints[0]), "http://[::1]:9000/a");
}

#[test]
fn test_rejects_unknown_method() {
    let result = TargetConfig::parse("host: localhost\nendpoints:\n  - path: /\n    method: DELETE\n");
    assert!(result.is_err());
}

#[test]
fn test_rejects_invalid_port() {
    assert!(TargetConfig::parse("host: localhost\nport: 70000\n").is_err());
    assert!(TargetConfig::parse("host: localhost\nport: \"http\"\n").is_err());
    assert!(TargetConfig::parse("host: localhost\nport: 0\n").is_err());
}

#[test]
fn test_rejects_tls_scheme() {
    let err = TargetConfig::parse("scheme: https\nhost: localhost\n").unwrap_err();
    assert!(err.to_string().contains("unsupported scheme"));
}

#[test]
fn test_rejects_empty_host() {
    assert!(TargetConfig::parse("host: \"\"\n").is_err());
    assert!(TargetConfig::parse("host: example.com/path\n").is_err());
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(YAML_TARGET.as_bytes()).unwrap();

    let target = TargetConfig::load(file.path()).unwrap();
    assert_eq!(target.endpoints.len(), 2);
}

#[test]
fn test_load_missing_file_mentions_path() {
    let err = TargetConfig::load(std::path::Path::new("/nonexistent/target.yaml")).unwrap_err();
    assert!(format!("{err:#}").contains("/nonexistent/target.yaml"));
}

#[test]
fn test_cli_defaults() {
    let cli = Cli::try_parse_from(["phaseprobe", "-f", "target.yaml"]).unwrap();
    let settings = cli.settings();

    assert_eq!(cli.file, std::path::PathBuf::from("target.yaml"));
    assert_eq!(settings.policy, BoundaryPolicy::Full);
    assert_eq!(settings.read_timeout, Duration::from_secs(10));
    assert_eq!(settings.connect_timeout, Duration::from_secs(5));
    assert_eq!(settings.max_body_size, 16 * 1024 * 1024);
    assert!(settings.user_agent.starts_with("phaseprobe/"));
}

#[test]
fn test_cli_overrides() {
    let cli = Cli::try_parse_from([
        "phaseprobe",
        "--file",
        "t.json",
        "--policy",
        "header-only",
        "--read-timeout-ms",
        "250",
        "--max-body-bytes",
        "4096",
        "--user-agent",
        "probe-test",
    ])
    .unwrap();
    let settings = cli.settings();

    assert_eq!(settings.policy, BoundaryPolicy::HeaderOnly);
    assert_eq!(settings.read_timeout, Duration::from_millis(250));
    assert_eq!(settings.max_body_size, 4096);
    assert_eq!(settings.user_agent, "probe-test");
}

#[test]
fn test_cli_rejects_zero_timeout() {
    let result = Cli::try_parse_from(["phaseprobe", "-f", "t.yaml", "--read-timeout-ms", "0"]);
    assert!(result.is_err());
}

#[test]
fn test_config_from_cli() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(LEGACY_JSON_TARGET.as_bytes()).unwrap();

    let path = file.path().to_str().unwrap().to_string();
    let cli = Cli::try_parse_from(["phaseprobe", "-f", path.as_str()]).unwrap();
    let cfg = Config::from_cli(&cli).unwrap();

    assert_eq!(cfg.target.host, "example.com");
    assert_eq!(cfg.settings.policy, BoundaryPolicy::Full);
}
