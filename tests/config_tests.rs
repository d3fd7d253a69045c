//! Configuration tests
//!
//! TOML loading, validation and the mapping to facade options.

use std::io::Write;

use clap::Parser;
use tempfile::NamedTempFile;

use nexen_metrics::Metrics;
use nexen_metrics::cli::Cli;
use nexen_metrics::config::StaticConfig;
use nexen_metrics::metrics::{LLM_LATENCY_BUCKETS, MEMORY_BUCKETS};

fn write_config(content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_from_file() {
    let file = write_config(
        r#"
[server]
listen_address = "127.0.0.1:9100"
metrics_path = "/stats"

[metrics]
service_name = "inference"
bucket_profile = "llm"

[logging]
level = "debug"
format = "json"
"#,
    );

    let config = StaticConfig::load(file.path().to_str()).unwrap();
    assert_eq!(config.server.bind_address().unwrap(), "127.0.0.1:9100");
    assert_eq!(config.server.metrics_path, "/stats");
    assert_eq!(config.metrics.service_name, "inference");
    assert_eq!(config.logging.format, "json");

    let options = config.metrics_config().unwrap();
    assert_eq!(options.service_name, "inference");
    assert_eq!(options.histogram_buckets, LLM_LATENCY_BUCKETS.to_vec());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"
[metrics]
service_name = "partial"
"#,
    );

    let config = StaticConfig::load(file.path().to_str()).unwrap();
    assert_eq!(config.server.listen_address, ":8080");
    assert_eq!(config.server.metrics_path, "/metrics");
    assert_eq!(config.metrics.bucket_profile, "http");
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_missing_explicit_file_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(StaticConfig::load(path.to_str()).is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let bad_profile = write_config("[metrics]\nbucket_profile = \"weekly\"\n");
    let config = StaticConfig::load(bad_profile.path().to_str()).unwrap();
    assert!(config.validate().is_err());

    let bad_buckets = write_config("[metrics]\nbuckets = [5.0, 1.0]\n");
    let config = StaticConfig::load(bad_buckets.path().to_str()).unwrap();
    assert!(config.validate().is_err());

    let bad_path = write_config("[server]\nmetrics_path = \"metrics\"\n");
    let config = StaticConfig::load(bad_path.path().to_str()).unwrap();
    assert!(config.validate().is_err());

    assert!(StaticConfig::from_toml_str("[server]\nlisten_address = \"nope\"\n").is_err());
}

#[test]
fn test_explicit_buckets_build_facade() {
    let config = StaticConfig::from_toml_str(
        r#"
[metrics]
service_name = "cache"
buckets = [50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 5000.0, 10000.0]
"#,
    )
    .unwrap();

    let metrics = Metrics::from_config(config.metrics_config().unwrap()).unwrap();
    assert_eq!(metrics.service_name(), "cache");
    assert_eq!(metrics.registry().default_buckets(), MEMORY_BUCKETS);
}

// =============================================================================
// Command line
// =============================================================================

#[test]
fn test_cli_overrides_file() {
    let file = write_config(
        r#"
[server]
listen_address = ":7000"

[metrics]
service_name = "from-file"
buckets = [1.0, 2.0]
"#,
    );
    let path = file.path().to_str().unwrap().to_string();

    let cli = Cli::try_parse_from([
        "nexen-metrics",
        "--config",
        path.as_str(),
        "--metrics.listen-address=:9200",
        "--bucket-profile",
        "memory",
    ])
    .unwrap();

    let mut config = StaticConfig::load(cli.config.as_deref()).unwrap();
    cli.apply(&mut config);
    config.validate().unwrap();

    assert_eq!(config.server.bind_address().unwrap(), "0.0.0.0:9200");
    assert_eq!(config.metrics.service_name, "from-file");
    assert_eq!(
        config.metrics_config().unwrap().histogram_buckets,
        MEMORY_BUCKETS.to_vec()
    );
}

#[test]
fn test_cli_override_repairs_invalid_file_value() {
    let file = write_config(
        r#"
[server]
metrics_path = "stats"
"#,
    );
    let path = file.path().to_str().unwrap().to_string();

    let cli = Cli::try_parse_from([
        "nexen-metrics",
        "--config",
        path.as_str(),
        "--metrics.path",
        "/stats",
    ])
    .unwrap();

    let mut config = StaticConfig::load(cli.config.as_deref()).unwrap();
    assert!(config.validate().is_err());

    cli.apply(&mut config);
    config.validate().unwrap();
    assert_eq!(config.server.metrics_path, "/stats");
}

#[test]
fn test_save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("exporter.toml");

    let mut config = StaticConfig::default();
    config.metrics.service_name = "saved".to_string();
    config.metrics.buckets = Some(vec![0.1, 1.0]);
    config.save_to_file(&path).unwrap();

    let reloaded = StaticConfig::load(path.to_str()).unwrap();
    assert_eq!(reloaded, config);
}
