//! Configuration loading and CLI override tests.

use std::io::Write;

use clap::Parser;
use serial_test::serial;
use syslog_decode::PipelineConfig;
use syslog_decode_core::config::SyslogConfig;
use syslog_decode_daemon::cli::DaemonCli;

const EXAMPLE: &str = include_str!("../../syslog-decode.toml.example");

#[test]
fn example_config_matches_defaults() {
    let example = SyslogConfig::parse(EXAMPLE).unwrap();
    let defaults = SyslogConfig::default();
    assert_eq!(
        PipelineConfig::from_core(&example),
        PipelineConfig::from_core(&defaults)
    );
}

#[test]
fn cli_defaults_leave_config_untouched() {
    let cli = DaemonCli::parse_from(["syslogd"]);
    assert!(!cli.validate);
    assert_eq!(
        cli.config.to_str(),
        Some("/etc/syslog-decode/syslog-decode.toml")
    );

    let mut config = SyslogConfig::default();
    cli.apply_overrides(&mut config);
    assert_eq!(config.listener.bind_addr, "127.0.0.1:514");
    assert!(!config.forward.enabled);
}

#[test]
fn cli_overrides_take_precedence() {
    let cli = DaemonCli::parse_from([
        "syslogd",
        "--config",
        "/tmp/x.toml",
        "--log-level",
        "debug",
        "--log-format",
        "pretty",
        "--bind",
        "0.0.0.0:5514",
        "--threads",
        "3",
        "--forward",
        "192.0.2.10:514",
        "--validate",
    ]);
    assert!(cli.validate);

    let mut config = SyslogConfig::parse("[general]\nlog_level = \"warn\"").unwrap();
    cli.apply_overrides(&mut config);
    config.validate().unwrap();

    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.listener.bind_addr, "0.0.0.0:5514");
    assert_eq!(config.parser.thread_count, 3);
    assert!(config.forward.enabled);
    assert_eq!(config.forward.target, "192.0.2.10:514");
}

#[test]
fn invalid_cli_override_fails_validation() {
    let cli = DaemonCli::parse_from(["syslogd", "--bind", "localhost"]);
    let mut config = SyslogConfig::default();
    cli.apply_overrides(&mut config);
    assert!(config.validate().is_err());
}

#[tokio::test]
#[serial]
async fn load_reads_file_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[listener]\nbind_addr = \"127.0.0.1:5140\"\n\n[parser]\nthread_count = 2"
    )
    .unwrap();

    let config = SyslogConfig::load(file.path()).await.unwrap();
    assert_eq!(config.listener.bind_addr, "127.0.0.1:5140");
    assert_eq!(config.parser.thread_count, 2);
    assert_eq!(config.parser.batch_size, 100);
}

#[tokio::test]
#[serial]
async fn load_missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = SyslogConfig::load(dir.path().join("absent.toml")).await;
    assert!(result.is_err());
}

#[test]
fn config_serializes_back_to_toml() {
    let config = SyslogConfig::default();
    let text = toml::to_string(&config).unwrap();
    let parsed = SyslogConfig::parse(&text).unwrap();
    assert_eq!(parsed.listener.bind_addr, config.listener.bind_addr);
    assert_eq!(parsed.metrics.port, config.metrics.port);
}
