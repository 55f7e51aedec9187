//! Metrics server tests.
//!
//! Only failure paths are exercised: a successful install sets the
//! process-wide recorder.

use serial_test::serial;
use syslog_decode_core::config::MetricsConfig;
use syslog_decode_daemon::metrics_server;

#[test]
#[serial]
fn install_fails_with_invalid_address() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_owned(),
        port: 9100,
    };
    let result = metrics_server::install_metrics_recorder(&config);
    assert!(result.is_err(), "invalid IP should be rejected");
}

#[test]
#[serial]
fn install_fails_with_hostname() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "metrics.local".to_owned(),
        port: 9100,
    };
    assert!(metrics_server::install_metrics_recorder(&config).is_err());
}
