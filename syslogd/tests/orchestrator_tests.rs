//! Orchestrator lifecycle tests against a loopback UDP socket.

use std::net::UdpSocket;
use std::time::{Duration, Instant};

use syslog_decode_core::config::SyslogConfig;
use syslog_decode_daemon::orchestrator::Orchestrator;

fn loopback_config() -> SyslogConfig {
    let mut config = SyslogConfig::default();
    config.listener.bind_addr = "127.0.0.1:0".to_owned();
    config.listener.recv_buffer_size = 1 << 20;
    config.parser.thread_count = 2;
    config.parser.idle_pause_ms = 1;
    config
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn decodes_and_shuts_down_cleanly() {
    let mut orchestrator = Orchestrator::build(loopback_config()).unwrap();
    let addr = orchestrator.start().unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    client
        .send_to(b"<34>1 2003-10-11T22:14:15.003Z host su - ID47 - failed", addr)
        .unwrap();
    client
        .send_to(b"<13>Jun 30 14:29:50 web01 sshd[7]: from 10.0.0.7", addr)
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while orchestrator.decoded_count() < 2 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let health = orchestrator.health();
    assert_eq!(health.stages.get("listener_packet_count"), Some(&2.0));
    assert!(health.stages.contains_key("parser_active_workers"));

    orchestrator.shutdown().await.unwrap();
    assert_eq!(orchestrator.decoded_count(), 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn forwarding_resends_decoded_messages() {
    let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
    receiver
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();

    let mut config = loopback_config();
    config.forward.enabled = true;
    config.forward.target = receiver.local_addr().unwrap().to_string();

    let mut orchestrator = Orchestrator::build(config).unwrap();
    let addr = orchestrator.start().unwrap();

    let client = UdpSocket::bind("127.0.0.1:0").unwrap();
    client
        .send_to(b"<165>1 2003-10-11T22:14:15.003Z host app - - - hi", addr)
        .unwrap();

    let mut buf = [0u8; 2048];
    let (len, _) = receiver.recv_from(&mut buf).unwrap();
    assert_eq!(
        &buf[..len],
        b"<165>1 2003-10-11T22:14:15.003Z host app - - - hi"
    );

    orchestrator.shutdown().await.unwrap();
}

#[test]
fn build_rejects_invalid_forward_target() {
    let mut config = loopback_config();
    config.forward.enabled = true;
    config.forward.target = "nowhere".to_owned();
    assert!(Orchestrator::build(config).is_err());
}
