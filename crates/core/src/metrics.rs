//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다. 레코더가 설치되지 않은 상태에서는 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `syslog_decode_`
//! - 단계명: `listener_`, `parser_`, `sender_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(syslog_decode_core::metrics::LISTENER_PACKETS_RECEIVED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 페이로드 형식 레이블 키 (rfc5424, rfc3164, key_value, plain_text)
pub const LABEL_FORMAT: &str = "format";

/// 처리 단계 레이블 키 (listener, parser)
pub const LABEL_STAGE: &str = "stage";

// ─── Listener 메트릭 ───────────────────────────────────────────────

/// Listener: 수신한 UDP 데이터그램 수 (counter)
pub const LISTENER_PACKETS_RECEIVED_TOTAL: &str = "syslog_decode_listener_packets_received_total";

/// Listener: 수신 오류 수 (counter)
pub const LISTENER_RECEIVE_ERRORS_TOTAL: &str = "syslog_decode_listener_receive_errors_total";

// ─── Parser 메트릭 ─────────────────────────────────────────────────

/// Parser: 큐에 입력된 항목 수 (counter)
pub const PARSER_ITEMS_INPUT_TOTAL: &str = "syslog_decode_parser_items_input_total";

/// Parser: 구독자에게 브로드캐스트된 항목 수 (counter, label: stage)
pub const PARSER_ITEMS_OUTPUT_TOTAL: &str = "syslog_decode_parser_items_output_total";

/// Parser: 형식별로 디코드된 메시지 수 (counter, label: format)
pub const PARSER_DECODED_TOTAL: &str = "syslog_decode_parser_decoded_total";

/// Parser: 항목 처리 중 발생한 오류 수 (counter)
pub const PARSER_FAULTS_TOTAL: &str = "syslog_decode_parser_faults_total";

/// Parser: `<N>` 접두어가 없어 버려진 데이터그램 수 (counter)
pub const PARSER_NON_SYSLOG_DROPPED_TOTAL: &str = "syslog_decode_parser_non_syslog_dropped_total";

/// Parser: 입력 큐 깊이 (gauge)
pub const PARSER_QUEUE_DEPTH: &str = "syslog_decode_parser_queue_depth";

// ─── Sender 메트릭 ─────────────────────────────────────────────────

/// Sender: 전송한 데이터그램 수 (counter)
pub const SENDER_PACKETS_SENT_TOTAL: &str = "syslog_decode_sender_packets_sent_total";

/// Sender: 전송 실패 수 (counter)
pub const SENDER_ERRORS_TOTAL: &str = "syslog_decode_sender_errors_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `syslogd` 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    // Listener
    describe_counter!(
        LISTENER_PACKETS_RECEIVED_TOTAL,
        "Total number of UDP datagrams received by the listener"
    );
    describe_counter!(
        LISTENER_RECEIVE_ERRORS_TOTAL,
        "Total number of receive faults surfaced by the listener"
    );

    // Parser
    describe_counter!(
        PARSER_ITEMS_INPUT_TOTAL,
        "Total number of raw messages submitted to the parser queue"
    );
    describe_counter!(
        PARSER_ITEMS_OUTPUT_TOTAL,
        "Total number of decoded messages broadcast to subscribers"
    );
    describe_counter!(
        PARSER_DECODED_TOTAL,
        "Total number of syslog messages decoded, by payload format"
    );
    describe_counter!(
        PARSER_FAULTS_TOTAL,
        "Total number of items whose processing raised a fault"
    );
    describe_counter!(
        PARSER_NON_SYSLOG_DROPPED_TOTAL,
        "Total number of datagrams dropped for lacking a priority prefix"
    );
    describe_gauge!(
        PARSER_QUEUE_DEPTH,
        "Current number of raw messages waiting in the parser queue"
    );

    // Sender
    describe_counter!(
        SENDER_PACKETS_SENT_TOTAL,
        "Total number of datagrams sent by the forwarder"
    );
    describe_counter!(SENDER_ERRORS_TOTAL, "Total number of failed sends");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        LISTENER_PACKETS_RECEIVED_TOTAL,
        LISTENER_RECEIVE_ERRORS_TOTAL,
        PARSER_ITEMS_INPUT_TOTAL,
        PARSER_ITEMS_OUTPUT_TOTAL,
        PARSER_DECODED_TOTAL,
        PARSER_FAULTS_TOTAL,
        PARSER_NON_SYSLOG_DROPPED_TOTAL,
        PARSER_QUEUE_DEPTH,
        SENDER_PACKETS_SENT_TOTAL,
        SENDER_ERRORS_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("syslog_decode_"),
                "Metric '{}' does not start with 'syslog_decode_' prefix",
                name
            );
        }
    }

    #[test]
    fn counters_end_with_total() {
        for name in ALL_METRIC_NAMES {
            if *name != PARSER_QUEUE_DEPTH {
                assert!(name.ends_with("_total"), "counter '{}' lacks _total", name);
            }
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더 미설치 상태에서도 패닉이 없어야 함
        describe_all();
    }

    #[test]
    fn label_keys_are_lowercase() {
        for label in [LABEL_FORMAT, LABEL_STAGE] {
            assert_eq!(label.to_lowercase(), label);
        }
    }
}
