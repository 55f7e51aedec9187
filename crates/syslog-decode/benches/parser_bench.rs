//! 디코더 벤치마크
//!
//! 형식별 디코드, 직렬화, 스트림 파서 처리량을 측정합니다.

use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use syslog_decode::model::RawMessage;
use syslog_decode::processor::ProcessorConfig;
use syslog_decode::{SyslogMessageParser, SyslogStreamParser, serialize};

/// RFC 5424 짧은 메시지 (구조화 데이터 없음)
const RFC5424_SHORT: &str =
    "<34>1 2024-01-15T12:00:00.000Z myhost sshd 1234 - - Failed password for root";

/// RFC 5424 긴 메시지 (구조화 데이터 포함)
const RFC5424_LONG: &str = r#"<34>1 2024-01-15T12:00:00.123Z web-server-01 nginx 5678 ID123 [request user="admin" path="/api/v1/users" method="POST" status="403" client="192.168.1.100:51234"][performance time="125ms" cpu="45%"] Unauthorized API access attempt to restricted endpoint /api/v1/users"#;

/// RFC 3164 메시지 (본문에 IP 포함)
const RFC3164: &str = "<38>Dec 31 23:59:59 production-server-eu-west-1a sshd[12345]: Authentication failure for user admin from 203.0.113.45 port 22 ssh2";

/// 키-값 메시지
const KEY_VALUE: &str = r#"<14>Action="Upload" UploaderAddress="10.236.29.53:61190" User='alice' Size=1024 Result=ok"#;

/// 평문 메시지
const PLAIN: &str = "<13>Disk quota exceeded on /var/lib/data for uid 1001, peer fe80::1ff:fe23:4567:890a";

fn bench_decode(c: &mut Criterion) {
    let parser = SyslogMessageParser::with_defaults();
    let mut group = c.benchmark_group("decode");
    group.throughput(Throughput::Elements(1));

    for (name, text) in [
        ("rfc5424_short", RFC5424_SHORT),
        ("rfc5424_long", RFC5424_LONG),
        ("rfc3164", RFC3164),
        ("key_value", KEY_VALUE),
        ("plain_text", PLAIN),
    ] {
        let raw = Arc::new(RawMessage::from_text(text));
        group.bench_with_input(BenchmarkId::from_parameter(name), &raw, |b, raw| {
            b.iter(|| parser.parse(black_box(Arc::clone(raw))).unwrap())
        });
    }

    group.finish();
}

fn bench_serialize(c: &mut Criterion) {
    let parser = SyslogMessageParser::with_defaults();
    let message = parser
        .parse(Arc::new(RawMessage::from_text(RFC5424_LONG)))
        .unwrap();

    c.bench_function("serialize_rfc5424_long", |b| {
        b.iter(|| serialize(black_box(&message)))
    });
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_parser");
    group.sample_size(10);

    for batch in [1_000usize, 10_000] {
        let inputs: Vec<_> = (0..batch)
            .map(|i| {
                let text = if i % 2 == 0 { RFC3164 } else { KEY_VALUE };
                Arc::new(RawMessage::from_text(text))
            })
            .collect();

        group.throughput(Throughput::Elements(batch as u64));
        group.bench_with_input(BenchmarkId::from_parameter(batch), &inputs, |b, inputs| {
            b.iter(|| {
                let stream = SyslogStreamParser::new(
                    ProcessorConfig {
                        name: "bench".to_owned(),
                        ..ProcessorConfig::default()
                    },
                    SyslogMessageParser::with_defaults(),
                );
                for raw in inputs {
                    stream.submit(Arc::clone(raw));
                }
                stream.stop();
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode, bench_serialize, bench_stream);
criterion_main!(benches);
