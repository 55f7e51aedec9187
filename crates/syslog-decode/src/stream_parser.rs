//! Syslog 스트림 파서 -- 원시 메시지를 병렬 디코드하여 브로드캐스트
//!
//! [`SyslogStreamParser`]는 [`StreamProcessor`]에 디코드 변환을 끼운 특수화입니다.
//! `<N>` 접두어가 없는 입력은 에러 없이 버려지고 구독자에게 전달되지 않습니다.

use std::sync::Arc;

use metrics::Counter;
use syslog_decode_core::clock::{Clock, SystemClock};
use syslog_decode_core::health::{HealthData, HealthReporter, health_key};
use syslog_decode_core::metrics as m;

use crate::broadcast::{Subscriber, Subscription};
use crate::error::SyslogPipelineError;
use crate::model::{ParsedMessage, PayloadType, RawMessage};
use crate::parser::SyslogMessageParser;
use crate::processor::{ItemProcessor, ProcessorConfig, StreamProcessor};

/// 헬스 키: 큐 길이
pub const HEALTH_QUEUE_DEPTH: &str = "parser_queue_depth";
/// 헬스 키: 처리 중인 워커 수
pub const HEALTH_ACTIVE_WORKERS: &str = "parser_active_workers";
/// 헬스 키: 입력 EPS
pub const HEALTH_INPUT_EPS: &str = "parser_input_eps";
/// 헬스 키: 출력 EPS
pub const HEALTH_OUTPUT_EPS: &str = "parser_output_eps";

struct DecodeTransform {
    parser: SyslogMessageParser,
    non_syslog: Counter,
    decoded: [Counter; PayloadType::ALL.len()],
}

impl ItemProcessor<Arc<RawMessage>, ParsedMessage> for DecodeTransform {
    fn process(&self, raw: Arc<RawMessage>) -> Result<Option<ParsedMessage>, SyslogPipelineError> {
        let message = self.parser.parse(raw)?;
        if !message.is_syslog() {
            self.non_syslog.increment(1);
            return Ok(None);
        }
        if let Some(format) = message.payload_type {
            self.decoded[format.index()].increment(1);
        }
        Ok(Some(message))
    }
}

/// 병렬 syslog 디코더
pub struct SyslogStreamParser {
    processor: StreamProcessor<Arc<RawMessage>, ParsedMessage>,
}

impl SyslogStreamParser {
    pub fn new(config: ProcessorConfig, parser: SyslogMessageParser) -> Self {
        Self::with_clock(config, parser, Arc::new(SystemClock))
    }

    /// 기본 디코더 체인과 `parser` 단계 이름으로 생성합니다.
    pub fn with_defaults() -> Self {
        let config = ProcessorConfig {
            name: "parser".to_owned(),
            ..ProcessorConfig::default()
        };
        Self::new(config, SyslogMessageParser::with_defaults())
    }

    /// EPS 샘플링 시계를 지정해 생성합니다. 디코더 시계는 `parser`가 가진 것을 씁니다.
    pub fn with_clock(
        config: ProcessorConfig,
        parser: SyslogMessageParser,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let transform = DecodeTransform {
            parser,
            non_syslog: metrics::counter!(
                m::PARSER_NON_SYSLOG_DROPPED_TOTAL,
                m::LABEL_STAGE => config.name.clone()
            ),
            decoded: PayloadType::ALL.map(|format| {
                metrics::counter!(m::PARSER_DECODED_TOTAL, m::LABEL_FORMAT => format.as_str())
            }),
        };
        Self {
            processor: StreamProcessor::with_clock(config, Box::new(transform), clock),
        }
    }

    pub fn start(&self) -> Result<(), SyslogPipelineError> {
        self.processor.start()
    }

    /// 원시 메시지를 디코드 큐에 넣습니다.
    pub fn submit(&self, raw: Arc<RawMessage>) {
        self.processor.submit(raw);
    }

    pub fn drain(&self) {
        self.processor.drain();
    }

    /// 남은 메시지를 모두 디코드한 뒤 멈춥니다.
    pub fn stop(&self) {
        self.processor.stop();
    }

    /// 디코드된 메시지 구독자를 추가합니다.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<ParsedMessage>>) -> Subscription {
        self.processor.subscribe(subscriber)
    }

    pub fn processor(&self) -> &StreamProcessor<Arc<RawMessage>, ParsedMessage> {
        &self.processor
    }
}

impl Subscriber<Arc<RawMessage>> for SyslogStreamParser {
    fn on_next(&self, item: &Arc<RawMessage>) {
        self.processor.on_next(item);
    }

    fn on_error(&self, error: &SyslogPipelineError) {
        self.processor.on_error(error);
    }

    fn on_completed(&self) {
        self.processor.on_completed();
    }
}

impl HealthReporter for SyslogStreamParser {
    fn add_health_data(&self, data: &mut HealthData, prefix: &str) {
        let p = &self.processor;
        data.insert(health_key(prefix, HEALTH_QUEUE_DEPTH), p.queue_len() as f64);
        data.insert(health_key(prefix, HEALTH_ACTIVE_WORKERS), p.active_count() as f64);
        data.insert(health_key(prefix, HEALTH_INPUT_EPS), p.input_eps() as f64);
        data.insert(health_key(prefix, HEALTH_OUTPUT_EPS), p.output_eps() as f64);
    }
}

impl std::fmt::Debug for SyslogStreamParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogStreamParser")
            .field("processor", &self.processor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Sink {
        messages: Mutex<Vec<ParsedMessage>>,
        errors: Mutex<usize>,
    }

    impl Subscriber<ParsedMessage> for Sink {
        fn on_next(&self, item: &ParsedMessage) {
            self.messages.lock().unwrap().push(item.clone());
        }

        fn on_error(&self, _error: &SyslogPipelineError) {
            *self.errors.lock().unwrap() += 1;
        }
    }

    fn parser() -> SyslogStreamParser {
        let config = ProcessorConfig {
            name: "parser".to_owned(),
            batch_size: 10,
            thread_count: 2,
            idle_pause: Duration::from_millis(1),
            ..Default::default()
        };
        SyslogStreamParser::new(config, SyslogMessageParser::with_defaults())
    }

    #[test]
    fn decodes_and_drops_non_syslog() {
        let stream = parser();
        let sink = Arc::new(Sink::default());
        let _sub = stream.subscribe(sink.clone());

        stream.submit(Arc::new(RawMessage::from_text(
            "<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 - hello",
        )));
        stream.submit(Arc::new(RawMessage::from_text("no priority prefix here")));
        stream.submit(Arc::new(RawMessage::from_text("<13>just text")));
        stream.stop();

        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        let mut kinds: Vec<_> = messages.iter().filter_map(|m| m.payload_type).collect();
        kinds.sort_by_key(|k| k.as_str());
        assert_eq!(kinds, vec![PayloadType::PlainText, PayloadType::Rfc5424]);
        assert!(messages.iter().all(|m| m.source.is_some()));
        assert_eq!(*sink.errors.lock().unwrap(), 0);
        assert_eq!(stream.processor().input_count(), 3);
        assert_eq!(stream.processor().output_count(), 2);
    }

    #[test]
    fn health_snapshot_has_prefixed_keys() {
        let stream = parser();
        let mut data = HealthData::new();
        stream.add_health_data(&mut data, "udp.");
        for key in [
            HEALTH_QUEUE_DEPTH,
            HEALTH_ACTIVE_WORKERS,
            HEALTH_INPUT_EPS,
            HEALTH_OUTPUT_EPS,
        ] {
            assert_eq!(data.get(&format!("udp.{key}")), Some(&0.0), "{key}");
        }
    }

    #[test]
    fn accepts_raw_messages_as_subscriber() {
        let stream = Arc::new(parser());
        let sink = Arc::new(Sink::default());
        let _sub = stream.subscribe(sink.clone());

        let upstream: Arc<dyn Subscriber<Arc<RawMessage>>> = stream.clone();
        upstream.on_next(&Arc::new(RawMessage::from_text("<13>Jun 30 14:29:50 host app: hi")));
        stream.stop();

        let messages = sink.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].payload_type, Some(PayloadType::Rfc3164));
    }
}
