//! 디코딩 엔진 -- 변형 파서 체인 + 값 추출기
//!
//! [`SyslogMessageParser`]는 `<N>` 접두어를 읽어 Facility/Severity를 정한 뒤
//! 등록된 변형 파서를 순서대로 시도합니다. 첫 번째로 인식한 파서의 결과에
//! 값 추출기를 적용하고 통합 데이터를 다시 만듭니다.
//!
//! # 기본 체인
//! 1. RFC 5424 ([`Rfc5424Parser`])
//! 2. 키-값 ([`KeyValueParser`])
//! 3. RFC 3164 ([`Rfc3164Parser`])
//! 4. 평문 ([`PlainTextParser`], 항상 성공)
//!
//! # 실패 의미
//! - 접두어 없음: 에러 없이 `payload_type == None`인 결과 (syslog 아님)
//! - 변형 파서가 `Ok(false)`: 다음 파서 시도
//! - 변형 파서가 `Err`: 진단에 기록한 뒤 체인 전체를 중단하고 에러 반환
//!
//! # 사용 예시
//! ```ignore
//! use std::sync::Arc;
//! use syslog_decode::model::RawMessage;
//! use syslog_decode::parser::SyslogMessageParser;
//!
//! let parser = SyslogMessageParser::with_defaults();
//! let raw = Arc::new(RawMessage::from_text("<34>1 2003-10-11T22:14:15.003Z host su - ID47 - hello"));
//! let msg = parser.parse(raw)?;
//! ```

pub mod context;
pub mod ip_address;
pub mod key_value;
pub mod plain_text;
pub mod rfc3164;
pub mod rfc5424;

pub use context::ParserContext;
pub use ip_address::IpAddressExtractor;
pub use key_value::KeyValueParser;
pub use plain_text::PlainTextParser;
pub use rfc3164::Rfc3164Parser;
pub use rfc5424::Rfc5424Parser;

use std::sync::Arc;

use syslog_decode_core::clock::{Clock, SystemClock};
use tracing::{debug, warn};

use crate::error::SyslogPipelineError;
use crate::model::{NameValuePair, ParsedMessage, PayloadType, RawMessage};

/// 자유 텍스트 추출기를 실행할 최소 본문 길이 (문자 수)
const MIN_EXTRACT_LEN: usize = 10;

/// 형식별 변형 파서
///
/// 형식이 맞지 않으면 `Ok(false)`를 반환해야 합니다.
/// `Err`는 예기치 못한 내부 오류에만 사용하며 체인 전체를 중단시킵니다.
pub trait VariantParser: Send + Sync {
    /// 형식 이름 (rfc5424, key_value 등)
    fn format_name(&self) -> &str;

    /// 컨텍스트의 원문을 이 형식으로 디코드합니다.
    fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError>;
}

/// 보조 이름/값 튜플을 만드는 패턴 스캐너
pub trait ValuesExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// 디코드된 본문에서 값을 찾습니다.
    fn extract_values(&self, ctx: &ParserContext<'_>) -> Vec<NameValuePair>;

    /// 이미 분해된 파라미터 값에서 값을 찾습니다. 기본 구현은 아무것도 찾지 않습니다.
    fn extract_from_pairs(&self, _pairs: &[NameValuePair]) -> Vec<NameValuePair> {
        Vec::new()
    }
}

/// 디코딩 오케스트레이터
pub struct SyslogMessageParser {
    variants: Vec<Box<dyn VariantParser>>,
    extractors: Vec<Box<dyn ValuesExtractor>>,
    clock: Arc<dyn Clock>,
}

impl SyslogMessageParser {
    /// 파서와 추출기가 없는 빈 오케스트레이터를 생성합니다.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            variants: Vec::new(),
            extractors: Vec::new(),
            clock,
        }
    }

    /// 기본 체인과 IP 추출기, 시스템 시계로 생성합니다.
    pub fn with_defaults() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 기본 체인과 IP 추출기를 주어진 시계로 생성합니다.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(clock)
            .register_variant(Box::new(Rfc5424Parser::new()))
            .register_variant(Box::new(KeyValueParser::new()))
            .register_variant(Box::new(Rfc3164Parser::new()))
            .register_variant(Box::new(PlainTextParser::new()))
            .register_extractor(Box::new(IpAddressExtractor::new()))
    }

    /// 변형 파서를 등록합니다. 등록 순서대로 시도됩니다.
    pub fn register_variant(mut self, parser: Box<dyn VariantParser>) -> Self {
        self.variants.push(parser);
        self
    }

    /// 값 추출기를 등록합니다.
    pub fn register_extractor(mut self, extractor: Box<dyn ValuesExtractor>) -> Self {
        self.extractors.push(extractor);
        self
    }

    /// 등록된 변형 파서 형식 이름 목록
    pub fn registered_formats(&self) -> Vec<&str> {
        self.variants.iter().map(|p| p.format_name()).collect()
    }

    /// 원시 메시지를 디코드합니다.
    pub fn parse(&self, raw: Arc<RawMessage>) -> Result<ParsedMessage, SyslogPipelineError> {
        let mut message = ParsedMessage::default();
        self.parse_into(raw, &mut message)?;
        Ok(message)
    }

    /// 원시 메시지를 `target`에 디코드합니다.
    ///
    /// 변형 파서 오류로 중단되어도 `target`에는 그때까지의 진단이 남습니다.
    pub fn parse_into(
        &self,
        raw: Arc<RawMessage>,
        target: &mut ParsedMessage,
    ) -> Result<(), SyslogPipelineError> {
        let mut seed = std::mem::take(target);
        seed.clear_structure();
        seed.facility = Default::default();
        seed.severity = Default::default();
        seed.diagnostics.clear();
        seed.source = Some(Arc::clone(&raw));

        let mut ctx = ParserContext::with_message(&raw.text, self.clock.now(), seed);
        let result = self.decode(&mut ctx);
        *target = ctx.into_message();
        result
    }

    fn decode(&self, ctx: &mut ParserContext<'_>) -> Result<(), SyslogPipelineError> {
        if ctx.read_prefix().is_none() {
            // syslog 아님: 조용히 버려지도록 빈 결과
            return Ok(());
        }
        ctx.assign_facility_severity();

        for variant in &self.variants {
            ctx.reset();
            match variant.try_parse(ctx) {
                Ok(true) => {
                    self.extract(ctx);
                    ctx.message.rebuild_data();
                    return Ok(());
                }
                Ok(false) => continue,
                Err(e) => {
                    let diagnostic = format!(
                        "{} parser fault: {e}; text: {}",
                        variant.format_name(),
                        ctx.text()
                    );
                    ctx.add_diagnostic(diagnostic);
                    warn!(
                        format = variant.format_name(),
                        offset = ctx.position(),
                        error = %e,
                        "variant parser raised, aborting decode"
                    );
                    return Err(e);
                }
            }
        }

        ctx.reset();
        ctx.add_diagnostic("no variant parser matched");
        debug!(text = ctx.text(), "no variant parser matched");
        Ok(())
    }

    /// 형식에 따라 구조화 튜플 스캔 또는 자유 텍스트 스캔을 실행합니다.
    fn extract(&self, ctx: &mut ParserContext<'_>) {
        let found: Vec<NameValuePair> = match ctx.message.payload_type {
            Some(PayloadType::Rfc5424) => {
                let params: Vec<_> = ctx.message.structured_data.params().cloned().collect();
                self.extractors
                    .iter()
                    .flat_map(|e| e.extract_from_pairs(&params))
                    .collect()
            }
            Some(PayloadType::KeyValuePairs) => self
                .extractors
                .iter()
                .flat_map(|e| e.extract_from_pairs(&ctx.message.extracted_tuples))
                .collect(),
            _ => {
                let body = &ctx.message.message;
                if body.trim().is_empty() || body.chars().count() < MIN_EXTRACT_LEN {
                    return;
                }
                let shared: &ParserContext<'_> = ctx;
                self.extractors
                    .iter()
                    .flat_map(|e| e.extract_values(shared))
                    .collect()
            }
        };
        ctx.message.extracted_tuples.extend(found);
    }
}

impl Default for SyslogMessageParser {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for SyslogMessageParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogMessageParser")
            .field("variants", &self.registered_formats())
            .field(
                "extractors",
                &self.extractors.iter().map(|e| e.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DataValue, Facility, IPV4_TUPLE_NAME, Severity};
    use chrono::{TimeZone, Utc};
    use syslog_decode_core::clock::ManualClock;

    fn parse(text: &str) -> ParsedMessage {
        SyslogMessageParser::with_defaults()
            .parse(Arc::new(RawMessage::from_text(text)))
            .unwrap()
    }

    struct Faulty;

    impl VariantParser for Faulty {
        fn format_name(&self) -> &str {
            "faulty"
        }

        fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError> {
            Err(SyslogPipelineError::Parse {
                format: "faulty".to_owned(),
                offset: ctx.position(),
                reason: "internal fault".to_owned(),
                text: ctx.text().to_owned(),
            })
        }
    }

    struct Never;

    impl VariantParser for Never {
        fn format_name(&self) -> &str {
            "never"
        }

        fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError> {
            // 부분 상태를 남기고 실패
            ctx.message.message.push_str("garbage");
            ctx.advance(3);
            Ok(false)
        }
    }

    #[test]
    fn default_chain_order() {
        let parser = SyslogMessageParser::with_defaults();
        assert_eq!(
            parser.registered_formats(),
            vec!["rfc5424", "key_value", "rfc3164", "plain_text"]
        );
    }

    #[test]
    fn missing_prefix_is_non_syslog_without_diagnostics() {
        let msg = parse("just some text");
        assert!(!msg.is_syslog());
        assert!(msg.diagnostics.is_empty());
        assert!(msg.source.is_some());
    }

    #[test]
    fn rfc5424_params_are_merged_into_data() {
        let msg = parse(
            r#"<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 [exampleSDID@32473 iut="3" eventSource="Application" eventID="1011"] My custom message"#,
        );
        assert_eq!(msg.payload_type, Some(PayloadType::Rfc5424));
        assert_eq!(msg.facility, Facility::Auth);
        assert_eq!(msg.severity, Severity::Critical);
        assert_eq!(msg.data.get("iut"), Some(&DataValue::Scalar("3".to_owned())));
        assert_eq!(msg.data.len(), 3);
    }

    #[test]
    fn rfc5424_scans_only_params_for_ips() {
        let msg = parse(r#"<13>1 - h a - - [net@1 src="10.0.0.1" dst="10.0.0.2"] body mentions 192.168.0.1"#);
        assert_eq!(
            msg.data.get(IPV4_TUPLE_NAME),
            Some(&DataValue::Array(vec![
                "10.0.0.1".to_owned(),
                "10.0.0.2".to_owned()
            ]))
        );
    }

    #[test]
    fn key_value_ip_is_extracted_without_port() {
        let msg = parse(
            r#"<30> DefsServer="azweccol03" App="DefsLite" Version="1.0.8d" UploaderAddress="10.236.29.53:61190"  Created zipName="D:\OSSCWEC\x.evtx-zip.Compressed""#,
        );
        assert_eq!(msg.payload_type, Some(PayloadType::KeyValuePairs));
        assert_eq!(
            msg.data.get(IPV4_TUPLE_NAME),
            Some(&DataValue::Array(vec!["10.236.29.53".to_owned()]))
        );
        assert_eq!(
            msg.data.get("UploaderAddress").and_then(DataValue::as_scalar),
            Some("10.236.29.53:61190")
        );
    }

    #[test]
    fn free_text_extraction_respects_min_length() {
        let short = parse("<13>1.2.3.4");
        assert_eq!(short.payload_type, Some(PayloadType::PlainText));
        assert!(short.extracted_tuples.is_empty());

        let long = parse("<13>Jun 30 14:29:50 host app: login from 1.2.3.4 failed");
        assert_eq!(long.payload_type, Some(PayloadType::Rfc3164));
        assert_eq!(
            long.extracted_tuples,
            vec![NameValuePair::new(IPV4_TUPLE_NAME, "1.2.3.4")]
        );
    }

    #[test]
    fn rfc3164_leniency_has_no_diagnostics() {
        for text in [
            "<28>Jun 30 14:29:50 Sg2-0102-0201-14T1 snmp#snmp-subagent",
            "<28>Jun 30 14:29:50 Sg2-0102-0201-14T1 ",
        ] {
            let msg = parse(text);
            assert_eq!(msg.payload_type, Some(PayloadType::Rfc3164), "{text}");
            assert!(msg.diagnostics.is_empty(), "{text}: {:?}", msg.diagnostics);
        }
    }

    #[test]
    fn plain_text_uses_injected_clock() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap();
        let parser = SyslogMessageParser::with_clock(Arc::new(ManualClock::new(at)));
        let msg = parser
            .parse(Arc::new(RawMessage::from_text("<13>hello world")))
            .unwrap();
        assert_eq!(msg.payload_type, Some(PayloadType::PlainText));
        assert_eq!(msg.header.timestamp, Some(at));
    }

    #[test]
    fn failed_attempt_state_is_discarded() {
        let parser = SyslogMessageParser::new(Arc::new(SystemClock))
            .register_variant(Box::new(Never))
            .register_variant(Box::new(PlainTextParser::new()));
        let msg = parser
            .parse(Arc::new(RawMessage::from_text("<13>abcdef")))
            .unwrap();
        assert_eq!(msg.message, "abcdef");
    }

    #[test]
    fn fault_aborts_chain_and_records_diagnostic() {
        let parser = SyslogMessageParser::new(Arc::new(SystemClock))
            .register_variant(Box::new(Faulty))
            .register_variant(Box::new(PlainTextParser::new()));
        let mut target = ParsedMessage::default();
        let err = parser
            .parse_into(Arc::new(RawMessage::from_text("<13>boom")), &mut target)
            .unwrap_err();
        assert!(matches!(err, SyslogPipelineError::Parse { .. }));
        assert_eq!(target.diagnostics.len(), 1);
        assert!(target.diagnostics[0].contains("faulty"));
        assert!(target.payload_type.is_none());
    }

    #[test]
    fn empty_chain_reports_no_match() {
        let parser = SyslogMessageParser::new(Arc::new(SystemClock));
        let msg = parser
            .parse(Arc::new(RawMessage::from_text("<13>x")))
            .unwrap();
        assert!(!msg.is_syslog());
        assert_eq!(msg.diagnostics.len(), 1);
    }

    #[test]
    fn reparse_rebuilds_from_scratch() {
        let parser = SyslogMessageParser::with_defaults();
        let mut target = parser
            .parse(Arc::new(RawMessage::from_text("<13>a=1 b=2 c=3")))
            .unwrap();
        assert_eq!(target.data.len(), 3);
        parser
            .parse_into(Arc::new(RawMessage::from_text("<13>x=9 y=8")), &mut target)
            .unwrap();
        assert_eq!(target.data.len(), 2);
        assert!(target.data.get("a").is_none());
    }

    #[test]
    fn reparse_non_syslog_resets_priority() {
        let parser = SyslogMessageParser::with_defaults();
        let mut target = parser
            .parse(Arc::new(RawMessage::from_text("<165>hello there")))
            .unwrap();
        assert_eq!(target.facility, Facility::Local4);
        parser
            .parse_into(Arc::new(RawMessage::from_text("no prefix")), &mut target)
            .unwrap();
        assert!(!target.is_syslog());
        assert_eq!(target.facility, Facility::default());
        assert_eq!(target.severity, Severity::default());
        assert!(target.message.is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn decode_never_panics(text in "\\PC{0,300}") {
                let parser = SyslogMessageParser::with_defaults();
                let _ = parser.parse(Arc::new(RawMessage::from_text(text)));
            }

            #[test]
            fn prefixed_input_always_decodes(pri in 0u8..=191, body in "[ -~]{0,120}") {
                let parser = SyslogMessageParser::with_defaults();
                let msg = parser
                    .parse(Arc::new(RawMessage::from_text(format!("<{pri}> {body}"))))
                    .unwrap();
                prop_assert!(msg.is_syslog());
                prop_assert_eq!(msg.priority(), pri);
            }
        }
    }
}
