//! 평문 변형 파서 -- 체인의 마지막 대체 경로
//!
//! 항상 성공하며, 접두어 이후 원문을 본문으로 삼고 타임스탬프에 디코드 시각을 기록합니다.

use super::VariantParser;
use super::context::ParserContext;
use crate::error::SyslogPipelineError;
use crate::model::PayloadType;

/// 평문 파서
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextParser;

impl PlainTextParser {
    pub fn new() -> Self {
        Self
    }
}

impl VariantParser for PlainTextParser {
    fn format_name(&self) -> &str {
        "plain_text"
    }

    fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError> {
        ctx.skip_spaces();
        let message = ctx.take_message().to_owned();
        ctx.message.header.timestamp = Some(ctx.now());
        ctx.message.message = message;
        ctx.message.payload_type = Some(PayloadType::PlainText);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn always_matches_and_stamps_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let mut ctx = ParserContext::new("<13> \u{FEFF}anything at all", now);
        ctx.read_prefix();
        assert!(PlainTextParser.try_parse(&mut ctx).unwrap());
        assert_eq!(ctx.message.message, "anything at all");
        assert_eq!(ctx.message.header.timestamp, Some(now));
        assert_eq!(ctx.message.payload_type, Some(PayloadType::PlainText));
    }

    #[test]
    fn empty_body_is_fine() {
        let mut ctx = ParserContext::new("<13>", Utc::now());
        ctx.read_prefix();
        assert!(PlainTextParser.try_parse(&mut ctx).unwrap());
        assert!(ctx.message.message.is_empty());
    }
}
