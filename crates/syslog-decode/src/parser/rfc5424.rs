//! RFC 5424 변형 파서
//!
//! `VERSION SP TIMESTAMP SP HOSTNAME SP APP-NAME SP PROCID SP MSGID [SP SD] [SP MSG]`
//!
//! 허용하는 변형 (진단 없이 수락):
//! - 구조화 데이터 자리에 `[` 없이 바로 본문이 오는 경우 (나머지를 본문으로 취급)
//! - 본문이 없는 경우
//!
//! 대괄호로 시작했지만 문법이 깨진 구조화 데이터는 이 파서의 실패(`Ok(false)`)입니다.

use chrono::{DateTime, Utc};

use super::VariantParser;
use super::context::ParserContext;
use crate::error::SyslogPipelineError;
use crate::model::{NameValuePair, PayloadType};

/// RFC 5424 nil 값
pub(crate) const NIL: &str = "-";

/// RFC 5424 파서
#[derive(Debug, Default, Clone, Copy)]
pub struct Rfc5424Parser;

impl Rfc5424Parser {
    pub fn new() -> Self {
        Self
    }
}

impl VariantParser for Rfc5424Parser {
    fn format_name(&self) -> &str {
        "rfc5424"
    }

    fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError> {
        if !ctx.consume_str("1 ") {
            return Ok(false);
        }

        // TIMESTAMP
        let Some(timestamp) = ctx.read_word() else {
            return Ok(false);
        };
        let timestamp = if timestamp == NIL {
            None
        } else {
            match DateTime::parse_from_rfc3339(timestamp) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(_) => return Ok(false),
            }
        };

        // HOSTNAME APP-NAME PROCID MSGID
        let mut fields: [Option<String>; 4] = Default::default();
        for field in &mut fields {
            if !ctx.consume(' ') {
                return Ok(false);
            }
            let Some(word) = ctx.read_word() else {
                return Ok(false);
            };
            *field = nil_or(word);
        }
        let [host_name, app_name, proc_id, msg_id] = fields;

        let header = &mut ctx.message.header;
        header.timestamp = timestamp;
        header.host_name = host_name;
        header.app_name = app_name;
        header.proc_id = proc_id;
        header.msg_id = msg_id;

        if !ctx.consume(' ') || ctx.at_end() {
            // 구조화 데이터와 본문 모두 없음
            ctx.message.payload_type = Some(PayloadType::Rfc5424);
            return Ok(true);
        }

        match ctx.peek() {
            Some('[') => {
                if !parse_elements(ctx) {
                    return Ok(false);
                }
            }
            Some('-') if is_nil_sd(ctx.remaining()) => ctx.advance(NIL.len()),
            // 대괄호 없이 본문이 바로 오는 경우
            _ => {}
        }

        ctx.consume(' ');
        let message = ctx.take_message().to_owned();
        ctx.message.message = message;
        ctx.message.payload_type = Some(PayloadType::Rfc5424);
        Ok(true)
    }
}

fn nil_or(word: &str) -> Option<String> {
    if word == NIL {
        None
    } else {
        Some(word.to_owned())
    }
}

/// 남은 원문이 nil 구조화 데이터(`-` 뒤에 공백 또는 끝)인지 확인합니다.
fn is_nil_sd(rest: &str) -> bool {
    rest == NIL || rest.starts_with("- ")
}

/// 연속된 `[...]` 요소를 읽어 구조화 데이터에 기록합니다.
fn parse_elements(ctx: &mut ParserContext<'_>) -> bool {
    while ctx.consume('[') {
        let Some((id, params)) = parse_element_body(ctx) else {
            return false;
        };
        ctx.message.structured_data.insert(id, params);
    }
    true
}

/// `[` 뒤에서 시작하여 `]`까지 읽습니다.
fn parse_element_body(ctx: &mut ParserContext<'_>) -> Option<(String, Vec<NameValuePair>)> {
    let id = read_name(ctx, |c| c == ' ' || c == ']')?;
    let mut params = Vec::new();

    loop {
        if ctx.consume(']') {
            return Some((id, params));
        }
        if ctx.skip_spaces() == 0 {
            return None;
        }
        if ctx.consume(']') {
            return Some((id, params));
        }
        let name = read_name(ctx, |c| c == '=')?;
        if !ctx.consume('=') || !ctx.consume('"') {
            return None;
        }
        let value = read_escaped_value(ctx)?;
        params.push(NameValuePair::new(name, value));
    }
}

/// SD-ID 또는 PARAM-NAME을 읽습니다. `=`, `"`, 공백, `]`는 이름에 올 수 없습니다.
fn read_name(ctx: &mut ParserContext<'_>, stop: impl Fn(char) -> bool) -> Option<String> {
    let rest = ctx.remaining();
    let end = rest.find(|c: char| stop(c) || matches!(c, ' ' | ']' | '"' | '='))?;
    if end == 0 {
        return None;
    }
    let name = &rest[..end];
    if !stop(rest[end..].chars().next()?) {
        return None;
    }
    ctx.advance(end);
    Some(name.to_owned())
}

/// 닫는 `"`까지 값을 읽으며 `\\`, `\"`, `\]`를 해제합니다.
///
/// 그 외 문자 앞의 역슬래시는 그대로 둡니다.
fn read_escaped_value(ctx: &mut ParserContext<'_>) -> Option<String> {
    let rest = ctx.remaining();
    let mut value = String::new();
    let mut chars = rest.char_indices();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => {
                ctx.advance(i + 1);
                return Some(value);
            }
            '\\' => match chars.clone().next() {
                Some((_, next @ ('\\' | '"' | ']'))) => {
                    value.push(next);
                    chars.next();
                }
                _ => value.push('\\'),
            },
            _ => value.push(c),
        }
    }
    // 닫는 따옴표 없음
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> (bool, ParserContext<'_>) {
        let mut ctx = ParserContext::new(text, Utc::now());
        ctx.read_prefix().expect("prefix");
        ctx.assign_facility_severity();
        let matched = Rfc5424Parser.try_parse(&mut ctx).unwrap();
        (matched, ctx)
    }

    #[test]
    fn parses_rfc_example_with_structured_data() {
        let (ok, ctx) = run(
            r#"<34>1 2003-10-11T22:14:15.003Z mymachine.example.com su - ID47 [exampleSDID@32473 iut="3" eventSource="Application" eventID="1011"] My custom message"#,
        );
        assert!(ok);
        let msg = &ctx.message;
        assert_eq!(msg.header.host_name.as_deref(), Some("mymachine.example.com"));
        assert_eq!(msg.header.app_name.as_deref(), Some("su"));
        assert_eq!(msg.header.proc_id, None);
        assert_eq!(msg.header.msg_id.as_deref(), Some("ID47"));
        let params = msg.structured_data.get("exampleSDID@32473").unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params[1], NameValuePair::new("eventSource", "Application"));
        assert_eq!(msg.message, "My custom message");
    }

    #[test]
    fn unescapes_param_values() {
        let (ok, ctx) = run(r#"<13>1 - - - - - [exEscapes@123 escParam="\\abc\\def\"ghi"]"#);
        assert!(ok);
        let params = ctx.message.structured_data.get("exEscapes@123").unwrap();
        assert_eq!(params[0].value, r#"\abc\def"ghi"#);
        assert!(ctx.message.message.is_empty());
    }

    #[test]
    fn keeps_backslash_before_other_chars() {
        let (ok, ctx) = run(r#"<13>1 - - - - - [x@1 p="C:\temp\]x"]"#);
        assert!(ok);
        let params = ctx.message.structured_data.get("x@1").unwrap();
        assert_eq!(params[0].value, r"C:\temp]x");
    }

    #[test]
    fn multiple_elements_are_concatenated() {
        let (ok, ctx) = run(r#"<13>1 - h a p m [a@1 x="1"][b@1 y="2"] tail"#);
        assert!(ok);
        assert_eq!(ctx.message.structured_data.len(), 2);
        assert_eq!(ctx.message.message, "tail");
    }

    #[test]
    fn nil_structured_data_with_message() {
        let (ok, ctx) = run("<165>1 2003-08-24T05:14:15.000003-07:00 192.0.2.1 myproc 8710 - - %% It's time");
        assert!(ok);
        assert!(ctx.message.structured_data.is_empty());
        assert_eq!(ctx.message.message, "%% It's time");
        assert_eq!(ctx.message.header.proc_id.as_deref(), Some("8710"));
    }

    #[test]
    fn missing_bracket_treats_rest_as_message() {
        let (ok, ctx) = run(
            "<116>1 2020-06-23T16:27:38.172630+00:00 CO2PHXDC25 CEF 29060 SensorDisconnectedMonitoringAler \u{FEFF}0|Microsoft|Azure ATP",
        );
        assert!(ok);
        assert!(ctx.message.structured_data.is_empty());
        assert_eq!(ctx.message.message, "0|Microsoft|Azure ATP");
        assert!(ctx.message.diagnostics.is_empty());
    }

    #[test]
    fn missing_message_tail_is_accepted() {
        let (ok, ctx) = run("<13>1 - host app - -");
        assert!(ok);
        assert!(ctx.message.message.is_empty());
        assert_eq!(ctx.message.payload_type, Some(PayloadType::Rfc5424));
    }

    #[test]
    fn rejects_wrong_version_or_timestamp() {
        assert!(!run("<13>2 - h a p m -").0);
        assert!(!run("<13>Jun 30 14:29:50 host tag: x").0);
        assert!(!run("<13>1 yesterday h a p m -").0);
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(!run("<13>1 - host app").0);
    }

    #[test]
    fn rejects_malformed_structured_data() {
        assert!(!run(r#"<13>1 - h a p m [id@1 k="unterminated"#).0);
        assert!(!run(r#"<13>1 - h a p m [id@1 k=unquoted]"#).0);
        assert!(!run(r#"<13>1 - h a p m [ k="v"]"#).0);
        assert!(!run(r#"<13>1 - h a p m [id@1 ="v"]"#).0);
    }

    #[test]
    fn element_without_params_is_accepted() {
        let (ok, ctx) = run("<13>1 - h a p m [origin] text");
        assert!(ok);
        assert_eq!(ctx.message.structured_data.get("origin"), Some(&[][..]));
        assert_eq!(ctx.message.message, "text");
    }
}
