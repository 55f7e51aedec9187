//! 키-값 나열 변형 파서
//!
//! `<30> Key="Value" Other='x' Plain=word ...` 형태를 인식합니다.
//!
//! - 첫 토큰은 반드시 `key=value`여야 합니다.
//! - 값은 큰따옴표, 작은따옴표, 또는 공백 전까지의 맨 단어입니다.
//!   따옴표 값은 이스케이프 없이 닫는 따옴표까지 통째로 읽으므로 `"ip:port"`도
//!   잘리지 않습니다.
//! - `=`가 붙지 않은 맨 단어는 건너뜁니다.
//! - 최소 두 쌍 이상이어야 이 형식으로 인정합니다.
//!
//! 쌍은 [`ParsedMessage::extracted_tuples`](crate::model::ParsedMessage)에 기록되고,
//! 본문에는 접두어 이후 원문 전체가 들어갑니다.

use super::VariantParser;
use super::context::ParserContext;
use crate::error::SyslogPipelineError;
use crate::model::{NameValuePair, PayloadType};

/// 키-값 형식으로 인정하는 최소 쌍 수
const MIN_PAIRS: usize = 2;

/// 키-값 파서
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyValueParser;

impl KeyValueParser {
    pub fn new() -> Self {
        Self
    }
}

impl VariantParser for KeyValueParser {
    fn format_name(&self) -> &str {
        "key_value"
    }

    fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError> {
        let mut pairs = Vec::new();

        loop {
            ctx.skip_spaces();
            if ctx.at_end() {
                break;
            }
            match read_pair(ctx) {
                Token::Pair(pair) => pairs.push(pair),
                Token::Word if pairs.is_empty() => return Ok(false),
                Token::Word => {}
                Token::Unterminated => return Ok(false),
            }
        }

        if pairs.len() < MIN_PAIRS {
            return Ok(false);
        }

        let message = ctx.after_prefix().trim_start_matches(' ').to_owned();
        ctx.message.extracted_tuples = pairs;
        ctx.message.message = message;
        ctx.message.payload_type = Some(PayloadType::KeyValuePairs);
        Ok(true)
    }
}

enum Token {
    Pair(NameValuePair),
    /// `=`가 없는 맨 단어
    Word,
    /// 닫히지 않은 따옴표
    Unterminated,
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '@')
}

fn read_pair(ctx: &mut ParserContext<'_>) -> Token {
    let rest = ctx.remaining();
    let key_len = rest.find(|c: char| !is_key_char(c)).unwrap_or(rest.len());
    let starts_like_key = rest
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');

    if key_len == 0 || !starts_like_key || !rest[key_len..].starts_with('=') {
        ctx.read_word();
        return Token::Word;
    }

    let key = &rest[..key_len];
    ctx.advance(key_len + 1);

    let value = match ctx.peek() {
        Some(quote @ ('"' | '\'')) => {
            ctx.advance(1);
            let body = ctx.remaining();
            let Some(end) = body.find(quote) else {
                return Token::Unterminated;
            };
            ctx.advance(end + 1);
            &body[..end]
        }
        _ => ctx.read_word().unwrap_or(""),
    };

    Token::Pair(NameValuePair::new(key, value))
}
