//! RFC 3164 (BSD syslog) 변형 파서
//!
//! `Mmm dd HH:MM:SS [HOST] [TAG[PID]:] MSG`
//!
//! 타임스탬프에는 연도가 없으므로 디코드 시각 기준으로 미래(하루 이상)가 아닌
//! 가장 가까운 연도를 씁니다. `Feb 29`는 가장 최근의 윤년으로 갑니다.
//! 허용하는 변형 (진단 없이 수락):
//! - 초 뒤의 소수부 (`14:29:50.123`)
//! - PID가 없는 태그 (`tag:`)
//! - 본문이 없는 경우 (`host tag`, `host `)

use chrono::{Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};

use super::VariantParser;
use super::context::ParserContext;
use crate::error::SyslogPipelineError;
use crate::model::PayloadType;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// RFC 3164 파서
#[derive(Debug, Default, Clone, Copy)]
pub struct Rfc3164Parser;

impl Rfc3164Parser {
    pub fn new() -> Self {
        Self
    }
}

impl VariantParser for Rfc3164Parser {
    fn format_name(&self) -> &str {
        "rfc3164"
    }

    fn try_parse(&self, ctx: &mut ParserContext<'_>) -> Result<bool, SyslogPipelineError> {
        let Some(timestamp) = read_timestamp(ctx) else {
            return Ok(false);
        };
        ctx.message.header.timestamp = Some(timestamp);
        ctx.message.payload_type = Some(PayloadType::Rfc3164);

        if !ctx.consume(' ') {
            return Ok(ctx.at_end());
        }

        // HOST (콜론으로 끝나는 단어는 호스트가 아니라 태그)
        let Some(first) = ctx.read_word() else {
            return Ok(true);
        };
        let tag_word = if first.ends_with(':') {
            Some(first)
        } else {
            ctx.message.header.host_name = Some(first.to_owned());
            ctx.consume(' ');
            let before_tag = ctx.position();
            match ctx.read_word() {
                None => return Ok(true),
                Some(word) if word.ends_with(':') => Some(word),
                Some(word) if ctx.at_end() => {
                    // 마지막 단어는 콜론이 없어도 앱 이름으로 취급
                    apply_tag(ctx, word);
                    return Ok(true);
                }
                Some(_) => {
                    // 태그 없음: 그 단어부터 본문
                    let rest = ctx.text()[before_tag..].to_owned();
                    ctx.message.message = rest;
                    return Ok(true);
                }
            }
        };

        if let Some(word) = tag_word {
            apply_tag(ctx, word.trim_end_matches(':'));
        }
        ctx.consume(' ');
        let message = ctx.take_message().to_owned();
        ctx.message.message = message;
        Ok(true)
    }
}

/// `name[pid]` 또는 `name`을 앱 이름/PID로 기록합니다.
fn apply_tag(ctx: &mut ParserContext<'_>, tag: &str) {
    match tag.split_once('[') {
        Some((name, rest)) => match rest.strip_suffix(']') {
            Some(pid) => {
                ctx.message.header.app_name = Some(name.to_owned());
                ctx.message.header.proc_id = Some(pid.to_owned());
            }
            None => {
                ctx.add_diagnostic(format!("unterminated pid in tag '{tag}'"));
                ctx.message.header.app_name = Some(name.to_owned());
            }
        },
        None => ctx.message.header.app_name = Some(tag.to_owned()),
    }
}

/// 연도 추론 시 거슬러 올라가는 최대 햇수 (윤일 대응)
const MAX_YEARS_BACK: i32 = 8;

/// `Mmm dd HH:MM:SS[.f]`를 읽습니다. 일(day)은 공백으로 패딩될 수 있습니다.
fn read_timestamp(ctx: &mut ParserContext<'_>) -> Option<chrono::DateTime<Utc>> {
    let rest = ctx.remaining();
    let month = MONTHS.iter().position(|m| rest.starts_with(m))? as u32 + 1;
    let mut cursor = 3;

    let after_month = rest.get(cursor..)?;
    let spaces = after_month.bytes().take_while(|b| *b == b' ').count();
    if spaces == 0 || spaces > 2 {
        return None;
    }
    cursor += spaces;

    let day_str = rest.get(cursor..)?;
    let day_len = day_str.bytes().take_while(u8::is_ascii_digit).count();
    if day_len == 0 || day_len > 2 {
        return None;
    }
    let day: u32 = day_str[..day_len].parse().ok()?;
    cursor += day_len;

    if rest.as_bytes().get(cursor) != Some(&b' ') {
        return None;
    }
    cursor += 1;

    let time_str = rest.get(cursor..cursor + 8)?;
    let mut time = NaiveTime::parse_from_str(time_str, "%H:%M:%S").ok()?;
    cursor += 8;

    if rest.as_bytes().get(cursor) == Some(&b'.') {
        let digits = rest[cursor + 1..]
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if digits == 0 || digits > 9 {
            return None;
        }
        let fraction: u32 = rest[cursor + 1..cursor + 1 + digits].parse().ok()?;
        let nanos = fraction * 10u32.pow(9 - digits as u32);
        time = time.with_nanosecond(nanos)?;
        cursor += 1 + digits;
    }

    let now = ctx.now();
    let latest = now + Duration::days(1);
    let timestamp = (0..=MAX_YEARS_BACK)
        .filter_map(|back| NaiveDate::from_ymd_opt(now.year() - back, month, day))
        .map(|date| Utc.from_utc_datetime(&date.and_time(time)))
        .find(|ts| *ts <= latest)?;

    ctx.advance(cursor);
    Some(timestamp)
}
