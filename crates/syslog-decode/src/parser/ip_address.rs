//! IP 주소 추출기
//!
//! 자유 텍스트나 이미 분해된 파라미터 값에서 IPv4/IPv6 리터럴을 찾아
//! `IPv4` / `IPv6` 이름의 튜플로 돌려줍니다.
//!
//! # 스캔 규칙
//!
//! - IPv4: `[0-9.]`의 최장 연속 구간에서 앞뒤 점을 잘라낸 뒤, 정확히 네 옥텟이고
//!   [`Ipv4Addr`]로 파싱되어야 합니다. 구간 바로 앞뒤가 영문자면 버립니다
//!   (`v1.2.3.4`, `1.2.3.4b` 등 버전 문자열 오탐 방지).
//! - IPv6: `[0-9A-Fa-f:]`의 최장 연속 구간으로, 콜론 2개 이상과 16진 숫자 1개 이상을
//!   포함하고 [`Ipv6Addr`]로 파싱되어야 합니다. 구간 앞뒤가 영숫자나 점이면 버립니다.
//! - 한 번의 스캔 안에서 같은 값은 한 번만 보고합니다.

use std::net::{Ipv4Addr, Ipv6Addr};

use super::ValuesExtractor;
use super::context::ParserContext;
use crate::model::{IPV4_TUPLE_NAME, IPV6_TUPLE_NAME, NameValuePair};

/// IP 주소 추출기
#[derive(Debug, Default, Clone, Copy)]
pub struct IpAddressExtractor;

impl IpAddressExtractor {
    pub fn new() -> Self {
        Self
    }

    /// 자유 텍스트에서 IP 주소를 찾습니다.
    pub fn scan_text(&self, text: &str) -> Vec<NameValuePair> {
        let mut found = Vec::new();
        scan_into(text, &mut found);
        found
    }
}

impl ValuesExtractor for IpAddressExtractor {
    fn name(&self) -> &str {
        "ip_address"
    }

    fn extract_values(&self, ctx: &ParserContext<'_>) -> Vec<NameValuePair> {
        self.scan_text(&ctx.message.message)
    }

    fn extract_from_pairs(&self, pairs: &[NameValuePair]) -> Vec<NameValuePair> {
        let mut found = Vec::new();
        for pair in pairs {
            scan_into(&pair.value, &mut found);
        }
        found
    }
}

fn scan_into(text: &str, found: &mut Vec<NameValuePair>) {
    let bytes = text.as_bytes();

    for (start, end) in runs(bytes, |b| b.is_ascii_digit() || b == b'.') {
        let run = &text[start..end];
        let trimmed = run.trim_matches('.');
        if trimmed.split('.').count() != 4 {
            continue;
        }
        if is_letter_at(bytes, start.checked_sub(1)) || is_letter_at(bytes, Some(end)) {
            continue;
        }
        if trimmed.parse::<Ipv4Addr>().is_ok() {
            push_unique(found, IPV4_TUPLE_NAME, trimmed);
        }
    }

    for (start, end) in runs(bytes, |b| b.is_ascii_hexdigit() || b == b':') {
        let run = &text[start..end];
        if run.bytes().filter(|b| *b == b':').count() < 2
            || !run.bytes().any(|b| b.is_ascii_hexdigit())
        {
            continue;
        }
        let blocks_ipv6 = |idx: Option<usize>| {
            idx.and_then(|i| bytes.get(i))
                .is_some_and(|b| b.is_ascii_alphanumeric() || *b == b'.')
        };
        if blocks_ipv6(start.checked_sub(1)) || blocks_ipv6(Some(end)) {
            continue;
        }
        if let Some(addr) = parse_ipv6(run) {
            push_unique(found, IPV6_TUPLE_NAME, addr);
        }
    }
}

/// 문장 끝 콜론 하나(`fe80::1:`)는 잘라내고 다시 시도합니다.
fn parse_ipv6(run: &str) -> Option<&str> {
    if run.parse::<Ipv6Addr>().is_ok() {
        return Some(run);
    }
    let shorter = run.strip_suffix(':')?;
    if shorter.ends_with(':') {
        return None;
    }
    shorter.parse::<Ipv6Addr>().ok().map(|_| shorter)
}

/// `accept`를 만족하는 바이트의 최장 연속 구간 `(start, end)` 목록
fn runs(bytes: &[u8], accept: impl Fn(u8) -> bool) -> Vec<(usize, usize)> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if !accept(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && accept(bytes[i]) {
            i += 1;
        }
        out.push((start, i));
    }
    out
}

fn is_letter_at(bytes: &[u8], idx: Option<usize>) -> bool {
    idx.and_then(|i| bytes.get(i))
        .is_some_and(u8::is_ascii_alphabetic)
}

fn push_unique(found: &mut Vec<NameValuePair>, name: &str, value: &str) {
    if !found.iter().any(|p| p.name == name && p.value == value) {
        found.push(NameValuePair::new(name, value));
    }
}
