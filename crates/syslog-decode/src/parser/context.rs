//! 메시지 한 건의 디코드 상태
//!
//! 원문, 커서, 디코드된 priority, 작성 중인 [`ParsedMessage`]를 함께 보관합니다.
//! 변형 파서를 시도할 때마다 [`ParserContext::reset`]으로 커서를 접두어 바로 뒤로
//! 되돌리고 구조 상태를 비웁니다. priority, Facility/Severity, 진단은 유지됩니다.

use chrono::{DateTime, Utc};

use crate::model::{ParsedMessage, split_priority};

/// UTF-8 BOM
pub const BOM: char = '\u{FEFF}';

/// 허용하는 최대 priority (facility 23, severity 7)
const MAX_PRIORITY: u16 = 191;

/// 변형 파서가 공유하는 디코드 상태
#[derive(Debug)]
pub struct ParserContext<'a> {
    text: &'a str,
    pos: usize,
    prefix_end: usize,
    priority: Option<u8>,
    now: DateTime<Utc>,
    /// 작성 중인 결과
    pub message: ParsedMessage,
}

impl<'a> ParserContext<'a> {
    /// 새 컨텍스트를 만듭니다. 원문 맨 앞의 BOM 하나는 제거합니다.
    pub fn new(text: &'a str, now: DateTime<Utc>) -> Self {
        Self::with_message(text, now, ParsedMessage::default())
    }

    pub(crate) fn with_message(text: &'a str, now: DateTime<Utc>, message: ParsedMessage) -> Self {
        let text = text.strip_prefix(BOM).unwrap_or(text);
        Self {
            text,
            pos: 0,
            prefix_end: 0,
            priority: None,
            now,
            message,
        }
    }

    /// `<N>` 접두어를 읽습니다.
    ///
    /// 1-3자리 숫자이고 191 이하일 때만 성공하며, 커서를 접두어 뒤로 옮깁니다.
    /// 그 외의 경우 커서는 움직이지 않습니다.
    pub fn read_prefix(&mut self) -> Option<u8> {
        let bytes = self.text.as_bytes();
        if bytes.first() != Some(&b'<') {
            return None;
        }
        let digits = bytes[1..]
            .iter()
            .take(4)
            .take_while(|b| b.is_ascii_digit())
            .count();
        if digits == 0 || digits > 3 || bytes.get(1 + digits) != Some(&b'>') {
            return None;
        }
        let value: u16 = self.text[1..1 + digits].parse().ok()?;
        if value > MAX_PRIORITY {
            return None;
        }
        let value = u8::try_from(value).ok()?;
        self.pos = digits + 2;
        self.prefix_end = self.pos;
        self.priority = Some(value);
        Some(value)
    }

    /// 읽은 priority를 Facility/Severity로 분해하여 기록합니다.
    pub fn assign_facility_severity(&mut self) {
        if let Some((facility, severity)) = self.priority.and_then(split_priority) {
            self.message.facility = facility;
            self.message.severity = severity;
        }
    }

    /// 커서를 접두어 뒤로 되돌리고 이전 시도의 구조 상태를 버립니다.
    pub fn reset(&mut self) {
        self.pos = self.prefix_end;
        self.message.clear_structure();
    }

    /// 진단 메시지를 현재 커서 위치와 함께 기록합니다.
    pub fn add_diagnostic(&mut self, text: impl AsRef<str>) {
        let entry = format!("{} (near {})", text.as_ref(), self.pos);
        self.message.diagnostics.push(entry);
    }

    pub fn priority(&self) -> Option<u8> {
        self.priority
    }

    /// BOM 제거 후 원문 전체
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// 커서 위치 (바이트 오프셋)
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 디코드 시작 시각 (평문 타임스탬프, RFC 3164 연도 추정에 사용)
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// 커서 이후 남은 원문
    pub fn remaining(&self) -> &'a str {
        &self.text[self.pos..]
    }

    /// 접두어 이후의 원문
    pub fn after_prefix(&self) -> &'a str {
        &self.text[self.prefix_end..]
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    /// 커서를 `bytes`만큼 전진합니다. 문자 경계를 넘지 않도록 호출자가 보장합니다.
    pub fn advance(&mut self, bytes: usize) {
        self.pos = (self.pos + bytes).min(self.text.len());
    }

    /// 다음 문자가 `expected`면 소비하고 `true`를 반환합니다.
    pub fn consume(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance(expected.len_utf8());
            true
        } else {
            false
        }
    }

    /// 남은 원문이 `prefix`로 시작하면 소비하고 `true`를 반환합니다.
    pub fn consume_str(&mut self, prefix: &str) -> bool {
        if self.remaining().starts_with(prefix) {
            self.advance(prefix.len());
            true
        } else {
            false
        }
    }

    /// 연속된 공백을 건너뛰고 건너뛴 개수를 반환합니다.
    pub fn skip_spaces(&mut self) -> usize {
        let count = self.remaining().bytes().take_while(|b| *b == b' ').count();
        self.advance(count);
        count
    }

    /// 공백 전까지의 단어를 읽습니다. 뒤따르는 공백은 소비하지 않습니다.
    pub fn read_word(&mut self) -> Option<&'a str> {
        let rest = self.remaining();
        let len = rest.find(' ').unwrap_or(rest.len());
        if len == 0 {
            return None;
        }
        self.advance(len);
        Some(&rest[..len])
    }

    /// 남은 원문 전체를 메시지로 가져갑니다. 맨 앞의 BOM 하나는 제거합니다.
    pub fn take_message(&mut self) -> &'a str {
        let rest = self.remaining();
        self.pos = self.text.len();
        rest.strip_prefix(BOM).unwrap_or(rest)
    }

    pub(crate) fn into_message(self) -> ParsedMessage {
        self.message
    }
}
