//! RFC 5424 직렬화 -- RFC 5424 변형 파서의 역방향
//!
//! `<PRI>1 TIMESTAMP HOST APP PROCID MSGID SD[ MSG]`
//!
//! - 각 헤더 필드(nil `-` 포함) 뒤에는 정확히 공백 하나가 붙습니다.
//! - 구조화 데이터가 비어 있으면 `-`, 아니면 `[id k="v" ...]` 요소를 구분자 없이 이어 씁니다.
//! - 본문이 비어 있지 않을 때만 공백 하나와 함께 덧붙입니다. 끝 공백은 만들지 않습니다.
//! - 타임스탬프는 UTC 밀리초 정밀도(`2003-10-11T22:14:15.003Z`)로 씁니다.

use std::fmt::Write;

use crate::model::ParsedMessage;
use crate::parser::rfc5424::NIL;

/// 정규 타임스탬프 형식
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 메시지를 RFC 5424 텍스트로 직렬화합니다.
pub fn serialize(message: &ParsedMessage) -> String {
    let mut out = String::with_capacity(128 + message.message.len());
    write_rfc5424(message, &mut out);
    out
}

/// 메시지를 RFC 5424 텍스트로 `out`에 이어 씁니다.
pub fn write_rfc5424(message: &ParsedMessage, out: &mut String) {
    let header = &message.header;

    // String에 대한 write!는 실패하지 않음
    let _ = write!(out, "<{}>1 ", message.priority());

    match header.timestamp {
        Some(ts) => {
            let _ = write!(out, "{} ", ts.format(TIMESTAMP_FORMAT));
        }
        None => push_word(out, None),
    }
    push_word(out, header.host_name.as_deref());
    push_word(out, header.app_name.as_deref());
    push_word(out, header.proc_id.as_deref());
    push_word(out, header.msg_id.as_deref());

    if message.structured_data.is_empty() {
        out.push_str(NIL);
    } else {
        for element in message.structured_data.elements() {
            out.push('[');
            out.push_str(&element.id);
            for param in &element.params {
                out.push(' ');
                out.push_str(&param.name);
                out.push_str("=\"");
                escape_param_value_into(&param.value, out);
                out.push('"');
            }
            out.push(']');
        }
    }

    if !message.message.is_empty() {
        out.push(' ');
        out.push_str(&message.message);
    }
}

/// 비어 있거나 공백뿐인 값은 nil로 씁니다.
fn push_word(out: &mut String, word: Option<&str>) {
    match word {
        Some(w) if !w.trim().is_empty() => out.push_str(w),
        _ => out.push_str(NIL),
    }
    out.push(' ');
}

/// 파라미터 값의 `\`, `"`, `]`를 역슬래시로 이스케이프합니다.
pub fn escape_param_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    escape_param_value_into(value, &mut out);
    out
}

fn escape_param_value_into(value: &str, out: &mut String) {
    for c in value.chars() {
        if matches!(c, '\\' | '"' | ']') {
            out.push('\\');
        }
        out.push(c);
    }
}
