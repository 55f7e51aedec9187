#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use syslog_decode::{
    Facility, NameValuePair, ParsedMessage, PayloadType, RawMessage, Severity,
    SyslogMessageParser, serialize,
};

#[derive(Debug, Arbitrary)]
struct Outbound {
    facility: u8,
    severity: u8,
    host: String,
    app: String,
    param: String,
    message: String,
}

// 헤더 필드는 공백 없는 출력 가능 ASCII만 허용
fn token(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_graphic())
        .take(48)
        .collect()
}

fuzz_target!(|input: Outbound| {
    let (Some(facility), Some(severity)) = (
        Facility::from_code(input.facility % 24),
        Severity::from_code(input.severity % 8),
    ) else {
        return;
    };

    let outbound = ParsedMessage::rfc5424(facility, severity)
        .with_host_name(token(&input.host))
        .with_app_name(token(&input.app))
        .with_element("fuzz@1", vec![NameValuePair::new("v", input.param)])
        .with_message(input.message.replace('\u{feff}', "").trim().to_owned());

    let text = serialize(&outbound);
    let decoded = SyslogMessageParser::with_defaults()
        .parse(Arc::new(RawMessage::from_text(text.clone())))
        .expect("serialized message must decode");

    assert_eq!(decoded.payload_type, Some(PayloadType::Rfc5424), "{text}");
    assert_eq!(decoded.facility, facility);
    assert_eq!(decoded.severity, severity);
    assert_eq!(serialize(&decoded), text);
});
