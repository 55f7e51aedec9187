#![no_main]

use std::sync::Arc;

use libfuzzer_sys::fuzz_target;
use syslog_decode::{RawMessage, SyslogMessageParser};

fuzz_target!(|data: &[u8]| {
    let parser = SyslogMessageParser::with_defaults();
    let text = String::from_utf8_lossy(data);

    // 패닉 없이 Ok 또는 Err을 반환해야 한다
    let _ = parser.parse(Arc::new(RawMessage::from_text(text)));
});
