//! 메시지 데이터 모델
//!
//! - [`RawMessage`]: 리스너가 한 번 생성하고 이후 변경하지 않는 원시 데이터그램
//! - [`ParsedMessage`]: 디코딩 결과 (헤더, 구조화 데이터, 추출 튜플, 통합 데이터)
//! - [`UnifiedData`]: 추출 튜플과 구조화 파라미터를 이름별로 병합한 맵
//!
//! # 통합 데이터 병합 규칙
//!
//! 추출 튜플 뒤에 구조화 데이터의 모든 파라미터를 이어 붙인 뒤(요소 이름은 버림)
//! 튜플 이름으로 그룹화합니다. 그룹 순서는 처음 등장한 순서를 따릅니다.
//! 값이 둘 이상이거나 이름이 `IPv4`/`IPv6`인 그룹은 배열이 되고,
//! 나머지는 단일 스칼라가 됩니다.

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// 항상 배열로 취급되는 튜플 이름
pub const IPV4_TUPLE_NAME: &str = "IPv4";
/// 항상 배열로 취급되는 튜플 이름
pub const IPV6_TUPLE_NAME: &str = "IPv6";

/// 원시 수신 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// 수신 시각
    pub received_at: DateTime<Utc>,
    /// 송신자 주소 (로컬 생성 메시지는 `None`)
    pub source_addr: Option<SocketAddr>,
    /// UTF-8 디코딩된 원문
    pub text: String,
}

impl RawMessage {
    /// 수신 정보와 함께 원시 메시지를 생성합니다.
    pub fn new(
        text: impl Into<String>,
        source_addr: Option<SocketAddr>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            received_at,
            source_addr,
            text: text.into(),
        }
    }

    /// 송신자 없이 현재 시각으로 원시 메시지를 생성합니다.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self::new(text, None, Utc::now())
    }
}

/// 페이로드 형식
///
/// [`ParsedMessage::payload_type`]이 `None`이면 syslog가 아닌 데이터그램입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadType {
    /// RFC 5424
    Rfc5424,
    /// RFC 3164 (BSD syslog)
    Rfc3164,
    /// `Key="Value"` 나열
    KeyValuePairs,
    /// 구조 없는 평문
    PlainText,
}

impl PayloadType {
    /// 모든 형식
    pub const ALL: [PayloadType; 4] = [
        Self::Rfc5424,
        Self::KeyValuePairs,
        Self::Rfc3164,
        Self::PlainText,
    ];

    /// [`ALL`](Self::ALL) 안에서의 위치
    pub fn index(self) -> usize {
        match self {
            Self::Rfc5424 => 0,
            Self::KeyValuePairs => 1,
            Self::Rfc3164 => 2,
            Self::PlainText => 3,
        }
    }

    /// 메트릭 레이블 등에 쓰는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rfc5424 => "rfc5424",
            Self::Rfc3164 => "rfc3164",
            Self::KeyValuePairs => "key_value",
            Self::PlainText => "plain_text",
        }
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// syslog Facility (0-23)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Facility {
    #[default]
    Kernel = 0,
    User = 1,
    Mail = 2,
    Daemon = 3,
    Auth = 4,
    Syslog = 5,
    Lpr = 6,
    News = 7,
    Uucp = 8,
    Cron = 9,
    AuthPriv = 10,
    Ftp = 11,
    Ntp = 12,
    Audit = 13,
    Alert = 14,
    Clock = 15,
    Local0 = 16,
    Local1 = 17,
    Local2 = 18,
    Local3 = 19,
    Local4 = 20,
    Local5 = 21,
    Local6 = 22,
    Local7 = 23,
}

impl Facility {
    const ALL: [Facility; 24] = [
        Self::Kernel,
        Self::User,
        Self::Mail,
        Self::Daemon,
        Self::Auth,
        Self::Syslog,
        Self::Lpr,
        Self::News,
        Self::Uucp,
        Self::Cron,
        Self::AuthPriv,
        Self::Ftp,
        Self::Ntp,
        Self::Audit,
        Self::Alert,
        Self::Clock,
        Self::Local0,
        Self::Local1,
        Self::Local2,
        Self::Local3,
        Self::Local4,
        Self::Local5,
        Self::Local6,
        Self::Local7,
    ];

    /// 코드 값으로 Facility를 찾습니다.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// 코드 값
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// syslog Severity (0-7)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Severity {
    #[default]
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Informational = 6,
    Debug = 7,
}

impl Severity {
    const ALL: [Severity; 8] = [
        Self::Emergency,
        Self::Alert,
        Self::Critical,
        Self::Error,
        Self::Warning,
        Self::Notice,
        Self::Informational,
        Self::Debug,
    ];

    /// 코드 값으로 Severity를 찾습니다.
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(usize::from(code)).copied()
    }

    /// 코드 값
    pub fn code(self) -> u8 {
        self as u8
    }
}

/// priority를 Facility/Severity로 분해합니다. 191을 넘으면 `None`.
pub fn split_priority(priority: u8) -> Option<(Facility, Severity)> {
    Some((
        Facility::from_code(priority / 8)?,
        Severity::from_code(priority % 8)?,
    ))
}

/// Facility/Severity에서 priority를 계산합니다.
pub fn priority(facility: Facility, severity: Severity) -> u8 {
    facility.code() * 8 + severity.code()
}

/// syslog 헤더 (모든 필드가 nil 가능)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyslogHeader {
    pub timestamp: Option<DateTime<Utc>>,
    pub host_name: Option<String>,
    pub app_name: Option<String>,
    pub proc_id: Option<String>,
    pub msg_id: Option<String>,
}

/// 이름/값 쌍. 같은 이름이 여러 번 나타날 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    pub value: String,
}

impl NameValuePair {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// RFC 5424 구조화 데이터 요소 (`[id k="v" ...]`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredElement {
    /// SD-ID
    pub id: String,
    /// 파라미터 (순서 유지, 이름 중복 허용)
    pub params: Vec<NameValuePair>,
}

/// 요소 이름 → 파라미터 목록의 순서 있는 맵
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredData {
    elements: Vec<StructuredElement>,
}

impl StructuredData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// 요소 이름으로 파라미터 목록을 조회합니다.
    pub fn get(&self, id: &str) -> Option<&[NameValuePair]> {
        self.elements
            .iter()
            .find(|e| e.id == id)
            .map(|e| e.params.as_slice())
    }

    /// 요소를 추가합니다. 같은 이름의 요소가 이미 있으면 파라미터를 이어 붙입니다.
    pub fn insert(&mut self, id: impl Into<String>, params: Vec<NameValuePair>) {
        let id = id.into();
        match self.elements.iter_mut().find(|e| e.id == id) {
            Some(existing) => existing.params.extend(params),
            None => self.elements.push(StructuredElement { id, params }),
        }
    }

    pub fn elements(&self) -> &[StructuredElement] {
        &self.elements
    }

    /// 모든 요소의 파라미터를 순서대로 나열합니다.
    pub fn params(&self) -> impl Iterator<Item = &NameValuePair> {
        self.elements.iter().flat_map(|e| e.params.iter())
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}

/// 통합 데이터 값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DataValue {
    Scalar(String),
    Array(Vec<String>),
}

impl DataValue {
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Self::Scalar(v) => Some(v),
            Self::Array(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[String]> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(values) => Some(values),
        }
    }
}

/// 이름 → 값(스칼라 또는 배열)의 순서 있는 맵
///
/// 항상 [`UnifiedData::build`]로 다시 만들어지며 직접 수정하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnifiedData {
    entries: Vec<(String, DataValue)>,
}

impl UnifiedData {
    /// 추출 튜플과 구조화 데이터로부터 통합 데이터를 만듭니다.
    pub fn build(tuples: &[NameValuePair], structured: &StructuredData) -> Self {
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<(&str, Vec<&str>)> = Vec::new();

        for pair in tuples.iter().chain(structured.params()) {
            match index.get(pair.name.as_str()) {
                Some(&i) => groups[i].1.push(pair.value.as_str()),
                None => {
                    index.insert(pair.name.as_str(), groups.len());
                    groups.push((pair.name.as_str(), vec![pair.value.as_str()]));
                }
            }
        }

        let entries = groups
            .into_iter()
            .map(|(name, values)| {
                let always_array = name == IPV4_TUPLE_NAME || name == IPV6_TUPLE_NAME;
                let value = if values.len() == 1 && !always_array {
                    DataValue::Scalar(values[0].to_owned())
                } else {
                    DataValue::Array(values.into_iter().map(str::to_owned).collect())
                };
                (name.to_owned(), value)
            })
            .collect();

        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&DataValue> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DataValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Serialize for UnifiedData {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// 디코딩 결과
#[derive(Debug, Clone, Default, Serialize)]
pub struct ParsedMessage {
    /// `None`이면 syslog가 아님 (`<N>` 접두어 없음)
    pub payload_type: Option<PayloadType>,
    pub facility: Facility,
    pub severity: Severity,
    pub header: SyslogHeader,
    /// 자유 텍스트 (비어 있을 수 있음)
    pub message: String,
    pub structured_data: StructuredData,
    /// 추출기가 만든 튜플
    pub extracted_tuples: Vec<NameValuePair>,
    /// 마지막 디코드 성공 시점의 병합 데이터
    pub data: UnifiedData,
    /// 치명적이지 않은 디코드 경고
    pub diagnostics: Vec<String>,
    /// 원본 메시지
    #[serde(skip)]
    pub source: Option<Arc<RawMessage>>,
}

impl ParsedMessage {
    /// 송신용 RFC 5424 메시지를 생성합니다.
    ///
    /// ```ignore
    /// let msg = ParsedMessage::rfc5424(Facility::Auth, Severity::Critical)
    ///     .with_host_name("mymachine.example.com")
    ///     .with_app_name("su")
    ///     .with_message("'su root' failed");
    /// ```
    pub fn rfc5424(facility: Facility, severity: Severity) -> Self {
        Self {
            payload_type: Some(PayloadType::Rfc5424),
            facility,
            severity,
            ..Self::default()
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.header.timestamp = Some(timestamp);
        self
    }

    pub fn with_host_name(mut self, host_name: impl Into<String>) -> Self {
        self.header.host_name = Some(host_name.into());
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.header.app_name = Some(app_name.into());
        self
    }

    pub fn with_proc_id(mut self, proc_id: impl Into<String>) -> Self {
        self.header.proc_id = Some(proc_id.into());
        self
    }

    pub fn with_msg_id(mut self, msg_id: impl Into<String>) -> Self {
        self.header.msg_id = Some(msg_id.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// 구조화 데이터 요소를 추가하고 통합 데이터를 다시 만듭니다.
    pub fn with_element(mut self, id: impl Into<String>, params: Vec<NameValuePair>) -> Self {
        self.structured_data.insert(id, params);
        self.rebuild_data();
        self
    }

    /// syslog로 인식된 메시지인지 여부
    pub fn is_syslog(&self) -> bool {
        self.payload_type.is_some()
    }

    /// `Facility * 8 + Severity`
    pub fn priority(&self) -> u8 {
        priority(self.facility, self.severity)
    }

    /// 통합 데이터를 현재 튜플/구조화 데이터로부터 다시 만듭니다.
    pub fn rebuild_data(&mut self) {
        self.data = UnifiedData::build(&self.extracted_tuples, &self.structured_data);
    }

    /// 변형 파서 시도 사이에 구조 상태를 비웁니다.
    ///
    /// Facility, Severity, 진단, 원본 참조는 유지합니다.
    pub(crate) fn clear_structure(&mut self) {
        self.payload_type = None;
        self.header = SyslogHeader::default();
        self.message.clear();
        self.structured_data.clear();
        self.extracted_tuples.clear();
        self.data.clear();
    }
}
