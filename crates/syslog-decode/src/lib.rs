//! # syslog-decode
//!
//! UDP로 수신한 syslog 데이터그램을 여러 형식(RFC 5424, RFC 3164, 키-값, 평문)으로
//! 디코드하고, 본문에 묻힌 IP 주소를 추출하며, RFC 5424로 다시 직렬화합니다.
//!
//! # 모듈 구성
//!
//! - [`model`]: 원시/디코드 메시지, Facility/Severity, 구조화 데이터, 통합 데이터
//! - [`parser`]: 변형 파서 체인과 값 추출기, 디코딩 오케스트레이터
//! - [`serializer`]: RFC 5424 직렬화
//! - [`queue`]: 다중 생산자/소비자 작업 큐
//! - [`broadcast`]: copy-on-write 구독자 팬아웃
//! - [`eps`]: 처리율 카운터
//! - [`processor`]: 제네릭 배치 워커 풀
//! - [`stream_parser`]: 디코드 워커 풀 특수화
//! - [`udp`]: UDP 리스너, 송신기, 파이프라인
//! - [`config`]: 파이프라인 설정 (core 설정 파생)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! UdpListener --RawMessage--> WorkQueue --batch--> workers: SyslogMessageParser
//!  (1 thread)                                          |
//!                                                      v
//!                                      Broadcaster<ParsedMessage> -> subscribers
//! ```

pub mod broadcast;
pub mod config;
pub mod eps;
pub mod error;
pub mod model;
pub mod parser;
pub mod processor;
pub mod queue;
pub mod serializer;
pub mod stream_parser;
pub mod udp;

// --- 주요 타입 re-export ---

// 모델
pub use model::{
    DataValue, Facility, NameValuePair, ParsedMessage, PayloadType, RawMessage, Severity,
    StructuredData, SyslogHeader, UnifiedData,
};

// 디코딩
pub use parser::{SyslogMessageParser, ValuesExtractor, VariantParser};
pub use serializer::serialize;

// 스트림 엔진
pub use broadcast::{Broadcaster, Subscriber, Subscription};
pub use eps::EpsCounter;
pub use processor::{ItemProcessor, ProcessorConfig, StreamProcessor};
pub use queue::WorkQueue;
pub use stream_parser::SyslogStreamParser;

// UDP
pub use udp::{ListenerStatus, SyslogUdpListener, SyslogUdpPipeline, SyslogUdpSender};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::SyslogPipelineError;
