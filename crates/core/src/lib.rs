//! syslog-decode 공통 크레이트
//!
//! 디코딩 엔진, 스트림 파이프라인, 데몬이 함께 사용하는 타입을 정의합니다.
//!
//! - [`error`]: 최상위 에러 분류
//! - [`config`]: `syslog-decode.toml` 파싱 및 환경변수 오버라이드
//! - [`clock`]: 주입 가능한 시계 (테스트에서 시간 고정/이동)
//! - [`health`]: 평면 key → 수치 헬스 스냅샷
//! - [`metrics`]: 메트릭 이름 상수 및 설명 등록

pub mod clock;
pub mod config;
pub mod error;
pub mod health;
pub mod metrics;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, PipelineError, SyslogError};

// 설정
pub use config::SyslogConfig;

// 시계
pub use clock::{Clock, ManualClock, SystemClock};

// 헬스
pub use health::{HealthData, HealthReporter};
