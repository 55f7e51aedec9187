//! 설정 관리 -- syslog-decode.toml 파싱 및 런타임 설정
//!
//! [`SyslogConfig`]는 리스너, 파서, 포워더, 헬스, 메트릭 설정을 담는
//! 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SYSLOG_DECODE_LISTENER_BIND_ADDR=0.0.0.0:514` 형식)
//! 3. 설정 파일 (`syslog-decode.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), syslog_decode_core::error::SyslogError> {
//! use syslog_decode_core::config::SyslogConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = SyslogConfig::load("syslog-decode.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = SyslogConfig::parse("[parser]\nbatch_size = 250")?;
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, SyslogError};

/// 배치 크기 상한
const MAX_BATCH_SIZE: usize = 100_000;

/// 워커 스레드 수 상한
const MAX_THREAD_COUNT: usize = 1024;

/// UDP 데이터그램 최대 크기
const MAX_DATAGRAM_SIZE: usize = 65_535;

/// syslog-decode 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyslogConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// UDP 리스너 설정
    #[serde(default)]
    pub listener: ListenerConfig,
    /// 스트림 파서 설정
    #[serde(default)]
    pub parser: ParserConfig,
    /// 재전송 설정
    #[serde(default)]
    pub forward: ForwardConfig,
    /// 주기적 헬스 로그 설정
    #[serde(default)]
    pub health: HealthConfig,
    /// Prometheus 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl SyslogConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, SyslogError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, SyslogError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SyslogError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                SyslogError::Io(e)
            }
        })?;
        let config = Self::parse(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, SyslogError> {
        toml::from_str(toml_str).map_err(|e| {
            SyslogError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SYSLOG_DECODE_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(
            &mut self.general.log_level,
            "SYSLOG_DECODE_GENERAL_LOG_LEVEL",
        );
        override_string(
            &mut self.general.log_format,
            "SYSLOG_DECODE_GENERAL_LOG_FORMAT",
        );

        // Listener
        override_string(
            &mut self.listener.bind_addr,
            "SYSLOG_DECODE_LISTENER_BIND_ADDR",
        );
        override_usize(
            &mut self.listener.recv_buffer_size,
            "SYSLOG_DECODE_LISTENER_RECV_BUFFER_SIZE",
        );
        override_usize(
            &mut self.listener.max_message_size,
            "SYSLOG_DECODE_LISTENER_MAX_MESSAGE_SIZE",
        );

        // Parser
        override_usize(
            &mut self.parser.batch_size,
            "SYSLOG_DECODE_PARSER_BATCH_SIZE",
        );
        override_usize(
            &mut self.parser.thread_count,
            "SYSLOG_DECODE_PARSER_THREAD_COUNT",
        );
        override_u64(
            &mut self.parser.idle_pause_ms,
            "SYSLOG_DECODE_PARSER_IDLE_PAUSE_MS",
        );
        override_u64(
            &mut self.parser.eps_min_read_interval_secs,
            "SYSLOG_DECODE_PARSER_EPS_MIN_READ_INTERVAL_SECS",
        );

        // Forward
        override_bool(&mut self.forward.enabled, "SYSLOG_DECODE_FORWARD_ENABLED");
        override_string(&mut self.forward.target, "SYSLOG_DECODE_FORWARD_TARGET");

        // Health
        override_u64(
            &mut self.health.interval_secs,
            "SYSLOG_DECODE_HEALTH_INTERVAL_SECS",
        );

        // Metrics
        override_bool(&mut self.metrics.enabled, "SYSLOG_DECODE_METRICS_ENABLED");
        override_string(
            &mut self.metrics.listen_addr,
            "SYSLOG_DECODE_METRICS_LISTEN_ADDR",
        );
        override_u16(&mut self.metrics.port, "SYSLOG_DECODE_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SyslogError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.listener.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "listener.bind_addr",
                format!("'{}' is not a socket address", self.listener.bind_addr),
            ));
        }

        if self.listener.recv_buffer_size == 0 {
            return Err(invalid("listener.recv_buffer_size", "must be > 0".to_owned()));
        }

        if self.listener.max_message_size == 0 || self.listener.max_message_size > MAX_DATAGRAM_SIZE
        {
            return Err(invalid(
                "listener.max_message_size",
                format!("must be 1-{MAX_DATAGRAM_SIZE}"),
            ));
        }

        if self.parser.batch_size == 0 || self.parser.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "parser.batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }

        // 0은 가용 병렬도 사용
        if self.parser.thread_count > MAX_THREAD_COUNT {
            return Err(invalid(
                "parser.thread_count",
                format!("must be 0-{MAX_THREAD_COUNT}"),
            ));
        }

        if self.parser.idle_pause_ms == 0 {
            return Err(invalid("parser.idle_pause_ms", "must be > 0".to_owned()));
        }

        if self.forward.enabled && self.forward.target.parse::<SocketAddr>().is_err() {
            return Err(invalid(
                "forward.target",
                format!("'{}' is not a socket address", self.forward.target),
            ));
        }

        if self.health.interval_secs == 0 {
            return Err(invalid("health.interval_secs", "must be > 0".to_owned()));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid("metrics.port", "must be > 0".to_owned()));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> SyslogError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// UDP 리스너 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// 바인드 주소
    pub bind_addr: String,
    /// 소켓 수신 버퍼 요청 크기 (바이트, 커널이 제한할 수 있음)
    pub recv_buffer_size: usize,
    /// 데이터그램 최대 크기 (바이트)
    pub max_message_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:514".to_owned(),
            recv_buffer_size: 1024 * 1024 * 1024, // 1GiB
            max_message_size: MAX_DATAGRAM_SIZE,
        }
    }
}

/// 스트림 파서 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// 워커가 한 번에 꺼내는 최대 항목 수
    pub batch_size: usize,
    /// 워커 스레드 수 (0 = 가용 병렬도)
    pub thread_count: usize,
    /// 큐가 비었을 때 대기 간격 (밀리초)
    pub idle_pause_ms: u64,
    /// EPS 값 재계산 최소 간격 (초)
    pub eps_min_read_interval_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            thread_count: 0,
            idle_pause_ms: 10,
            eps_min_read_interval_secs: 5,
        }
    }
}

/// 재전송 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// 대상 주소
    pub target: String,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            target: "127.0.0.1:514".to_owned(),
        }
    }
}

/// 주기적 헬스 로그 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    /// 헬스 스냅샷 기록 주기 (초)
    pub interval_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Prometheus 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// 활성화 여부
    pub enabled: bool,
    /// HTTP 리스너 주소
    pub listen_addr: String,
    /// HTTP 리스너 포트
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
