//! UDP 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`SyslogConfig`]에서 리스너/파서 섹션을 가져와
//! 리스너 설정과 처리 엔진 설정으로 나눠 줍니다.
//!
//! # 사용 예시
//! ```ignore
//! use syslog_decode_core::config::SyslogConfig;
//! use syslog_decode::config::PipelineConfig;
//!
//! let core_config = SyslogConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use syslog_decode_core::config::SyslogConfig;

use crate::error::SyslogPipelineError;
use crate::processor::ProcessorConfig;
use crate::udp::UdpListenerConfig;

const MAX_BATCH_SIZE: usize = 100_000;
const MAX_THREAD_COUNT: usize = 1024;

/// UDP 파이프라인 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 수신 바인드 주소
    pub bind_addr: String,
    /// 요청할 소켓 수신 버퍼 크기 (바이트)
    pub recv_buffer_size: usize,
    /// 최대 데이터그램 크기 (바이트)
    pub max_message_size: usize,
    /// 워커가 한 번에 꺼내는 최대 항목 수
    pub batch_size: usize,
    /// 디코드 워커 수 (0 = 사용 가능한 병렬성)
    pub thread_count: usize,
    /// 빈 큐 대기 간격 (밀리초)
    pub idle_pause_ms: u64,
    /// EPS 최소 샘플링 간격 (초)
    pub eps_min_read_interval_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:514".to_owned(),
            recv_buffer_size: 1 << 30,
            max_message_size: 65535,
            batch_size: 100,
            thread_count: 0,
            idle_pause_ms: 10,
            eps_min_read_interval_secs: 5,
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    pub fn from_core(core: &SyslogConfig) -> Self {
        Self {
            bind_addr: core.listener.bind_addr.clone(),
            recv_buffer_size: core.listener.recv_buffer_size,
            max_message_size: core.listener.max_message_size,
            batch_size: core.parser.batch_size,
            thread_count: core.parser.thread_count,
            idle_pause_ms: core.parser.idle_pause_ms,
            eps_min_read_interval_secs: core.parser.eps_min_read_interval_secs,
        }
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), SyslogPipelineError> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            return Err(config_err(
                "bind_addr",
                format!("'{}' is not a socket address", self.bind_addr),
            ));
        }

        if self.recv_buffer_size == 0 {
            return Err(config_err("recv_buffer_size", "must be greater than 0"));
        }

        if self.max_message_size == 0 || self.max_message_size > 65535 {
            return Err(config_err("max_message_size", "must be 1-65535"));
        }

        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(config_err(
                "batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }

        if self.thread_count > MAX_THREAD_COUNT {
            return Err(config_err(
                "thread_count",
                format!("must be 0-{MAX_THREAD_COUNT}"),
            ));
        }

        if self.idle_pause_ms == 0 {
            return Err(config_err("idle_pause_ms", "must be greater than 0"));
        }

        Ok(())
    }

    /// 리스너 설정
    pub fn listener_config(&self) -> UdpListenerConfig {
        UdpListenerConfig {
            bind_addr: self.bind_addr.clone(),
            recv_buffer_size: self.recv_buffer_size,
            max_message_size: self.max_message_size,
        }
    }

    /// 디코드 처리 엔진 설정 (`parser` 단계)
    pub fn processor_config(&self) -> ProcessorConfig {
        ProcessorConfig {
            name: "parser".to_owned(),
            batch_size: self.batch_size,
            thread_count: self.thread_count,
            idle_pause: Duration::from_millis(self.idle_pause_ms),
            eps_min_interval: Duration::from_secs(self.eps_min_read_interval_secs),
        }
    }
}

fn config_err(field: &str, reason: impl Into<String>) -> SyslogPipelineError {
    SyslogPipelineError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 바인드 주소를 설정합니다.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.bind_addr = addr.into();
        self
    }

    pub fn recv_buffer_size(mut self, size: usize) -> Self {
        self.config.recv_buffer_size = size;
        self
    }

    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = size;
        self
    }

    /// 배치 크기를 설정합니다.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.config.batch_size = size;
        self
    }

    /// 워커 수를 설정합니다.
    pub fn thread_count(mut self, count: usize) -> Self {
        self.config.thread_count = count;
        self
    }

    pub fn idle_pause_ms(mut self, ms: u64) -> Self {
        self.config.idle_pause_ms = ms;
        self
    }

    pub fn eps_min_read_interval_secs(mut self, secs: u64) -> Self {
        self.config.eps_min_read_interval_secs = secs;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, SyslogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        PipelineConfig::default().validate().unwrap();
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = SyslogConfig::default();
        core.listener.bind_addr = "0.0.0.0:5140".to_owned();
        core.parser.batch_size = 250;
        core.parser.thread_count = 3;
        let config = PipelineConfig::from_core(&core);
        assert_eq!(config.bind_addr, "0.0.0.0:5140");
        assert_eq!(config.batch_size, 250);
        assert_eq!(config.thread_count, 3);
        assert_eq!(config.max_message_size, 65535);
    }

    #[test]
    fn validate_rejects_bad_values() {
        let cases = [
            PipelineConfig {
                bind_addr: "localhost".to_owned(),
                ..Default::default()
            },
            PipelineConfig {
                batch_size: 0,
                ..Default::default()
            },
            PipelineConfig {
                max_message_size: 70_000,
                ..Default::default()
            },
            PipelineConfig {
                idle_pause_ms: 0,
                ..Default::default()
            },
            PipelineConfig {
                thread_count: 5_000,
                ..Default::default()
            },
        ];
        for config in cases {
            let err = config.validate().unwrap_err();
            assert!(matches!(err, SyslogPipelineError::Config { .. }), "{config:?}");
        }
    }

    #[test]
    fn derived_configs_match() {
        let config = PipelineConfigBuilder::new()
            .bind_addr("127.0.0.1:0")
            .batch_size(20)
            .thread_count(2)
            .idle_pause_ms(3)
            .build()
            .unwrap();
        let processor = config.processor_config();
        assert_eq!(processor.name, "parser");
        assert_eq!(processor.batch_size, 20);
        assert_eq!(processor.thread_count, 2);
        assert_eq!(processor.idle_pause, Duration::from_millis(3));
        assert_eq!(config.listener_config().bind_addr, "127.0.0.1:0");
    }

    #[test]
    fn builder_rejects_invalid_config() {
        assert!(PipelineConfigBuilder::new().batch_size(0).build().is_err());
    }
}
