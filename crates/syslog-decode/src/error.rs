//! syslog-decode 에러 타입
//!
//! [`SyslogPipelineError`]는 디코딩 엔진과 스트림 파이프라인 내부에서 발생하는
//! 모든 에러를 표현합니다. `From<SyslogPipelineError> for SyslogError` 변환이
//! 구현되어 있어 상위 레이어에서 `?` 연산자로 전파할 수 있습니다.
//!
//! "내 형식이 아님"은 에러가 아닙니다. 변형 파서는 `Ok(false)`를 반환하고,
//! 예기치 못한 내부 오류만 `Err`로 보고합니다.

use syslog_decode_core::error::{ConfigError, PipelineError, SyslogError};

/// syslog-decode 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum SyslogPipelineError {
    /// 변형 파서 내부 오류 (디코드 체인 전체를 중단시킴)
    #[error("parse error: {format} at offset {offset}: {reason}")]
    Parse {
        /// 파서 형식 (rfc5424, rfc3164 등)
        format: String,
        /// 실패 위치 (문자 오프셋)
        offset: usize,
        /// 실패 사유
        reason: String,
        /// 문제가 된 원문
        text: String,
    },

    /// 항목 처리 중 발생한 패닉 또는 변환 실패
    #[error("transform error: {0}")]
    Transform(String),

    /// UDP 리스너 오류
    #[error("listener error: {address}: {reason}")]
    Listener {
        /// 바인드 주소
        address: String,
        /// 에러 사유
        reason: String,
    },

    /// UDP 송신 오류
    #[error("sender error: {target}: {reason}")]
    Sender {
        /// 대상 주소
        target: String,
        /// 에러 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<SyslogPipelineError> for SyslogError {
    fn from(err: SyslogPipelineError) -> Self {
        match err {
            SyslogPipelineError::Config { field, reason } => {
                SyslogError::Config(ConfigError::InvalidValue { field, reason })
            }
            SyslogPipelineError::Io(e) => SyslogError::Io(e),
            SyslogPipelineError::Listener { .. } | SyslogPipelineError::Sender { .. } => {
                SyslogError::Pipeline(PipelineError::Transport(err.to_string()))
            }
            SyslogPipelineError::Parse { .. } | SyslogPipelineError::Transform(_) => {
                SyslogError::Pipeline(PipelineError::Decode(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_display() {
        let err = SyslogPipelineError::Parse {
            format: "rfc5424".to_owned(),
            offset: 42,
            reason: "unexpected character".to_owned(),
            text: "<34>1 ...".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("rfc5424"));
        assert!(msg.contains("42"));
        assert!(msg.contains("unexpected character"));
    }

    #[test]
    fn config_error_maps_to_invalid_value() {
        let err = SyslogPipelineError::Config {
            field: "batch_size".to_owned(),
            reason: "must be 1-100000".to_owned(),
        };
        let top: SyslogError = err.into();
        assert!(matches!(
            top,
            SyslogError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn listener_error_maps_to_transport() {
        let err = SyslogPipelineError::Listener {
            address: "127.0.0.1:514".to_owned(),
            reason: "address in use".to_owned(),
        };
        let top: SyslogError = err.into();
        assert!(matches!(
            top,
            SyslogError::Pipeline(PipelineError::Transport(_))
        ));
    }

    #[test]
    fn transform_error_maps_to_decode() {
        let top: SyslogError = SyslogPipelineError::Transform("boom".to_owned()).into();
        assert!(top.to_string().contains("boom"));
    }
}
