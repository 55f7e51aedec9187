//! 에러 타입 -- 도메인별 에러 정의

/// syslog-decode 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum SyslogError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 메시지 디코딩 중 내부 오류
    #[error("decode failed: {0}")]
    Decode(String),

    /// 전송 계층 (UDP 소켓) 오류
    #[error("transport failed: {0}")]
    Transport(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: SyslogError = ConfigError::InvalidValue {
            field: "parser.batch_size".to_owned(),
            reason: "must be 1-100000".to_owned(),
        }
        .into();
        assert!(matches!(err, SyslogError::Config(_)));
        assert!(err.to_string().contains("parser.batch_size"));
    }

    #[test]
    fn pipeline_error_display() {
        let err = PipelineError::Transport("socket closed".to_owned());
        assert_eq!(err.to_string(), "transport failed: socket closed");
    }
}
