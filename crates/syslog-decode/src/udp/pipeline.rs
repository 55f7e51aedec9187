//! UDP 파이프라인 -- 리스너를 스트림 파서에 연결
//!
//! ```text
//! UDP socket -> SyslogUdpListener -> SyslogStreamParser (N workers) -> subscribers
//!  (1 thread)      RawMessage            decode + extract              ParsedMessage
//! ```
//!
//! 정지는 리스너를 먼저 멈춘 뒤 파서가 큐를 모두 비우게 하므로,
//! 정지 시점까지 수신된 데이터그램은 유실되지 않습니다.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use syslog_decode_core::clock::{Clock, SystemClock};
use syslog_decode_core::health::{HealthData, HealthReporter};
use tracing::info;

use super::listener::SyslogUdpListener;
use crate::broadcast::{Subscriber, Subscription};
use crate::config::PipelineConfig;
use crate::error::SyslogPipelineError;
use crate::model::{ParsedMessage, RawMessage};
use crate::parser::SyslogMessageParser;
use crate::stream_parser::SyslogStreamParser;

/// 리스너 + 스트림 파서
pub struct SyslogUdpPipeline {
    config: PipelineConfig,
    listener: SyslogUdpListener,
    parser: Arc<SyslogStreamParser>,
    link: Mutex<Option<Subscription>>,
}

impl SyslogUdpPipeline {
    /// 기본 디코더 체인으로 파이프라인을 생성합니다.
    pub fn new(config: PipelineConfig) -> Result<Self, SyslogPipelineError> {
        Self::with_parser(config, SyslogMessageParser::with_defaults(), Arc::new(SystemClock))
    }

    /// 디코더와 시계를 지정해 생성합니다.
    pub fn with_parser(
        config: PipelineConfig,
        decoder: SyslogMessageParser,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SyslogPipelineError> {
        config.validate()?;
        let listener = SyslogUdpListener::with_clock(config.listener_config(), clock.clone());
        let parser = Arc::new(SyslogStreamParser::with_clock(
            config.processor_config(),
            decoder,
            clock,
        ));
        Ok(Self {
            config,
            listener,
            parser,
            link: Mutex::new(None),
        })
    }

    /// 파서 워커와 리스너를 시작하고 바인드된 주소를 반환합니다.
    pub fn start(&self) -> Result<SocketAddr, SyslogPipelineError> {
        {
            let mut link = self.link.lock().unwrap_or_else(PoisonError::into_inner);
            if link.is_none() {
                let parser: Arc<dyn Subscriber<Arc<RawMessage>>> = self.parser.clone();
                *link = Some(self.listener.subscribe(parser));
            }
        }
        self.parser.start()?;
        let addr = self.listener.start()?;
        info!(address = %addr, "syslog UDP pipeline started");
        Ok(addr)
    }

    /// 리스너를 멈추고 남은 메시지를 모두 디코드한 뒤 파서를 멈춥니다.
    pub fn stop(&self) {
        self.listener.stop();
        self.parser.stop();
        info!(
            received = self.listener.packet_count(),
            decoded = self.parser.processor().output_count(),
            "syslog UDP pipeline stopped"
        );
    }

    /// 디코드된 메시지 구독자를 추가합니다.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<ParsedMessage>>) -> Subscription {
        self.parser.subscribe(subscriber)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.local_addr()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn listener(&self) -> &SyslogUdpListener {
        &self.listener
    }

    pub fn parser(&self) -> &SyslogStreamParser {
        &self.parser
    }
}

impl HealthReporter for SyslogUdpPipeline {
    fn add_health_data(&self, data: &mut HealthData, prefix: &str) {
        self.listener.add_health_data(data, prefix);
        self.parser.add_health_data(data, prefix);
    }
}

impl std::fmt::Debug for SyslogUdpPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogUdpPipeline")
            .field("config", &self.config)
            .field("listener", &self.listener)
            .field("parser", &self.parser)
            .finish()
    }
}
