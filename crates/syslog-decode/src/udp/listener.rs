//! UDP syslog 리스너
//!
//! 하나의 전용 수신 스레드가 소켓을 단독으로 읽습니다. 같은 소켓을 여러 스레드가
//! 동시에 읽으면 데이터그램 경계가 깨질 수 있으므로 수신은 항상 단일 스레드입니다.
//! 수신 스레드는 current-thread tokio 런타임 위에서 취소 토큰과 `recv_from`을
//! `select!`로 기다립니다.
//!
//! 각 데이터그램은 UTF-8(손실 허용)로 디코드되어 [`RawMessage`]로 브로드캐스트됩니다.
//! 정지 요청이 아닌 수신 오류는 오류 이벤트로 알리고 루프를 끝냅니다.
//! 자동 재시작은 하지 않습니다.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use metrics::Counter;
use socket2::{Domain, Protocol, Socket, Type};
use syslog_decode_core::clock::{Clock, SystemClock};
use syslog_decode_core::health::{HealthData, HealthReporter, health_key};
use syslog_decode_core::metrics as m;
use tokio::net::UdpSocket;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::broadcast::{Broadcaster, Subscriber, Subscription};
use crate::eps::{DEFAULT_MIN_READ_INTERVAL, EpsCounter};
use crate::error::SyslogPipelineError;
use crate::model::RawMessage;

/// 헬스 키: 누적 수신 패킷 수
pub const HEALTH_PACKET_COUNT: &str = "listener_packet_count";
/// 헬스 키: 수신 EPS
pub const HEALTH_INPUT_EPS: &str = "listener_input_eps";

const RECV_THREAD_NAME: &str = "syslog-udp-recv";

/// UDP 리스너 설정
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UdpListenerConfig {
    /// 바인드 주소 (예: "127.0.0.1:514", 포트 0이면 임의 포트)
    pub bind_addr: String,
    /// 요청할 SO_RCVBUF 크기 (커널이 줄일 수 있음)
    pub recv_buffer_size: usize,
    /// 수신 버퍼 크기 (이보다 긴 데이터그램은 잘림)
    pub max_message_size: usize,
}

impl Default for UdpListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:514".to_owned(),
            recv_buffer_size: 1 << 30,
            max_message_size: 65535,
        }
    }
}

/// 리스너 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerStatus {
    /// 생성됨, 아직 시작 전
    Idle,
    /// 수신 중
    Running,
    /// 수신 오류로 루프 종료 (재생성 필요)
    Error(String),
    /// 정상 정지
    Stopped,
}

struct Shared {
    output: Broadcaster<Arc<RawMessage>>,
    status: Mutex<ListenerStatus>,
    packets: EpsCounter,
    clock: Arc<dyn Clock>,
    received: Counter,
    errors: Counter,
}

impl Shared {
    fn set_status(&self, status: ListenerStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = status;
    }

    /// 패킷 수와 EPS는 빈 데이터그램도 셉니다. 브로드캐스트는 내용이 있을 때만.
    fn publish(&self, data: &[u8], peer: SocketAddr) {
        self.packets.increment();
        self.received.increment(1);
        let text = String::from_utf8_lossy(trim_trailing_newline(data));
        if text.is_empty() {
            trace!(peer = %peer, "empty datagram dropped");
            return;
        }
        let raw = Arc::new(RawMessage::new(text, Some(peer), self.clock.now()));
        self.output.broadcast(&raw);
    }
}

struct Running {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    local_addr: SocketAddr,
}

/// UDP syslog 리스너
pub struct SyslogUdpListener {
    config: UdpListenerConfig,
    shared: Arc<Shared>,
    running: Mutex<Option<Running>>,
}

impl SyslogUdpListener {
    pub fn new(config: UdpListenerConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// 수신 시각과 EPS 샘플링에 쓸 시계를 지정해 생성합니다.
    pub fn with_clock(config: UdpListenerConfig, clock: Arc<dyn Clock>) -> Self {
        let shared = Shared {
            output: Broadcaster::new(),
            status: Mutex::new(ListenerStatus::Idle),
            packets: EpsCounter::with_clock("packets", DEFAULT_MIN_READ_INTERVAL, clock.clone()),
            clock,
            received: metrics::counter!(m::LISTENER_PACKETS_RECEIVED_TOTAL),
            errors: metrics::counter!(m::LISTENER_RECEIVE_ERRORS_TOTAL),
        };
        Self {
            config,
            shared: Arc::new(shared),
            running: Mutex::new(None),
        }
    }

    /// 소켓을 바인드하고 수신 스레드를 시작합니다.
    ///
    /// 실제로 바인드된 주소를 반환합니다. 이미 실행 중이면 기존 주소를 반환합니다.
    pub fn start(&self) -> Result<SocketAddr, SyslogPipelineError> {
        let mut running = self.lock_running();
        if let Some(r) = running.as_ref() {
            return Ok(r.local_addr);
        }

        let socket = self.bind()?;
        let local_addr = socket.local_addr()?;
        let cancel = CancellationToken::new();

        let shared = Arc::clone(&self.shared);
        let token = cancel.clone();
        let max_message_size = self.config.max_message_size;
        let handle = thread::Builder::new()
            .name(RECV_THREAD_NAME.to_owned())
            .spawn(move || {
                run_receive_thread(socket, local_addr, shared, token, max_message_size)
            })?;

        self.shared.set_status(ListenerStatus::Running);
        info!(address = %local_addr, "syslog UDP listener started");
        *running = Some(Running {
            cancel,
            handle,
            local_addr,
        });
        Ok(local_addr)
    }

    /// 수신을 멈추고 수신 스레드를 join합니다.
    ///
    /// 소켓에 이미 도착한 데이터그램은 닫기 전에 모두 브로드캐스트합니다.
    pub fn stop(&self) {
        let Some(running) = self.lock_running().take() else {
            return;
        };
        running.cancel.cancel();
        if running.handle.join().is_err() {
            warn!("syslog UDP receive thread panicked");
        }
        // 수신 오류로 먼저 끝났다면 Error 상태를 유지
        let mut status = self.shared.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status == ListenerStatus::Running {
            *status = ListenerStatus::Stopped;
        }
        info!(address = %running.local_addr, "syslog UDP listener stopped");
    }

    /// 수신된 원시 메시지 구독자를 추가합니다.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<Arc<RawMessage>>>) -> Subscription {
        self.shared.output.subscribe(subscriber)
    }

    /// 바인드된 주소 (실행 중일 때만)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock_running().as_ref().map(|r| r.local_addr)
    }

    pub fn status(&self) -> ListenerStatus {
        self.shared
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &UdpListenerConfig {
        &self.config
    }

    /// 누적 수신 패킷 수
    pub fn packet_count(&self) -> u64 {
        self.shared.packets.count()
    }

    fn bind(&self) -> Result<std::net::UdpSocket, SyslogPipelineError> {
        let listener_err = |reason: String| SyslogPipelineError::Listener {
            address: self.config.bind_addr.clone(),
            reason,
        };
        let addr: SocketAddr = self
            .config
            .bind_addr
            .parse()
            .map_err(|e| listener_err(format!("invalid bind address: {e}")))?;

        let domain = if addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };
        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
            .map_err(|e| listener_err(format!("socket: {e}")))?;

        if let Err(e) = socket.set_recv_buffer_size(self.config.recv_buffer_size) {
            warn!(
                error = %e,
                requested_size = self.config.recv_buffer_size,
                "failed to set UDP SO_RCVBUF"
            );
        }

        socket
            .bind(&addr.into())
            .map_err(|e| listener_err(format!("bind: {e}")))?;
        socket.set_nonblocking(true)?;
        Ok(socket.into())
    }

    fn lock_running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SyslogUdpListener {
    fn drop(&mut self) {
        if let Some(running) = self.lock_running().as_ref() {
            running.cancel.cancel();
        }
    }
}

impl HealthReporter for SyslogUdpListener {
    fn add_health_data(&self, data: &mut HealthData, prefix: &str) {
        data.insert(
            health_key(prefix, HEALTH_PACKET_COUNT),
            self.shared.packets.count() as f64,
        );
        data.insert(
            health_key(prefix, HEALTH_INPUT_EPS),
            self.shared.packets.read_eps() as f64,
        );
    }
}

impl std::fmt::Debug for SyslogUdpListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyslogUdpListener")
            .field("config", &self.config)
            .field("status", &self.status())
            .finish()
    }
}

fn run_receive_thread(
    socket: std::net::UdpSocket,
    address: SocketAddr,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    max_message_size: usize,
) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_io()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            fail(&shared, address, &e.to_string(), "failed to build receive runtime");
            return;
        }
    };

    runtime.block_on(async move {
        let socket = match UdpSocket::from_std(socket) {
            Ok(s) => s,
            Err(e) => {
                fail(&shared, address, &e.to_string(), "failed to register UDP socket");
                return;
            }
        };
        receive_loop(&socket, address, &shared, &cancel, max_message_size).await;
    });
}

async fn receive_loop(
    socket: &UdpSocket,
    address: SocketAddr,
    shared: &Shared,
    cancel: &CancellationToken,
    max_message_size: usize,
) {
    let mut buf = vec![0u8; max_message_size.max(1)];
    debug!("syslog UDP receive loop started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                drain_pending(socket, shared, &mut buf);
                break;
            }

            result = socket.recv_from(&mut buf) => match result {
                Ok((len, peer)) => shared.publish(&buf[..len], peer),
                Err(e) => {
                    fail(shared, address, &e.to_string(), "syslog UDP receive failed");
                    return;
                }
            },
        }
    }
    debug!("syslog UDP receive loop finished");
}

/// 소켓 버퍼에 남은 데이터그램을 비블로킹으로 모두 읽습니다.
fn drain_pending(socket: &UdpSocket, shared: &Shared, buf: &mut [u8]) {
    let mut drained = 0usize;
    while let Ok((len, peer)) = socket.try_recv_from(buf) {
        shared.publish(&buf[..len], peer);
        drained += 1;
    }
    if drained > 0 {
        debug!(drained, "drained pending datagrams before close");
    }
}

fn fail(shared: &Shared, address: SocketAddr, reason: &str, message: &str) {
    error!(address = %address, error = reason, "{message}");
    shared.errors.increment(1);
    shared.output.broadcast_error(&SyslogPipelineError::Listener {
        address: address.to_string(),
        reason: reason.to_owned(),
    });
    shared.set_status(ListenerStatus::Error(reason.to_owned()));
}

/// 일부 클라이언트가 붙이는 끝 줄바꿈(`\n`, `\r\n`)과 NUL을 제거합니다.
fn trim_trailing_newline(data: &[u8]) -> &[u8] {
    let mut end = data.len();
    while end > 0 && matches!(data[end - 1], b'\n' | b'\r' | 0) {
        end -= 1;
    }
    &data[..end]
}
