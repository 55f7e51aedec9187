//! 스트림 처리 엔진 -- 배치 단위 다중 워커 풀
//!
//! [`StreamProcessor`]는 입력 [`WorkQueue`]와 출력 [`Broadcaster`]를 묶은 제네릭 엔진입니다.
//! 전용 OS 스레드 워커가 각자 다음 루프를 반복합니다.
//!
//! 1. 큐가 비어 있으면 유휴 간격만큼 잠든 뒤 다시 확인
//! 2. 큐 길이가 배치 크기의 절반 미만이면 한 번 더 잠들어 배치가 차기를 기다림
//! 3. 최대 `batch_size`개를 꺼내 항목마다 [`ItemProcessor`]를 실행
//!
//! 한 항목의 `Err`나 패닉은 출력 쪽 오류 경로로 보고되며 워커와 같은 배치의
//! 나머지 항목에는 영향을 주지 않습니다. 워커 사이의 출력 순서는 보장하지 않습니다.
//!
//! # 종료
//! [`StreamProcessor::stop`]은 큐가 비고 처리 중인 배치가 없을 때까지 기다린 뒤
//! 실행 플래그를 내리고 워커를 join합니다. 개별 항목 처리에는 타임아웃이 없습니다.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use metrics::{Counter, Gauge};
use syslog_decode_core::clock::{Clock, SystemClock};
use syslog_decode_core::metrics as m;
use tracing::{debug, info, warn};

use crate::broadcast::{Broadcaster, Subscriber, Subscription};
use crate::eps::{DEFAULT_MIN_READ_INTERVAL, EpsCounter};
use crate::error::SyslogPipelineError;
use crate::queue::WorkQueue;

/// 기본 배치 크기
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// 기본 유휴 대기 간격
pub const DEFAULT_IDLE_PAUSE: Duration = Duration::from_millis(10);

/// 유휴 대기 간격 하한
pub const MIN_IDLE_PAUSE: Duration = Duration::from_millis(1);

/// 항목 하나를 변환하는 처리기
///
/// `Ok(None)`은 출력 없이 항목을 소비했다는 뜻입니다.
pub trait ItemProcessor<I, O>: Send + Sync {
    fn process(&self, item: I) -> Result<Option<O>, SyslogPipelineError>;
}

/// 처리 엔진 설정
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// 로그/메트릭 `stage` 라벨
    pub name: String,
    pub batch_size: usize,
    /// 워커 수 (0 = 사용 가능한 병렬성)
    pub thread_count: usize,
    pub idle_pause: Duration,
    pub eps_min_interval: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            name: "processor".to_owned(),
            batch_size: DEFAULT_BATCH_SIZE,
            thread_count: 0,
            idle_pause: DEFAULT_IDLE_PAUSE,
            eps_min_interval: DEFAULT_MIN_READ_INTERVAL,
        }
    }
}

impl ProcessorConfig {
    /// 실제로 띄울 워커 수
    pub fn effective_thread_count(&self) -> usize {
        if self.thread_count > 0 {
            return self.thread_count;
        }
        thread::available_parallelism().map_or(1, |n| n.get())
    }

    /// 워커 루프가 진행할 수 없는 값을 하한으로 올립니다.
    ///
    /// `batch_size == 0`이면 큐에서 아무것도 꺼내지 못하고,
    /// `idle_pause == 0`이면 빈 큐에서 바쁜 대기를 합니다.
    pub fn normalized(mut self) -> Self {
        if self.batch_size == 0 {
            warn!(stage = %self.name, "batch_size 0 raised to 1");
            self.batch_size = 1;
        }
        if self.idle_pause < MIN_IDLE_PAUSE {
            warn!(stage = %self.name, idle_pause = ?self.idle_pause, "idle_pause raised to 1ms");
            self.idle_pause = MIN_IDLE_PAUSE;
        }
        self
    }
}

struct Shared<I, O> {
    config: ProcessorConfig,
    queue: WorkQueue<I>,
    output: Broadcaster<O>,
    transform: Box<dyn ItemProcessor<I, O>>,
    running: AtomicBool,
    active: AtomicUsize,
    idle_polls: AtomicU64,
    input_eps: EpsCounter,
    output_eps: EpsCounter,
    items_in: Counter,
    items_out: Counter,
    faults: Counter,
    queue_depth: Gauge,
}

impl<I, O: 'static> Shared<I, O> {
    fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.active.load(Ordering::SeqCst) == 0
    }

    fn emit(&self, item: &O) {
        self.output_eps.increment();
        self.items_out.increment(1);
        self.output.broadcast(item);
    }

    fn process_one(&self, item: I) {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<(), SyslogPipelineError> {
            if let Some(out) = self.transform.process(item)? {
                self.emit(&out);
            }
            Ok(())
        }));

        let error = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e,
            Err(payload) => SyslogPipelineError::Transform(panic_message(payload.as_ref())),
        };
        self.faults.increment(1);
        warn!(stage = %self.config.name, error = %error, "item processing failed");
        self.output.broadcast_error(&error);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic: <non-string payload>".to_owned()
    }
}

fn run_worker<I, O: 'static>(shared: Arc<Shared<I, O>>, index: usize) {
    debug!(stage = %shared.config.name, worker = index, "worker started");
    let batch_size = shared.config.batch_size;
    let idle = shared.config.idle_pause;

    while shared.running.load(Ordering::Acquire) {
        if shared.queue.is_empty() {
            shared.idle_polls.fetch_add(1, Ordering::Relaxed);
            thread::sleep(idle);
            continue;
        }
        // 배치가 반도 안 차면 한 번 더 기다림
        if shared.queue.len() < batch_size / 2 {
            thread::sleep(idle);
        }

        // 꺼내기 전에 증가시켜야 drain이 빈 큐 + 0 을 잘못 관측하지 않음
        shared.active.fetch_add(1, Ordering::SeqCst);
        let items = shared.queue.dequeue_many(batch_size);
        shared.queue_depth.set(shared.queue.len() as f64);
        for item in items {
            shared.process_one(item);
        }
        shared.active.fetch_sub(1, Ordering::SeqCst);
    }
    debug!(stage = %shared.config.name, worker = index, "worker stopped");
}

/// 제네릭 다중 워커 스트림 처리기
pub struct StreamProcessor<I, O> {
    shared: Arc<Shared<I, O>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl<I, O> StreamProcessor<I, O>
where
    I: Send + 'static,
    O: 'static,
{
    pub fn new(config: ProcessorConfig, transform: Box<dyn ItemProcessor<I, O>>) -> Self {
        Self::with_clock(config, transform, Arc::new(SystemClock))
    }

    /// EPS 샘플링에 쓸 시계를 지정해 생성합니다.
    pub fn with_clock(
        config: ProcessorConfig,
        transform: Box<dyn ItemProcessor<I, O>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = config.normalized();
        let stage = config.name.clone();
        let shared = Shared {
            input_eps: EpsCounter::with_clock("input", config.eps_min_interval, clock.clone()),
            output_eps: EpsCounter::with_clock("output", config.eps_min_interval, clock),
            items_in: metrics::counter!(m::PARSER_ITEMS_INPUT_TOTAL, m::LABEL_STAGE => stage.clone()),
            items_out: metrics::counter!(m::PARSER_ITEMS_OUTPUT_TOTAL, m::LABEL_STAGE => stage.clone()),
            faults: metrics::counter!(m::PARSER_FAULTS_TOTAL, m::LABEL_STAGE => stage.clone()),
            queue_depth: metrics::gauge!(m::PARSER_QUEUE_DEPTH, m::LABEL_STAGE => stage),
            config,
            queue: WorkQueue::new(),
            output: Broadcaster::new(),
            transform,
            running: AtomicBool::new(false),
            active: AtomicUsize::new(0),
            idle_polls: AtomicU64::new(0),
        };
        Self {
            shared: Arc::new(shared),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// 워커 풀을 시작합니다. 이미 실행 중이면 아무 일도 하지 않습니다.
    pub fn start(&self) -> Result<(), SyslogPipelineError> {
        if self
            .shared
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(());
        }

        let count = self.shared.config.effective_thread_count();
        let mut workers = self.lock_workers();
        for index in 0..count {
            let shared = Arc::clone(&self.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-worker-{index}", self.shared.config.name))
                .spawn(move || run_worker(shared, index));
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => {
                    self.shared.running.store(false, Ordering::Release);
                    return Err(e.into());
                }
            }
        }
        info!(
            stage = %self.shared.config.name,
            workers = count,
            batch_size = self.shared.config.batch_size,
            "stream processor started"
        );
        Ok(())
    }

    /// 항목을 큐에 넣습니다. 풀이 멈춰 있으면 시작합니다.
    pub fn submit(&self, item: I) {
        self.shared.queue.enqueue(item);
        self.shared.input_eps.increment();
        self.shared.items_in.increment(1);
        self.shared.queue_depth.set(self.shared.queue.len() as f64);

        if !self.shared.running.load(Ordering::Acquire) {
            if let Err(e) = self.start() {
                warn!(stage = %self.shared.config.name, error = %e, "failed to auto-start workers");
            }
        }
    }

    /// 큐가 비고 처리 중인 배치가 없을 때까지 블로킹합니다.
    pub fn drain(&self) {
        while !self.shared.is_idle() {
            thread::sleep(self.shared.config.idle_pause);
        }
    }

    /// 남은 항목을 모두 처리한 뒤 워커를 멈추고 구독자에게 종료를 통지합니다.
    pub fn stop(&self) {
        self.drain();
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);

        let handles: Vec<_> = self.lock_workers().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                warn!(stage = %self.shared.config.name, "worker thread panicked");
            }
        }
        if was_running {
            info!(
                stage = %self.shared.config.name,
                processed = self.output_count(),
                "stream processor stopped"
            );
        }
        self.shared.output.complete();
    }

    /// 출력 구독자를 추가합니다.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<O>>) -> Subscription {
        self.shared.output.subscribe(subscriber)
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    pub fn is_idle(&self) -> bool {
        self.shared.is_idle()
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.shared.config
    }

    /// 지금까지 제출된 항목 수
    pub fn input_count(&self) -> u64 {
        self.shared.input_eps.count()
    }

    /// 지금까지 브로드캐스트된 항목 수
    pub fn output_count(&self) -> u64 {
        self.shared.output_eps.count()
    }

    pub fn input_eps(&self) -> u64 {
        self.shared.input_eps.read_eps()
    }

    pub fn output_eps(&self) -> u64 {
        self.shared.output_eps.read_eps()
    }

    pub fn queue_len(&self) -> usize {
        self.shared.queue.len()
    }

    /// 배치를 처리 중인 워커 수
    pub fn active_count(&self) -> usize {
        self.shared.active.load(Ordering::SeqCst)
    }

    /// 워커들이 빈 큐를 보고 잠든 횟수
    pub fn idle_poll_count(&self) -> u64 {
        self.shared.idle_polls.load(Ordering::Relaxed)
    }

    fn lock_workers(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.workers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<I, O> Drop for StreamProcessor<I, O> {
    fn drop(&mut self) {
        // join 없이 루프만 끝나게 함
        self.shared.running.store(false, Ordering::Release);
    }
}

impl<I, O> std::fmt::Debug for StreamProcessor<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamProcessor")
            .field("config", &self.shared.config)
            .field("running", &self.shared.running.load(Ordering::Relaxed))
            .field("queue_len", &self.shared.queue.len())
            .finish()
    }
}

/// 상류 단계의 구독자로 붙을 수 있습니다.
impl<I, O> Subscriber<I> for StreamProcessor<I, O>
where
    I: Clone + Send + Sync + 'static,
    O: 'static,
{
    fn on_next(&self, item: &I) {
        self.submit(item.clone());
    }

    fn on_error(&self, error: &SyslogPipelineError) {
        // 상류 오류는 상류에서 이미 보고됨
        debug!(stage = %self.shared.config.name, error = %error, "upstream error");
    }

    fn on_completed(&self) {
        self.drain();
    }
}
