//! 처리율(EPS, events per second) 카운터
//!
//! 누적 카운트는 원자적으로 증가하고, 처리율은 읽을 때 계산합니다.
//! 마지막 계산 이후 최소 샘플링 간격이 지나지 않았다면 캐시된 값을 그대로 돌려줍니다.
//! 외부에서 설정한 카운트가 기준값보다 작아지면(재시작, 롤오버) 기준을 다시 잡고 0을 반환합니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use syslog_decode_core::clock::{Clock, SystemClock};

/// 기본 최소 샘플링 간격
pub const DEFAULT_MIN_READ_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug)]
struct Sample {
    count: u64,
    at: DateTime<Utc>,
    eps: u64,
}

/// 이벤트 카운터 + 처리율 계산기
#[derive(Debug)]
pub struct EpsCounter {
    name: String,
    count: AtomicU64,
    min_interval: Duration,
    clock: Arc<dyn Clock>,
    last: Mutex<Sample>,
}

impl EpsCounter {
    /// 시스템 시계와 기본 샘플링 간격으로 생성합니다.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_clock(name, DEFAULT_MIN_READ_INTERVAL, Arc::new(SystemClock))
    }

    pub fn with_clock(
        name: impl Into<String>,
        min_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let at = clock.now();
        Self {
            name: name.into(),
            count: AtomicU64::new(0),
            min_interval,
            clock,
            last: Mutex::new(Sample { count: 0, at, eps: 0 }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 카운트를 1 증가시키고 새 값을 반환합니다.
    pub fn increment(&self) -> u64 {
        self.count.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// 카운트에 `value`를 더하고 새 값을 반환합니다.
    pub fn add(&self, value: u64) -> u64 {
        self.count.fetch_add(value, Ordering::Relaxed) + value
    }

    /// 현재 누적 카운트
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// 현재 처리율을 읽습니다.
    pub fn read_eps(&self) -> u64 {
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let elapsed = match (now - last.at).to_std() {
            Ok(elapsed) => elapsed,
            // 시계가 뒤로 간 경우 캐시 유지
            Err(_) => return last.eps,
        };
        if elapsed < self.min_interval || elapsed.is_zero() {
            return last.eps;
        }

        let current = self.count();
        let delta = current.saturating_sub(last.count);
        let eps = (delta as f64 / elapsed.as_secs_f64()) as u64;
        *last = Sample {
            count: current,
            at: now,
            eps,
        };
        eps
    }

    /// 외부에서 관측한 누적값을 반영한 뒤 처리율을 읽습니다.
    ///
    /// `value`가 현재 카운트보다 작으면 기준을 재설정하고 0을 반환합니다.
    pub fn read_eps_from(&self, value: u64) -> u64 {
        let previous = self.count.swap(value, Ordering::Relaxed);
        if value < previous {
            let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
            *last = Sample {
                count: value,
                at: self.clock.now(),
                eps: 0,
            };
            return 0;
        }
        self.read_eps()
    }
}
