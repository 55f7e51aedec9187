//! 시계 추상화
//!
//! 현재 시각이 필요한 컴포넌트(평문 파서 타임스탬프, RFC 3164 연도 추정,
//! EPS 카운터)는 전역 시계 대신 [`Clock`]을 주입받습니다.
//! 테스트에서는 [`ManualClock`]으로 시간을 고정하거나 앞으로 이동시킵니다.

use std::fmt;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// 현재 UTC 시각을 제공하는 trait
pub trait Clock: Send + Sync + fmt::Debug {
    /// 현재 시각
    fn now(&self) -> DateTime<Utc>;
}

/// 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 수동 시계 -- 테스트 전용으로 시간을 직접 제어합니다.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    /// 주어진 시각에서 시작하는 시계를 생성합니다.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// 시각을 지정한 값으로 설정합니다.
    pub fn set(&self, at: DateTime<Utc>) {
        *self.lock() = at;
    }

    /// 시각을 `delta`만큼 이동합니다. 음수면 과거로 이동합니다.
    pub fn advance(&self, delta: Duration) {
        let mut current = self.lock();
        *current += delta;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        // 내부 값은 단순 복사 타입이므로 poison 상태여도 그대로 사용
        self.current
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::seconds(5));
        assert_eq!(clock.now(), start + Duration::seconds(5));

        clock.advance(Duration::seconds(-10));
        assert_eq!(clock.now(), start - Duration::seconds(5));
    }

    #[test]
    fn manual_clock_set() {
        let clock = ManualClock::new(Utc::now());
        let at = Utc.with_ymd_and_hms(2003, 10, 11, 22, 14, 15).unwrap();
        clock.set(at);
        assert_eq!(clock.now(), at);
    }

    #[test]
    fn system_clock_is_monotonic_enough() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
