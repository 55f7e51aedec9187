//! 브로드캐스트 -- copy-on-write 구독자 목록
//!
//! 구독/해지는 내부 쓰기 락으로 직렬화되며, 매번 목록을 복사한 새 스냅샷을
//! [`ArcSwap`]으로 교체합니다. 브로드캐스트는 락 없이 현재 스냅샷을 한 번 읽어
//! 끝까지 순회하므로, 진행 중인 브로드캐스트의 구독자 집합은 동시 구독/해지에
//! 영향을 받지 않습니다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use arc_swap::ArcSwap;

use crate::error::SyslogPipelineError;

/// 스트림 구독자
pub trait Subscriber<T>: Send + Sync {
    /// 새 항목을 받습니다.
    fn on_next(&self, item: &T);

    /// 상류 단계의 오류를 받습니다.
    fn on_error(&self, _error: &SyslogPipelineError) {}

    /// 스트림 종료 통지
    fn on_completed(&self) {}
}

struct Entry<T> {
    id: u64,
    subscriber: Arc<dyn Subscriber<T>>,
}

impl<T> Clone for Entry<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            subscriber: Arc::clone(&self.subscriber),
        }
    }
}

struct Registry<T> {
    snapshot: ArcSwap<Vec<Entry<T>>>,
    write_lock: Mutex<()>,
    next_id: AtomicU64,
}

impl<T> Registry<T> {
    fn update(&self, change: impl FnOnce(&mut Vec<Entry<T>>)) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = Vec::clone(&self.snapshot.load());
        change(&mut next);
        self.snapshot.store(Arc::new(next));
    }
}

trait Unsubscribe: Send + Sync {
    fn remove(&self, id: u64);
}

impl<T> Unsubscribe for Registry<T> {
    fn remove(&self, id: u64) {
        self.update(|entries| entries.retain(|e| e.id != id));
    }
}

/// 해지 가능한 구독 핸들
///
/// 핸들을 버려도 구독은 유지됩니다. 해지하려면 [`Subscription::unsubscribe`]를 호출합니다.
/// 브로드캐스터가 이미 사라졌다면 해지는 아무 일도 하지 않습니다.
pub struct Subscription {
    registry: Weak<dyn Unsubscribe>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// 구독자 팬아웃
///
/// 복제본은 같은 구독자 목록을 공유합니다.
pub struct Broadcaster<T> {
    registry: Arc<Registry<T>>,
}

impl<T: 'static> Broadcaster<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Registry {
                snapshot: ArcSwap::from_pointee(Vec::new()),
                write_lock: Mutex::new(()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// 구독자를 추가하고 해지 핸들을 반환합니다.
    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .update(|entries| entries.push(Entry { id, subscriber }));

        let registry: Arc<dyn Unsubscribe> = self.registry.clone();
        Subscription {
            registry: Arc::downgrade(&registry),
            id,
        }
    }

    /// 현재 스냅샷의 모든 구독자에게 항목을 전달합니다.
    pub fn broadcast(&self, item: &T) {
        let snapshot = self.registry.snapshot.load_full();
        for entry in snapshot.iter() {
            entry.subscriber.on_next(item);
        }
    }

    /// 현재 스냅샷의 모든 구독자에게 오류를 전달합니다.
    pub fn broadcast_error(&self, error: &SyslogPipelineError) {
        let snapshot = self.registry.snapshot.load_full();
        for entry in snapshot.iter() {
            entry.subscriber.on_error(error);
        }
    }

    /// 현재 스냅샷의 모든 구독자에게 종료를 통지합니다.
    pub fn complete(&self) {
        let snapshot = self.registry.snapshot.load_full();
        for entry in snapshot.iter() {
            entry.subscriber.on_completed();
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.snapshot.load().len()
    }
}

impl<T: 'static> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> std::fmt::Debug for Broadcaster<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscribers", &self.registry.snapshot.load().len())
            .finish()
    }
}
