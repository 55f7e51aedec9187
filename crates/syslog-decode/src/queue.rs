//! 작업 큐 -- 다중 생산자/다중 소비자 FIFO 버퍼
//!
//! [`WorkQueue`]는 블로킹 대기를 제공하지 않습니다. 소비자는 [`WorkQueue::len`]을
//! 폴링해 유휴/배치 판단을 하고 [`WorkQueue::dequeue_many`]로 한 번에 꺼냅니다.
//! `len`은 락 없이 읽는 근사값입니다.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// 스레드 안전 작업 큐
pub struct WorkQueue<T> {
    items: Mutex<VecDeque<T>>,
    /// 락 없이 읽는 근사 길이
    len: AtomicUsize,
}

impl<T> WorkQueue<T> {
    /// 빈 큐를 생성합니다.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            len: AtomicUsize::new(0),
        }
    }

    /// 항목을 큐 끝에 추가합니다.
    pub fn enqueue(&self, item: T) {
        let mut items = self.lock();
        items.push_back(item);
        self.len.store(items.len(), Ordering::Release);
    }

    /// 최대 `max`개를 FIFO 순서로 꺼냅니다. 부족하면 있는 만큼(0개 포함) 반환합니다.
    pub fn dequeue_many(&self, max: usize) -> Vec<T> {
        let mut items = self.lock();
        let count = max.min(items.len());
        let batch: Vec<T> = items.drain(..count).collect();
        self.len.store(items.len(), Ordering::Release);
        batch
    }

    /// 현재 항목 수 (근사값)
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        // 항목 이동 중에는 패닉하지 않으므로 poison 상태여도 내용은 온전함
        self.items.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for WorkQueue<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkQueue").field("len", &self.len()).finish()
    }
}
