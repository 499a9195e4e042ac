//! 票据锁（Ticket Lock）
//!
//! 基于 `lock_api` 的 FIFO 互斥锁。与 [`crate::SpinLock`] 不同，它不关闭本地中断，
//! 适用于在可抢占的内核线程上下文中保护短小的共享状态（例如交换槽位图）。
//!
//! 获取锁的线程按领取票号的顺序进入临界区，避免饥饿。

use core::hint;
use core::sync::atomic::{AtomicUsize, Ordering};

/// 票据锁的原始实现
///
/// `next` 为下一个待发放的票号，`serving` 为当前允许进入临界区的票号。
#[derive(Debug)]
pub struct RawTicketLock {
    next: AtomicUsize,
    serving: AtomicUsize,
}

impl RawTicketLock {
    /// 创建一个未上锁的票据锁
    pub const fn new() -> Self {
        RawTicketLock {
            next: AtomicUsize::new(0),
            serving: AtomicUsize::new(0),
        }
    }
}

impl Default for RawTicketLock {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: 票号的发放和推进都通过原子操作完成，
// 同一时刻只有持有 `serving` 号票的线程能返回 lock()。
unsafe impl lock_api::RawMutex for RawTicketLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawTicketLock::new();

    type GuardMarker = lock_api::GuardSend;

    fn lock(&self) {
        let ticket = self.next.fetch_add(1, Ordering::Relaxed);
        while self.serving.load(Ordering::Acquire) != ticket {
            hint::spin_loop();
        }
    }

    fn try_lock(&self) -> bool {
        let serving = self.serving.load(Ordering::Relaxed);
        self.next
            .compare_exchange(serving, serving + 1, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.serving.fetch_add(1, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.next.load(Ordering::Relaxed) != self.serving.load(Ordering::Relaxed)
    }
}

/// 基于票据锁的互斥量
///
/// # 示例
/// ```ignore
/// let m = TicketMutex::new(0usize);
/// *m.lock() += 1;
/// ```
pub type TicketMutex<T> = lock_api::Mutex<RawTicketLock, T>;

/// [`TicketMutex`] 的 RAII 保护器
pub type TicketMutexGuard<'a, T> = lock_api::MutexGuard<'a, RawTicketLock, T>;

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::vec::Vec;

    #[test]
    fn test_ticket_mutex_basic() {
        let m = TicketMutex::new(5usize);
        {
            let mut g = m.lock();
            *g += 1;
            assert!(m.is_locked());
            assert!(m.try_lock().is_none());
        }
        assert!(!m.is_locked());
        assert_eq!(*m.lock(), 6);
    }

    #[test]
    fn test_ticket_mutex_try_lock_when_free() {
        let m = TicketMutex::new(());
        let g = m.try_lock();
        assert!(g.is_some());
        drop(g);
        assert!(m.try_lock().is_some());
    }

    #[test]
    fn test_ticket_mutex_contended_counter() {
        let m = Arc::new(TicketMutex::new(0usize));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let m = m.clone();
                thread::spawn(move || {
                    for _ in 0..1000 {
                        *m.lock() += 1;
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*m.lock(), 4000);
    }
}
