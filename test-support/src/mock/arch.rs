//! 架构相关操作的 Mock 实现
//!
//! `sync` crate 在 `cfg(test)` 下为 [`MockArchOps`] 实现 `ArchOps`。

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Mock 架构操作
///
/// 中断开关只记录在一个原子标志中，单 CPU。
pub struct MockArchOps {
    /// 当前是否允许中断
    pub interrupt_state: AtomicBool,
    /// 当前 CPU ID
    pub cpu_id: AtomicUsize,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
            cpu_id: AtomicUsize::new(0),
        }
    }

    /// 关闭中断，返回之前的状态（1 = 开启）
    ///
    /// # Safety
    /// 仅用于测试环境。
    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.interrupt_state.swap(false, Ordering::SeqCst) as usize
    }

    /// 恢复中断状态
    ///
    /// # Safety
    /// 仅用于测试环境。
    pub unsafe fn restore_interrupts(&self, flags: usize) {
        self.interrupt_state.store(flags != 0, Ordering::SeqCst);
    }

    pub fn sstatus_sie(&self) -> usize {
        0x1
    }

    pub fn cpu_id(&self) -> usize {
        self.cpu_id.load(Ordering::Relaxed)
    }

    pub fn max_cpu_count(&self) -> usize {
        1
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
