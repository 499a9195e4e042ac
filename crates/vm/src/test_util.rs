//! 单元测试公共设施

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};
use sync::ArchOps;

use crate::frame::{Frame, FrameRef};

struct DummyArchOps;

impl ArchOps for DummyArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        0
    }

    unsafe fn restore_interrupts(&self, _flags: usize) {}

    fn sstatus_sie(&self) -> usize {
        0
    }

    fn cpu_id(&self) -> usize {
        0
    }

    fn max_cpu_count(&self) -> usize {
        1
    }
}

static DUMMY_ARCH_OPS: DummyArchOps = DummyArchOps;
// 0 = uninit, 1 = initializing, 2 = ready
static SYNC_INIT: AtomicUsize = AtomicUsize::new(0);

/// 为 `sync` 注册一个空的 ArchOps，`SpinLock` 在测试中才能使用
pub(crate) fn init_test_env() {
    match SYNC_INIT.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            // Safety: tests use a single global dummy ArchOps.
            unsafe { sync::register_arch_ops(&DUMMY_ARCH_OPS) };
            SYNC_INIT.store(2, Ordering::Release);
        }
        Err(_) => {
            while SYNC_INIT.load(Ordering::Acquire) != 2 {
                core::hint::spin_loop();
            }
        }
    }
}

/// 堆上的一页内存，充当物理帧
///
/// 必须比由它创建的 [`FrameRef`] 活得更久。
pub(crate) struct TestFrame {
    mem: *mut [u8],
}

impl TestFrame {
    pub(crate) fn new() -> Self {
        let mem = Box::into_raw(vec![0u8; 4096].into_boxed_slice());
        TestFrame { mem }
    }

    pub(crate) fn kva(&self) -> usize {
        self.mem as *mut u8 as usize
    }

    pub(crate) fn frame(&self) -> FrameRef {
        // SAFETY: mem 指向一整页，且在 TestFrame 存活期间有效
        unsafe { Frame::new(self.kva()) }
    }

    pub(crate) fn fill(&self, byte: u8) {
        // SAFETY: 测试是单线程访问该页
        unsafe { (*self.mem).fill(byte) }
    }

    pub(crate) fn write(&self, offset: usize, bytes: &[u8]) {
        // SAFETY: 同上
        unsafe { (&mut (*self.mem))[offset..offset + bytes.len()].copy_from_slice(bytes) }
    }

    pub(crate) fn contents(&self) -> Vec<u8> {
        // SAFETY: 同上
        unsafe { (*self.mem).to_vec() }
    }
}

impl Drop for TestFrame {
    fn drop(&mut self) {
        // SAFETY: mem 来自 Box::into_raw
        drop(unsafe { Box::from_raw(self.mem) });
    }
}
