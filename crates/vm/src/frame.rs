//! 物理帧
//!
//! 帧的分配和驱逐由帧表负责，这里只描述一个已驻留的物理页：
//! 它在内核地址空间中的地址，以及当前占用它的虚拟页。

use alloc::sync::Arc;
use sync::SpinLock;

use crate::address::Vaddr;
use crate::config::page_size;

/// 驻留在内存中的物理帧
#[derive(Debug)]
pub struct Frame {
    /// 帧在内核地址空间中的地址
    kva: usize,
    /// 占用此帧的虚拟页
    owner: SpinLock<Option<Vaddr>>,
}

/// 帧的共享引用
pub type FrameRef = Arc<Frame>;

impl Frame {
    /// 描述位于 `kva` 的物理帧
    ///
    /// # Safety
    /// `kva` 必须指向一整页可读写的内存，并且在返回的 `Frame` 存活期间保持有效。
    pub unsafe fn new(kva: usize) -> FrameRef {
        Arc::new(Frame {
            kva,
            owner: SpinLock::new(None),
        })
    }

    /// 帧的内核虚拟地址
    pub fn kva(&self) -> usize {
        self.kva
    }

    /// 当前占用此帧的虚拟页
    pub fn owner(&self) -> Option<Vaddr> {
        *self.owner.lock()
    }

    /// 记录占用此帧的虚拟页
    pub(crate) fn attach(&self, va: Vaddr) {
        *self.owner.lock() = Some(va);
    }

    /// 清除占用记录
    pub(crate) fn detach(&self) {
        *self.owner.lock() = None;
    }

    /// 以字节切片访问帧内容
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: Frame::new 的调用者保证 kva 指向一整页有效内存
        unsafe { core::slice::from_raw_parts(self.kva as *const u8, page_size()) }
    }
}

/// 以可变字节切片访问位于 `kva` 的一整页
///
/// # Safety
/// `kva` 必须指向一整页可写内存，且调用期间没有其他对该页的引用。
pub(crate) unsafe fn frame_bytes_mut<'a>(kva: usize) -> &'a mut [u8] {
    unsafe { core::slice::from_raw_parts_mut(kva as *mut u8, page_size()) }
}

/// 以只读字节切片访问位于 `kva` 的一整页
///
/// # Safety
/// `kva` 必须指向一整页有效内存，且调用期间没有对该页的可变引用。
pub(crate) unsafe fn frame_bytes<'a>(kva: usize) -> &'a [u8] {
    unsafe { core::slice::from_raw_parts(kva as *const u8, page_size()) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{TestFrame, init_test_env};

    #[test]
    fn test_frame_owner_tracking() {
        init_test_env();
        let tf = TestFrame::new();
        let frame = tf.frame();
        assert_eq!(frame.owner(), None);

        frame.attach(Vaddr::from_usize(0x10000));
        assert_eq!(frame.owner(), Some(Vaddr::from_usize(0x10000)));
        frame.detach();
        assert_eq!(frame.owner(), None);
    }

    #[test]
    fn test_frame_contents_visible() {
        init_test_env();
        let tf = TestFrame::new();
        tf.fill(0x5a);
        let frame = tf.frame();
        assert_eq!(frame.as_slice().len(), 4096);
        assert!(frame.as_slice().iter().all(|&b| b == 0x5a));
    }
}
