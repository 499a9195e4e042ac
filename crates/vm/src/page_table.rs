//! 硬件页表接口
//!
//! 后备存储只关心单个用户页的翻译是否存在、脏位是否置位，以及移除翻译。
//! 具体的多级页表由各架构实现 [`HwPageTable`]；它总是作用于所属进程的页表，
//! 所以方法只接受 `&self`，由实现自行处理内部可变性和 TLB 刷新。

use bitflags::bitflags;

use crate::address::Vaddr;
use crate::error::VmResult;

bitflags! {
    /// 与架构无关的页表项标志（位布局与 RISC-V Sv39 相同）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: usize {
        /// 有效
        const VALID = 1 << 0;
        /// 可读
        const READABLE = 1 << 1;
        /// 可写
        const WRITEABLE = 1 << 2;
        /// 可执行
        const EXECUTABLE = 1 << 3;
        /// 用户态可访问
        const USER = 1 << 4;
        /// 全局映射
        const GLOBAL = 1 << 5;
        /// 已访问（硬件维护）
        const ACCESSED = 1 << 6;
        /// 已写入（硬件维护）
        const DIRTY = 1 << 7;
    }
}

impl PteFlags {
    /// 用户数据页的标志
    pub fn user_data(writable: bool) -> Self {
        let mut flags = PteFlags::VALID | PteFlags::READABLE | PteFlags::USER;
        if writable {
            flags |= PteFlags::WRITEABLE;
        }
        flags
    }
}

/// 进程页表
pub trait HwPageTable: Send + Sync {
    /// 建立 `va -> kva` 所在帧的映射
    fn map(&self, va: Vaddr, kva: usize, flags: PteFlags) -> VmResult<()>;

    /// 查询映射，返回帧的内核虚拟地址和当前标志
    fn walk(&self, va: Vaddr) -> Option<(usize, PteFlags)>;

    /// 覆盖映射标志
    fn update_flags(&self, va: Vaddr, flags: PteFlags) -> VmResult<()>;

    /// 移除映射
    fn unmap(&self, va: Vaddr) -> VmResult<()>;

    /// `va` 当前是否有硬件翻译
    fn is_mapped(&self, va: Vaddr) -> bool {
        self.walk(va).is_some()
    }

    /// `va` 的脏位是否置位，未映射时为 false
    fn is_dirty(&self, va: Vaddr) -> bool {
        self.walk(va)
            .is_some_and(|(_, flags)| flags.contains(PteFlags::DIRTY))
    }

    /// 清除 `va` 的脏位，未映射时什么也不做
    fn clear_dirty(&self, va: Vaddr) {
        if let Some((_, flags)) = self.walk(va) {
            let _ = self.update_flags(va, flags - PteFlags::DIRTY);
        }
    }
}
