//! 虚拟地址抽象
//!
//! [`Vaddr`] 是用户虚拟地址的新类型包装，页对齐相关操作都以当前配置的页大小为准。
//! 帧的内核虚拟地址（kva）仍以 `usize` 表示，它只在本子系统内部用于读写帧内容。

use core::fmt;

use crate::config::page_size;

/// 虚拟地址
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Vaddr(usize);

impl Vaddr {
    /// 从 usize 构造
    pub const fn from_usize(addr: usize) -> Self {
        Vaddr(addr)
    }

    /// 转换为 usize
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// 页内偏移
    pub fn page_offset(self) -> usize {
        self.0 & (page_size() - 1)
    }

    /// 是否页对齐
    pub fn is_page_aligned(self) -> bool {
        self.page_offset() == 0
    }

    /// 向下对齐到页边界
    pub fn align_down_to_page(self) -> Self {
        Vaddr(self.0 & !(page_size() - 1))
    }

    /// 向后移动 `pages` 页，溢出地址空间时返回 None
    pub fn checked_add_pages(self, pages: usize) -> Option<Self> {
        pages
            .checked_mul(page_size())
            .and_then(|delta| self.0.checked_add(delta))
            .map(Vaddr)
    }
}

impl fmt::Debug for Vaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vaddr({:#x})", self.0)
    }
}

impl fmt::Display for Vaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// 将长度向上取整到页大小的整数倍，溢出时返回 None
pub fn page_round_up(len: usize) -> Option<usize> {
    let page_size = page_size();
    len.checked_add(page_size - 1).map(|v| v & !(page_size - 1))
}
