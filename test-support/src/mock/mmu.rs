//! 硬件页表的 Mock 实现
//!
//! 用一张 `va -> (kva, flags)` 的表模拟 MMU。标志位布局与 RISC-V Sv39 PTE 相同。
//! `vm` crate 在 `cfg(test)` 下为 [`MockPageTable`] 实现 `HwPageTable`。

use std::collections::BTreeMap;
use std::sync::Mutex;

/// PTE 有效位
pub const PTE_VALID: usize = 1 << 0;
/// PTE 可写位
pub const PTE_WRITEABLE: usize = 1 << 2;
/// PTE 访问位
pub const PTE_ACCESSED: usize = 1 << 6;
/// PTE 脏位
pub const PTE_DIRTY: usize = 1 << 7;

/// 软件模拟的页表
pub struct MockPageTable {
    entries: Mutex<BTreeMap<usize, (usize, usize)>>,
}

impl MockPageTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// 建立 `va -> kva` 映射，已存在时返回 false
    pub fn map(&self, va: usize, kva: usize, flags: usize) -> bool {
        let mut entries = self.entries.lock().unwrap();
        if entries.contains_key(&va) {
            return false;
        }
        entries.insert(va, (kva, flags | PTE_VALID));
        true
    }

    pub fn walk(&self, va: usize) -> Option<(usize, usize)> {
        self.entries.lock().unwrap().get(&va).copied()
    }

    pub fn update_flags(&self, va: usize, flags: usize) -> bool {
        match self.entries.lock().unwrap().get_mut(&va) {
            Some(entry) => {
                entry.1 = flags;
                true
            }
            None => false,
        }
    }

    pub fn unmap(&self, va: usize) -> bool {
        self.entries.lock().unwrap().remove(&va).is_some()
    }

    /// 模拟用户态通过 MMU 写入页内 `offset` 处：写入帧内容并置位 A/D
    ///
    /// 页未映射或不可写时返回 false（相当于触发缺页）。
    pub fn user_write(&self, va: usize, offset: usize, bytes: &[u8]) -> bool {
        let mut entries = self.entries.lock().unwrap();
        let Some(entry) = entries.get_mut(&va) else {
            return false;
        };
        if entry.1 & PTE_WRITEABLE == 0 {
            return false;
        }
        // SAFETY: 测试中 kva 指向至少一页大小、由测试持有的缓冲区
        unsafe {
            let dst = (entry.0 + offset) as *mut u8;
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), dst, bytes.len());
        }
        entry.1 |= PTE_ACCESSED | PTE_DIRTY;
        true
    }

    /// 当前映射数
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MockPageTable {
    fn default() -> Self {
        Self::new()
    }
}
