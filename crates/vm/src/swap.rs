//! 交换区管理
//!
//! 交换盘被划分为若干个交换槽，每个槽由连续的 `page_size / SECTOR_SIZE` 个扇区组成，
//! 恰好容纳一页。槽的占用状态记录在位图中（0=空闲，1=已占用）。
//!
//! ## 加锁策略
//!
//! 位图由一把 [`TicketMutex`] 保护，只在"扫描并置位"和"清位"时持锁，
//! 扇区读写在锁外进行。因此一个槽被选中后、数据写完之前，
//! 其他线程不会拿到同一个槽，但可以并发地申请其他槽。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use sync::TicketMutex;

use crate::config::{page_size, vm_config};
use crate::disk::{Disk, SECTOR_SIZE, get_disk};
use crate::error::{VmError, VmResult};

/// 交换槽编号
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SwapSlot(usize);

impl SwapSlot {
    /// 从编号构造
    pub const fn from_index(index: usize) -> Self {
        SwapSlot(index)
    }

    /// 槽编号
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Debug for SwapSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SwapSlot({})", self.0)
    }
}

/// 槽位图
struct SwapTable {
    /// 每个 bit 表示一个槽
    bitmap: Vec<u64>,
    /// 总槽数
    total_slots: usize,
    /// 已占用槽数
    used_slots: usize,
    /// 上次分配所在的字下标
    last_alloc_hint: usize,
}

impl SwapTable {
    fn new(total_slots: usize) -> Self {
        SwapTable {
            bitmap: alloc::vec![0u64; total_slots.div_ceil(64)],
            total_slots,
            used_slots: 0,
            last_alloc_hint: 0,
        }
    }

    #[inline]
    fn is_used(&self, idx: usize) -> bool {
        idx < self.total_slots && self.bitmap[idx / 64] & (1u64 << (idx % 64)) != 0
    }

    /// 从 last_alloc_hint 开始循环查找第一个空闲位并置位
    fn alloc(&mut self) -> Option<usize> {
        let words = self.bitmap.len();
        for offset in 0..words {
            let word_idx = (self.last_alloc_hint + offset) % words;
            let word = self.bitmap[word_idx];
            if word == u64::MAX {
                continue;
            }

            let idx = word_idx * 64 + (!word).trailing_zeros() as usize;
            // 最后一个字的高位没有对应的槽
            if idx >= self.total_slots {
                continue;
            }

            self.bitmap[word_idx] |= 1u64 << (idx % 64);
            self.used_slots += 1;
            self.last_alloc_hint = word_idx;
            return Some(idx);
        }
        None
    }

    /// 清位，返回该槽之前是否被占用
    fn release(&mut self, idx: usize) -> bool {
        if !self.is_used(idx) {
            return false;
        }
        self.bitmap[idx / 64] &= !(1u64 << (idx % 64));
        self.used_slots -= 1;
        true
    }
}

/// 交换区
///
/// 没有交换盘时交换区处于禁用状态：容量为 0，所有换出都会失败。
pub struct SwapArea {
    disk: Option<Arc<dyn Disk>>,
    table: TicketMutex<SwapTable>,
    sectors_per_page: usize,
}

impl SwapArea {
    /// 在给定磁盘上建立交换区，所有槽初始为空闲
    pub fn new(disk: Option<Arc<dyn Disk>>) -> Self {
        let sectors_per_page = page_size() / SECTOR_SIZE;
        let total_slots = match (&disk, sectors_per_page) {
            (Some(disk), spp) if spp > 0 => disk.sector_count() / spp,
            _ => 0,
        };
        SwapArea {
            disk,
            table: TicketMutex::new(SwapTable::new(total_slots)),
            sectors_per_page,
        }
    }

    /// 按配置的 (通道, 设备号) 探测交换盘并建立交换区
    pub fn probe() -> Self {
        let config = vm_config();
        let (channel, device) = (config.swap_channel(), config.swap_device());
        let disk = get_disk(channel, device);
        if disk.is_none() {
            log::warn!(
                "swap: no disk at {}:{}, swapping disabled",
                channel,
                device
            );
        }
        let area = Self::new(disk);
        if area.is_enabled() {
            log::info!(
                "swap: disk {}:{} with {} slots",
                channel,
                device,
                area.capacity()
            );
        }
        area
    }

    /// 是否有可用的交换盘
    pub fn is_enabled(&self) -> bool {
        self.disk.is_some()
    }

    /// 总槽数
    pub fn capacity(&self) -> usize {
        self.table.lock().total_slots
    }

    /// 已占用的槽数
    pub fn used_slots(&self) -> usize {
        self.table.lock().used_slots
    }

    /// 空闲的槽数
    pub fn free_slots(&self) -> usize {
        let table = self.table.lock();
        table.total_slots - table.used_slots
    }

    /// 查找一个空闲槽并标记为占用
    pub fn alloc_slot(&self) -> VmResult<SwapSlot> {
        if self.disk.is_none() {
            return Err(VmError::NoSwapDevice);
        }
        let idx = self.table.lock().alloc().ok_or(VmError::SwapFull)?;
        log::debug!("swap: alloc slot {}", idx);
        Ok(SwapSlot(idx))
    }

    /// 释放交换槽
    /// # 返回值：
    /// 如果该槽之前处于占用状态则返回 true，否则返回 false
    pub fn release_slot(&self, slot: SwapSlot) -> bool {
        let released = self.table.lock().release(slot.0);
        if released {
            log::debug!("swap: release slot {}", slot.0);
        }
        released
    }

    /// 槽是否处于占用状态
    pub fn is_slot_in_use(&self, slot: SwapSlot) -> bool {
        self.table.lock().is_used(slot.0)
    }

    /// 将一页数据写入交换槽的各个扇区
    pub fn write_page(&self, slot: SwapSlot, page: &[u8]) -> VmResult<()> {
        let disk = self.disk.as_ref().ok_or(VmError::NoSwapDevice)?;
        self.check_page_len(page.len())?;

        let base = slot.0 * self.sectors_per_page;
        for (i, sector) in page.chunks_exact(SECTOR_SIZE).enumerate() {
            if !disk.write_sector(base + i, sector) {
                log::error!("swap: write sector {} of slot {} failed", base + i, slot.0);
                return Err(VmError::DiskIo);
            }
        }
        Ok(())
    }

    /// 从交换槽的各个扇区读出一页数据
    pub fn read_page(&self, slot: SwapSlot, page: &mut [u8]) -> VmResult<()> {
        let disk = self.disk.as_ref().ok_or(VmError::NoSwapDevice)?;
        self.check_page_len(page.len())?;

        let base = slot.0 * self.sectors_per_page;
        for (i, sector) in page.chunks_exact_mut(SECTOR_SIZE).enumerate() {
            if !disk.read_sector(base + i, sector) {
                log::error!("swap: read sector {} of slot {} failed", base + i, slot.0);
                return Err(VmError::DiskIo);
            }
        }
        Ok(())
    }

    /// 把一页内容换出到新分配的槽中
    ///
    /// 写盘失败时释放刚分配的槽，调用者的数据不受影响。
    pub fn store(&self, page: &[u8]) -> VmResult<SwapSlot> {
        let slot = self.alloc_slot()?;
        if let Err(e) = self.write_page(slot, page) {
            self.release_slot(slot);
            return Err(e);
        }
        Ok(slot)
    }

    /// 把槽中内容换入 `page` 并释放该槽
    ///
    /// 槽在位图中已是空闲状态时直接失败，不读取磁盘。
    /// 读盘失败时槽保持占用，可以重试。
    pub fn load(&self, slot: SwapSlot, page: &mut [u8]) -> VmResult<()> {
        if !self.is_slot_in_use(slot) {
            log::warn!("swap: slot {} is not in use", slot.0);
            return Err(VmError::SlotNotInUse);
        }
        self.read_page(slot, page)?;
        self.release_slot(slot);
        Ok(())
    }

    fn check_page_len(&self, len: usize) -> VmResult<()> {
        if len != self.sectors_per_page * SECTOR_SIZE || len == 0 {
            return Err(VmError::InvalidArgument);
        }
        Ok(())
    }
}
