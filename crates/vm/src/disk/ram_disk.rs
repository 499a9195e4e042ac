//! 内存模拟磁盘

use super::{Disk, SECTOR_SIZE};
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use sync::SpinLock;

/// 内存模拟的磁盘
///
/// 用于测试和没有真实交换盘的开发环境
pub struct RamDisk {
    /// 存储数据
    data: SpinLock<Vec<u8>>,
    /// 为 true 时所有读写都失败
    faulty: AtomicBool,
    /// 已完成的扇区读次数
    reads: AtomicUsize,
    /// 已完成的扇区写次数
    writes: AtomicUsize,
}

impl RamDisk {
    /// 创建指定扇区数的内存磁盘
    pub fn new(sectors: usize) -> Arc<Self> {
        Arc::new(Self {
            data: SpinLock::new(vec![0u8; sectors * SECTOR_SIZE]),
            faulty: AtomicBool::new(false),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    /// 获取原始数据（用于调试）
    pub fn raw_data(&self) -> Vec<u8> {
        self.data.lock().clone()
    }

    /// 模拟介质故障
    pub fn set_faulty(&self, faulty: bool) {
        self.faulty.store(faulty, Ordering::Relaxed);
    }

    /// 已完成的扇区读次数
    pub fn sector_reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    /// 已完成的扇区写次数
    pub fn sector_writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl Disk for RamDisk {
    fn read_sector(&self, sector: usize, buf: &mut [u8]) -> bool {
        if buf.len() != SECTOR_SIZE || self.faulty.load(Ordering::Relaxed) {
            return false;
        }

        let data = self.data.lock();
        let offset = sector * SECTOR_SIZE;

        if offset + SECTOR_SIZE > data.len() {
            return false;
        }

        buf.copy_from_slice(&data[offset..offset + SECTOR_SIZE]);
        self.reads.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn write_sector(&self, sector: usize, buf: &[u8]) -> bool {
        if buf.len() != SECTOR_SIZE || self.faulty.load(Ordering::Relaxed) {
            return false;
        }

        let mut data = self.data.lock();
        let offset = sector * SECTOR_SIZE;

        if offset + SECTOR_SIZE > data.len() {
            return false;
        }

        data[offset..offset + SECTOR_SIZE].copy_from_slice(buf);
        self.writes.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn sector_count(&self) -> usize {
        self.data.lock().len() / SECTOR_SIZE
    }
}
