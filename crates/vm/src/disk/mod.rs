//! 磁盘设备接口
//!
//! 交换区只需要按扇区读写的最小接口。磁盘驱动在启动时通过 [`register_disk`]
//! 以 (通道, 设备号) 登记，交换区初始化时用 [`get_disk`] 探测交换盘。

mod ram_disk;

use alloc::sync::Arc;
use alloc::vec::Vec;
use lazy_static::lazy_static;
use sync::SpinLock;

pub use ram_disk::RamDisk;

/// 扇区大小（字节）
pub const SECTOR_SIZE: usize = 512;

/// 按扇区寻址的磁盘设备
pub trait Disk: Send + Sync {
    /// 读取一个扇区
    /// # 参数：
    /// * `sector` - 扇区号
    /// * `buf` - 长度为 [`SECTOR_SIZE`] 的缓冲区
    /// # 返回值：
    /// 如果读取成功则返回 true，否则返回 false
    fn read_sector(&self, sector: usize, buf: &mut [u8]) -> bool;

    /// 写入一个扇区
    /// # 返回值：
    /// 如果写入成功则返回 true，否则返回 false
    fn write_sector(&self, sector: usize, buf: &[u8]) -> bool;

    /// 设备的总扇区数
    fn sector_count(&self) -> usize;
}

struct DiskEntry {
    channel: u8,
    device: u8,
    disk: Arc<dyn Disk>,
}

lazy_static! {
    /// 全局磁盘列表
    static ref DISKS: SpinLock<Vec<DiskEntry>> = SpinLock::new(Vec::new());
}

/// 登记磁盘，同一 (通道, 设备号) 上已有的磁盘会被替换
pub fn register_disk(channel: u8, device: u8, disk: Arc<dyn Disk>) {
    let mut disks = DISKS.lock();
    disks.retain(|e| !(e.channel == channel && e.device == device));
    disks.push(DiskEntry {
        channel,
        device,
        disk,
    });
}

/// 移除登记的磁盘，返回被移除的设备
pub fn unregister_disk(channel: u8, device: u8) -> Option<Arc<dyn Disk>> {
    let mut disks = DISKS.lock();
    let idx = disks
        .iter()
        .position(|e| e.channel == channel && e.device == device)?;
    Some(disks.swap_remove(idx).disk)
}

/// 按 (通道, 设备号) 查找磁盘
pub fn get_disk(channel: u8, device: u8) -> Option<Arc<dyn Disk>> {
    DISKS
        .lock()
        .iter()
        .find(|e| e.channel == channel && e.device == device)
        .map(|e| e.disk.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::init_test_env;

    #[test]
    fn test_disk_registry_lookup_and_replace() {
        init_test_env();
        register_disk(3, 0, RamDisk::new(8));
        assert_eq!(get_disk(3, 0).map(|d| d.sector_count()), Some(8));
        assert!(get_disk(3, 1).is_none());

        register_disk(3, 0, RamDisk::new(16));
        assert_eq!(get_disk(3, 0).map(|d| d.sector_count()), Some(16));

        assert!(unregister_disk(3, 0).is_some());
        assert!(get_disk(3, 0).is_none());
        assert!(unregister_disk(3, 0).is_none());
    }
}
