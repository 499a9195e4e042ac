//! 页面后备存储子系统
//!
//! 为不驻留在物理帧中的用户虚拟页提供存放位置，并在驱逐、重新载入和销毁时
//! 同步页内容与后备存储：
//!
//! - **交换区**（[`SwapArea`]）：匿名页被驱逐时写入交换盘上的槽，换入后归还；
//! - **文件映射**（[`do_mmap`] / [`do_munmap`]）：以文件为后备的页，脏页写回文件。
//!
//! 两者实现同一个 [`BackingStore`] 契约，由 [`Page`] 按后备类型分发。
//!
//! # 架构解耦
//!
//! 通过 trait 抽象与内核其他部分解耦：
//! - [`Disk`]: 交换盘，按 (通道, 设备号) 通过 [`register_disk`] 登记
//! - [`MmFile`]: 被映射的文件句柄
//! - [`HwPageTable`]: 进程的硬件页表
//! - [`VmConfig`]: 页大小和交换盘位置
//!
//! 使用前必须调用 [`register_config`] 注册配置，并为 `sync` 注册架构操作。

#![no_std]

extern crate alloc;

mod config;
mod error;
mod file;
mod frame;
mod mmap;
mod spt;
mod swap;

pub mod address;
pub mod disk;
pub mod page;
pub mod page_table;

#[cfg(test)]
mod test_util;

pub use address::{Vaddr, page_round_up};
pub use config::{VmConfig, page_size, register_config, vm_config};
pub use disk::{Disk, RamDisk, SECTOR_SIZE, get_disk, register_disk, unregister_disk};
pub use error::{VmError, VmResult};
pub use file::{MmFile, same_handle};
pub use frame::{Frame, FrameRef};
pub use mmap::{do_mmap, do_munmap};
pub use page::{
    AnonPage, Backing, BackingCtx, BackingStore, FileLoad, FilePage, LoadDescriptor, Page,
    UninitPage, VmType,
};
pub use page_table::{HwPageTable, PteFlags};
pub use spt::SupplementalPageTable;
pub use swap::{SwapArea, SwapSlot};
