//! VM 配置 trait 定义和注册

use core::sync::atomic::{AtomicUsize, Ordering};

/// 后备存储子系统所需的配置常量
///
/// 内核实现此 trait 并在启动时注册。
pub trait VmConfig: Send + Sync {
    /// 页大小（通常为 4096），必须是 [`crate::SECTOR_SIZE`] 的整数倍
    fn page_size(&self) -> usize;

    /// 交换盘所在的磁盘通道
    fn swap_channel(&self) -> u8;

    /// 交换盘在通道上的设备号
    fn swap_device(&self) -> u8;
}

static CONFIG_DATA: AtomicUsize = AtomicUsize::new(0);
static CONFIG_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册配置实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_config(config: &'static dyn VmConfig) {
    let ptr = config as *const dyn VmConfig;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn VmConfig, (usize, usize)>(ptr) };
    CONFIG_DATA.store(data, Ordering::Release);
    CONFIG_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的配置实现
///
/// # Panics
/// 如果尚未调用 [`register_config`] 注册实现，则 panic
#[inline]
pub fn vm_config() -> &'static dyn VmConfig {
    let data = CONFIG_DATA.load(Ordering::Acquire);
    let vtable = CONFIG_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::mm::MOCK_VM_CONFIG;
        }
        #[cfg(not(test))]
        panic!("vm: VmConfig not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn VmConfig>((data, vtable)) }
}

/// 当前配置下的页大小
#[inline]
pub fn page_size() -> usize {
    vm_config().page_size()
}
