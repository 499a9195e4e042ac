//! VM 配置的 Mock 实现
//!
//! `vm` crate 在 `cfg(test)` 下为 [`MockVmConfig`] 实现 `VmConfig`，
//! 并在未注册配置时回退到 [`MOCK_VM_CONFIG`]。

/// Mock 的 VM 配置：4 KiB 页，交换盘位于通道 1、设备 1
pub struct MockVmConfig;

impl MockVmConfig {
    pub const fn new() -> Self {
        Self
    }

    pub fn page_size(&self) -> usize {
        4096
    }

    pub fn swap_channel(&self) -> u8 {
        1
    }

    pub fn swap_device(&self) -> u8 {
        1
    }
}

/// 全局 Mock 实例
pub static MOCK_VM_CONFIG: MockVmConfig = MockVmConfig::new();
