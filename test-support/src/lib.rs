//! 测试支持 crate
//!
//! 提供各子系统单元测试所需的 Mock 协作者：
//! 架构操作、VM 配置、内存文件和软件页表。
//!
//! Mock 类型只提供固有方法，由被测 crate 在 `cfg(test)` 下为它们实现各自的 trait，
//! 以避免 test-support 反向依赖被测 crate。

#![no_std]

extern crate alloc;
extern crate std;

pub mod mock;
