//! 后备存储错误类型

use core::fmt;

/// 后备存储操作中可能发生的错误
///
/// 所有操作都返回明确的成功/失败，由调用者（缺页处理、驱逐扫描、系统调用层）
/// 决定失败是否对当前线程致命。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    /// 没有可用的交换盘，交换功能被禁用
    NoSwapDevice,
    /// 交换区已满
    SwapFull,
    /// 页没有分配交换槽
    NoSwapSlot,
    /// 交换槽在位图中已是空闲状态
    SlotNotInUse,
    /// 页当前不驻留在任何帧中
    NotResident,
    /// 该虚拟地址已注册了页或已存在硬件映射
    AlreadyMapped,
    /// 该虚拟地址没有硬件映射
    NotMapped,
    /// 提供了无效参数
    InvalidArgument,
    /// 磁盘扇区读写失败
    DiskIo,
    /// 文件读写失败，附带文件系统返回的错误码
    FileIo(isize),
}

impl VmError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            VmError::NoSwapDevice | VmError::SwapFull => -12, // ENOMEM
            VmError::NoSwapSlot
            | VmError::SlotNotInUse
            | VmError::NotResident
            | VmError::NotMapped => -14, // EFAULT
            VmError::AlreadyMapped => -17,   // EEXIST
            VmError::InvalidArgument => -22, // EINVAL
            VmError::DiskIo => -5,           // EIO
            VmError::FileIo(errno) => *errno,
        }
    }
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::NoSwapDevice => write!(f, "no swap device"),
            VmError::SwapFull => write!(f, "out of swap space"),
            VmError::NoSwapSlot => write!(f, "page holds no swap slot"),
            VmError::SlotNotInUse => write!(f, "swap slot already free"),
            VmError::NotResident => write!(f, "page not resident"),
            VmError::AlreadyMapped => write!(f, "address already mapped"),
            VmError::NotMapped => write!(f, "address not mapped"),
            VmError::InvalidArgument => write!(f, "invalid argument"),
            VmError::DiskIo => write!(f, "disk I/O error"),
            VmError::FileIo(errno) => write!(f, "file I/O error ({})", errno),
        }
    }
}

/// 后备存储操作的结果类型
pub type VmResult<T> = Result<T, VmError>;
