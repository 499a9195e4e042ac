//! 文件映射接口 trait 定义

use alloc::sync::Arc;

/// 可映射到内存的打开文件句柄
///
/// 此 trait 抽象了文件映射所需的最小接口，由 VFS 的文件对象实现。
/// 错误以负的 errno 表示。
pub trait MmFile: Send + Sync {
    /// 打开同一文件的独立句柄
    ///
    /// 新句柄拥有独立的生命周期，关闭原句柄不影响它。
    fn reopen(&self) -> Result<Arc<dyn MmFile>, isize>;

    /// 文件长度（字节）
    fn length(&self) -> usize;

    /// 从指定偏移读取数据到缓冲区，返回实际读取的字节数
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize>;

    /// 将缓冲区数据写入指定偏移，返回实际写入的字节数
    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize>;

    /// 关闭句柄
    fn close(&self);
}

/// 判断两个引用是否指向同一个句柄
///
/// 映射组以句柄身份而不是文件路径分组，只比较数据指针，忽略 vtable。
pub fn same_handle(a: &Arc<dyn MmFile>, b: &Arc<dyn MmFile>) -> bool {
    core::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
