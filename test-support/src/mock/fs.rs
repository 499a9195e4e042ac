//! 文件相关的 Mock 实现
//!
//! [`MockFile`] 模拟一个打开的文件句柄。多个句柄可以共享同一个 [`MockInode`]，
//! 与 VFS 中 `reopen` 得到的独立句柄语义一致。
//! `vm` crate 在 `cfg(test)` 下为 [`MockFile`] 实现 `MmFile`。

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

/// EIO
pub const EIO: isize = -5;
/// ENOMEM
pub const ENOMEM: isize = -12;

/// 内存中的文件内容，附带 I/O 计数和故障注入开关
pub struct MockInode {
    data: Mutex<Vec<u8>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_io: AtomicBool,
}

impl MockInode {
    fn new(bytes: &[u8]) -> Self {
        Self {
            data: Mutex::new(bytes.to_vec()),
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
            fail_io: AtomicBool::new(false),
        }
    }
}

/// 打开的文件句柄
pub struct MockFile {
    inode: Arc<MockInode>,
    close_calls: AtomicUsize,
    fail_reopen: AtomicBool,
}

impl MockFile {
    /// 以给定内容创建一个新文件并返回其句柄
    pub fn new(bytes: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            inode: Arc::new(MockInode::new(bytes)),
            close_calls: AtomicUsize::new(0),
            fail_reopen: AtomicBool::new(false),
        })
    }

    /// 打开同一个 inode 的新句柄
    pub fn reopen(&self) -> Result<Arc<Self>, isize> {
        if self.fail_reopen.load(Ordering::SeqCst) {
            return Err(ENOMEM);
        }
        Ok(Arc::new(Self {
            inode: self.inode.clone(),
            close_calls: AtomicUsize::new(0),
            fail_reopen: AtomicBool::new(false),
        }))
    }

    pub fn length(&self) -> usize {
        self.inode.data.lock().unwrap().len()
    }

    /// 从 `offset` 读取，越过文件末尾的部分不读（短读）
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize> {
        if self.inode.fail_io.load(Ordering::SeqCst) {
            return Err(EIO);
        }
        self.inode.reads.fetch_add(1, Ordering::SeqCst);
        let data = self.inode.data.lock().unwrap();
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    /// 写入 `offset`，不扩展文件长度
    pub fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize> {
        if self.inode.fail_io.load(Ordering::SeqCst) {
            return Err(EIO);
        }
        self.inode.writes.fetch_add(1, Ordering::SeqCst);
        let mut data = self.inode.data.lock().unwrap();
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        data[offset..offset + n].copy_from_slice(&buf[..n]);
        Ok(n)
    }

    pub fn close(&self) {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
    }

    /// 此句柄被关闭的次数
    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    /// 底层 inode 被写入的次数（所有句柄合计）
    pub fn write_calls(&self) -> usize {
        self.inode.writes.load(Ordering::SeqCst)
    }

    /// 底层 inode 被读取的次数（所有句柄合计）
    pub fn read_calls(&self) -> usize {
        self.inode.reads.load(Ordering::SeqCst)
    }

    /// 文件当前内容的拷贝
    pub fn contents(&self) -> Vec<u8> {
        self.inode.data.lock().unwrap().clone()
    }

    /// 让后续 reopen 失败
    pub fn set_fail_reopen(&self, fail: bool) {
        self.fail_reopen.store(fail, Ordering::SeqCst);
    }

    /// 让后续读写返回 EIO
    pub fn set_fail_io(&self, fail: bool) {
        self.inode.fail_io.store(fail, Ordering::SeqCst);
    }
}
