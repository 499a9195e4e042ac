//! 文件映射页
//!
//! 文件页的内容以文件为后备。被驱逐或销毁时，只有硬件脏位置位的页才写回文件，
//! 且只写回页头的有效字节；再次换入时从文件重新读取。

use alloc::sync::Arc;

use super::{BackingCtx, BackingStore, VmType};
use crate::address::Vaddr;
use crate::error::{VmError, VmResult};
use crate::file::MmFile;
use crate::frame::{FrameRef, frame_bytes, frame_bytes_mut};

/// EIO，部分写入时使用
const EIO: isize = -5;

/// 文件页的后备状态
pub struct FilePage {
    /// 映射组共享的文件句柄
    file: Arc<dyn MmFile>,
    /// 本页对应的文件偏移
    offset: usize,
    /// 页头有效字节数，其余部分为零
    read_bytes: usize,
}

impl FilePage {
    pub(crate) fn new(file: Arc<dyn MmFile>, offset: usize, read_bytes: usize) -> Self {
        FilePage {
            file,
            offset,
            read_bytes,
        }
    }

    /// 映射组共享的文件句柄
    pub fn file(&self) -> &Arc<dyn MmFile> {
        &self.file
    }

    /// 本页对应的文件偏移
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 页头有效字节数
    pub fn read_bytes(&self) -> usize {
        self.read_bytes
    }

    /// 若 `va` 的翻译存在且脏位置位，将帧内容写回文件并清除脏位
    fn write_back_if_dirty(&self, ctx: &BackingCtx<'_>, va: Vaddr) -> VmResult<()> {
        let Some((kva, _)) = ctx.page_table.walk(va) else {
            return Ok(());
        };
        if !ctx.page_table.is_dirty(va) {
            return Ok(());
        }

        // SAFETY: kva 来自本页的硬件翻译，指向本页驻留的帧
        let page = unsafe { frame_bytes(kva) };
        let written = self
            .file
            .write_at(self.offset, &page[..self.read_bytes])
            .map_err(VmError::FileIo)?;
        if written != self.read_bytes {
            log::error!(
                "Partial write at offset {}: expected {}, got {}",
                self.offset,
                self.read_bytes,
                written
            );
            return Err(VmError::FileIo(EIO));
        }

        ctx.page_table.clear_dirty(va);
        Ok(())
    }
}

/// 从文件读取 `read_bytes` 字节到页头，其余部分补零
///
/// 文件在映射后被截短时会出现短读，缺少的部分同样补零。
pub(crate) fn load_file_bytes(
    file: &dyn MmFile,
    offset: usize,
    read_bytes: usize,
    page: &mut [u8],
) -> VmResult<()> {
    let actual = file
        .read_at(offset, &mut page[..read_bytes])
        .map_err(VmError::FileIo)?;
    if actual != read_bytes {
        log::warn!(
            "Short read at offset {}: expected {}, got {}",
            offset,
            read_bytes,
            actual
        );
    }
    page[actual..].fill(0);
    Ok(())
}

impl BackingStore for FilePage {
    const TYPE: VmType = VmType::File;

    fn swap_in(&mut self, _ctx: &BackingCtx<'_>, kva: usize) -> VmResult<()> {
        // SAFETY: kva 是分配给本页的帧，换入期间只有本页访问它
        let page = unsafe { frame_bytes_mut(kva) };
        load_file_bytes(self.file.as_ref(), self.offset, self.read_bytes, page)
    }

    fn swap_out(&mut self, ctx: &BackingCtx<'_>, va: Vaddr, _frame: &FrameRef) -> VmResult<()> {
        self.write_back_if_dirty(ctx, va)
    }

    fn destroy(&mut self, ctx: &BackingCtx<'_>, va: Vaddr, frame: &mut Option<FrameRef>) {
        if ctx.page_table.is_mapped(va) {
            if let Err(e) = self.write_back_if_dirty(ctx, va) {
                log::error!("file: write back of {} failed: {}", va, e);
            }
            let _ = ctx.page_table.unmap(va);
        }
        if let Some(frame) = frame.take() {
            frame.detach();
        }
    }
}
