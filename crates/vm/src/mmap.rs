//! 文件映射的建立与撤销
//!
//! 一次 [`do_mmap`] 建立的连续页构成一个映射组，组内所有页共享同一个重新打开的文件句柄。
//! 页在建立时只登记为未初始化页，真正的文件读取推迟到首次缺页。
//! [`do_munmap`] 按句柄身份找出整个映射组，逐页销毁后关闭句柄。

use alloc::sync::Arc;

use crate::address::Vaddr;
use crate::config::page_size;
use crate::error::{VmError, VmResult};
use crate::file::{MmFile, same_handle};
use crate::page::{BackingCtx, FileLoad, LoadDescriptor, VmType};
use crate::spt::SupplementalPageTable;

/// 将 `file` 从 `offset` 开始的内容映射到 `addr`
///
/// 映射长度被截断到文件末尾，最后一页超出文件的部分在加载时补零。
///
/// # 参数：
/// * `addr` - 起始地址，必须非零且页对齐
/// * `length` - 请求的映射长度，必须非零
/// * `writable` - 用户态是否可写
/// * `file` - 被映射的文件，映射使用其重新打开的独立句柄
/// * `offset` - 文件偏移，必须页对齐且小于文件长度
///
/// # 返回值：
/// 成功时返回 `addr`。任一页登记失败时，已登记的页全部撤销，句柄被关闭。
pub fn do_mmap(
    spt: &mut SupplementalPageTable,
    ctx: &BackingCtx<'_>,
    addr: Vaddr,
    length: usize,
    writable: bool,
    file: &Arc<dyn MmFile>,
    offset: usize,
) -> VmResult<Vaddr> {
    let page_size = page_size();
    if addr.as_usize() == 0 || !addr.is_page_aligned() || length == 0 || offset % page_size != 0 {
        return Err(VmError::InvalidArgument);
    }
    let file_len = file.length();
    if offset >= file_len {
        return Err(VmError::InvalidArgument);
    }

    let map_len = length.min(file_len - offset);
    let pages = map_len.div_ceil(page_size);
    // 映射不能越过地址空间末尾
    addr.checked_add_pages(pages).ok_or(VmError::InvalidArgument)?;

    let handle = file.reopen().map_err(VmError::FileIo)?;

    let mut remaining = map_len;
    for i in 0..pages {
        let read_bytes = remaining.min(page_size);
        let registered = addr
            .checked_add_pages(i)
            .ok_or(VmError::InvalidArgument)
            .and_then(|va| {
                let load = FileLoad::new(handle.clone(), offset + i * page_size, read_bytes)?;
                spt.alloc_page_with_initializer(
                    VmType::File,
                    va,
                    writable,
                    LoadDescriptor::File(load),
                )
            });

        if let Err(e) = registered {
            log::warn!("mmap: page {} of {} at {} failed: {}", i, pages, addr, e);
            for j in 0..i {
                if let Some(va) = addr.checked_add_pages(j) {
                    spt.remove(va, ctx);
                }
            }
            handle.close();
            return Err(e);
        }
        remaining -= read_bytes;
    }

    log::debug!(
        "mmap: {} pages at {} (offset {}, {} bytes)",
        pages,
        addr,
        offset,
        map_len
    );
    Ok(addr)
}

/// 撤销从 `addr` 开始的映射组
///
/// `addr` 处没有页或不是文件映射页时什么也不做。
/// 组内脏页在销毁时写回文件，最后关闭映射组的句柄。
pub fn do_munmap(spt: &mut SupplementalPageTable, ctx: &BackingCtx<'_>, addr: Vaddr) {
    let handle = match spt.find(addr) {
        Some(page) if page.va() == addr => match page.mapped_file() {
            Some(file) => file.clone(),
            None => return,
        },
        _ => return,
    };

    let mut va = addr;
    let mut unmapped = 0usize;
    loop {
        let in_group = spt
            .find(va)
            .and_then(|page| page.mapped_file())
            .is_some_and(|file| same_handle(file, &handle));
        if !in_group {
            break;
        }
        spt.remove(va, ctx);
        unmapped += 1;
        match va.checked_add_pages(1) {
            Some(next) => va = next,
            None => break,
        }
    }

    handle.close();
    log::debug!("munmap: {} pages at {}", unmapped, addr);
}
