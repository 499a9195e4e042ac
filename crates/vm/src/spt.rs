//! 补充页表
//!
//! 记录进程每个用户虚拟页的后备信息，以页对齐的虚拟地址为键。
//! 从表中移除页会触发该页的 `destroy`。

use alloc::collections::BTreeMap;

use crate::address::Vaddr;
use crate::error::{VmError, VmResult};
use crate::frame::FrameRef;
use crate::page::{BackingCtx, LoadDescriptor, Page, VmType};

/// 进程的补充页表
#[derive(Default)]
pub struct SupplementalPageTable {
    pages: BTreeMap<Vaddr, Page>,
}

impl SupplementalPageTable {
    /// 创建空表
    pub fn new() -> Self {
        Self::default()
    }

    /// 查找包含 `va` 的页
    pub fn find(&self, va: Vaddr) -> Option<&Page> {
        self.pages.get(&va.align_down_to_page())
    }

    /// 查找包含 `va` 的页（可变）
    pub fn find_mut(&mut self, va: Vaddr) -> Option<&mut Page> {
        self.pages.get_mut(&va.align_down_to_page())
    }

    /// 插入一个页，页地址已被占用时返回 [`VmError::AlreadyMapped`]
    pub fn insert(&mut self, page: Page) -> VmResult<()> {
        let va = page.va();
        if !va.is_page_aligned() {
            return Err(VmError::InvalidArgument);
        }
        if self.pages.contains_key(&va) {
            return Err(VmError::AlreadyMapped);
        }
        self.pages.insert(va, page);
        Ok(())
    }

    /// 在 `va` 处登记一个尚未驻留的页，首次换入时按 `desc` 加载
    ///
    /// `ty` 必须与描述符的目标类型一致。
    pub fn alloc_page_with_initializer(
        &mut self,
        ty: VmType,
        va: Vaddr,
        writable: bool,
        desc: LoadDescriptor,
    ) -> VmResult<()> {
        if ty == VmType::Uninit || ty != desc.target() {
            return Err(VmError::InvalidArgument);
        }
        self.insert(Page::new_uninit(va, writable, desc))
    }

    /// 将 `va` 所在的页载入 `frame`
    pub fn claim_page(&mut self, va: Vaddr, frame: FrameRef, ctx: &BackingCtx<'_>) -> VmResult<()> {
        self.find_mut(va)
            .ok_or(VmError::NotMapped)?
            .swap_in(frame, ctx)
    }

    /// 移除 `va` 所在的页并销毁它
    /// # 返回值：
    /// 如果存在该页则返回 true，否则返回 false
    pub fn remove(&mut self, va: Vaddr, ctx: &BackingCtx<'_>) -> bool {
        match self.pages.remove(&va.align_down_to_page()) {
            Some(mut page) => {
                page.destroy(ctx);
                true
            }
            None => false,
        }
    }

    /// 销毁所有页，用于进程退出
    pub fn kill(&mut self, ctx: &BackingCtx<'_>) {
        let pages = core::mem::take(&mut self.pages);
        log::debug!("spt: destroying {} pages", pages.len());
        for (_, mut page) in pages {
            page.destroy(ctx);
        }
    }

    /// 页数
    pub fn len(&self) -> usize {
        self.pages.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// 按地址顺序遍历所有页
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }
}
