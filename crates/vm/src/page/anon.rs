//! 匿名页
//!
//! 匿名页没有文件后备，被驱逐时整页写入交换区，换入后立即归还交换槽。

use super::{BackingCtx, BackingStore, VmType};
use crate::address::Vaddr;
use crate::error::{VmError, VmResult};
use crate::frame::{FrameRef, frame_bytes_mut};
use crate::swap::SwapSlot;

/// 匿名页的后备状态
#[derive(Debug, Default)]
pub struct AnonPage {
    /// 页内容所在的交换槽，驻留时为 None
    slot: Option<SwapSlot>,
}

impl AnonPage {
    /// 没有交换槽的匿名页
    pub fn new() -> Self {
        AnonPage { slot: None }
    }

    /// 当前持有的交换槽
    pub fn slot(&self) -> Option<SwapSlot> {
        self.slot
    }
}

impl BackingStore for AnonPage {
    const TYPE: VmType = VmType::Anon;

    fn swap_in(&mut self, ctx: &BackingCtx<'_>, kva: usize) -> VmResult<()> {
        let slot = self.slot.ok_or(VmError::NoSwapSlot)?;
        // SAFETY: kva 是分配给本页的帧，换入期间只有本页访问它
        let page = unsafe { frame_bytes_mut(kva) };
        ctx.swap.load(slot, page)?;
        self.slot = None;
        Ok(())
    }

    fn swap_out(&mut self, ctx: &BackingCtx<'_>, va: Vaddr, frame: &FrameRef) -> VmResult<()> {
        let slot = ctx.swap.store(frame.as_slice())?;
        log::debug!("anon: page {} -> {:?}", va, slot);
        self.slot = Some(slot);
        Ok(())
    }

    fn destroy(&mut self, ctx: &BackingCtx<'_>, _va: Vaddr, _frame: &mut Option<FrameRef>) {
        if let Some(slot) = self.slot.take() {
            ctx.swap.release_slot(slot);
        }
    }
}
