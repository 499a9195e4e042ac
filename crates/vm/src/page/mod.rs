//! 虚拟页与后备存储
//!
//! 每个用户虚拟页由一个 [`Page`] 描述，按后备类型分为三种：
//!
//! - **未初始化页**（[`UninitPage`]）：只携带延迟加载描述符，首次换入时填充帧，
//!   之后转为目标类型；
//! - **匿名页**（[`AnonPage`]）：被驱逐时写入交换区；
//! - **文件页**（[`FilePage`]）：被驱逐或销毁时把脏数据写回文件。
//!
//! 匿名页和文件页实现同一个 [`BackingStore`] 契约，[`Page`] 按 [`Backing`]
//! 的变体分发。页与帧之间的双向关联由 [`Page`] 统一建立和解除。

mod anon;
mod file;
mod uninit;

use alloc::sync::Arc;

pub use anon::AnonPage;
pub use file::FilePage;
pub use uninit::{FileLoad, LoadDescriptor, UninitPage};

use crate::address::Vaddr;
use crate::error::{VmError, VmResult};
use crate::file::MmFile;
use crate::frame::FrameRef;
use crate::page_table::{HwPageTable, PteFlags};
use crate::swap::{SwapArea, SwapSlot};

/// 页的后备类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmType {
    /// 尚未驻留过
    Uninit,
    /// 匿名内存
    Anon,
    /// 文件映射
    File,
}

/// 后备存储操作所需的上下文
///
/// 交换区是显式传入的值而不是全局变量，页表是页所属进程的页表。
#[derive(Clone, Copy)]
pub struct BackingCtx<'a> {
    /// 交换区
    pub swap: &'a SwapArea,
    /// 所属进程的硬件页表
    pub page_table: &'a dyn HwPageTable,
}

/// 后备存储契约
pub trait BackingStore {
    /// 类型标签
    const TYPE: VmType;

    /// 将页内容载入位于 `kva` 的帧
    fn swap_in(&mut self, ctx: &BackingCtx<'_>, kva: usize) -> VmResult<()>;

    /// 将驻留在 `frame` 中的页内容保存到后备存储
    ///
    /// 失败时帧内容不受影响，页仍然驻留。
    fn swap_out(&mut self, ctx: &BackingCtx<'_>, va: Vaddr, frame: &FrameRef) -> VmResult<()>;

    /// 页被移除时释放后备资源
    fn destroy(&mut self, ctx: &BackingCtx<'_>, va: Vaddr, frame: &mut Option<FrameRef>);
}

/// 页的后备状态
pub enum Backing {
    /// 未初始化
    Uninit(UninitPage),
    /// 匿名页
    Anon(AnonPage),
    /// 文件页
    File(FilePage),
}

/// 用户虚拟页
pub struct Page {
    va: Vaddr,
    writable: bool,
    frame: Option<FrameRef>,
    backing: Backing,
}

impl Page {
    /// 以给定描述符创建一个未初始化页
    pub fn new_uninit(va: Vaddr, writable: bool, desc: LoadDescriptor) -> Self {
        Page {
            va,
            writable,
            frame: None,
            backing: Backing::Uninit(UninitPage::new(desc)),
        }
    }

    /// 页的虚拟地址
    pub fn va(&self) -> Vaddr {
        self.va
    }

    /// 用户态是否可写
    pub fn writable(&self) -> bool {
        self.writable
    }

    /// 驻留的帧
    pub fn frame(&self) -> Option<&FrameRef> {
        self.frame.as_ref()
    }

    /// 是否驻留在内存中
    pub fn is_resident(&self) -> bool {
        self.frame.is_some()
    }

    /// 后备状态
    pub fn backing(&self) -> &Backing {
        &self.backing
    }

    /// 当前的后备类型
    pub fn current_type(&self) -> VmType {
        match &self.backing {
            Backing::Uninit(_) => VmType::Uninit,
            Backing::Anon(_) => AnonPage::TYPE,
            Backing::File(_) => FilePage::TYPE,
        }
    }

    /// 页最终的后备类型，未初始化页返回其目标类型
    pub fn vm_type(&self) -> VmType {
        match &self.backing {
            Backing::Uninit(uninit) => uninit.target(),
            _ => self.current_type(),
        }
    }

    /// 文件映射页所属映射组的文件句柄
    pub fn mapped_file(&self) -> Option<&Arc<dyn MmFile>> {
        match &self.backing {
            Backing::Uninit(uninit) => match uninit.descriptor() {
                LoadDescriptor::File(load) => Some(load.file()),
                LoadDescriptor::Anon => None,
            },
            Backing::File(file) => Some(file.file()),
            Backing::Anon(_) => None,
        }
    }

    /// 匿名页当前持有的交换槽
    pub fn swap_slot(&self) -> Option<SwapSlot> {
        match &self.backing {
            Backing::Anon(anon) => anon.slot(),
            _ => None,
        }
    }

    /// 将页载入 `frame` 并建立硬件翻译
    ///
    /// 未初始化页在此按描述符完成首次加载并转为目标类型。
    /// 失败时撤销翻译和页帧关联，页保持原状态。
    pub fn swap_in(&mut self, frame: FrameRef, ctx: &BackingCtx<'_>) -> VmResult<()> {
        if self.frame.is_some() {
            return Err(VmError::AlreadyMapped);
        }
        let kva = frame.kva();
        frame.attach(self.va);
        ctx.page_table
            .map(self.va, kva, PteFlags::user_data(self.writable))
            .inspect_err(|_| frame.detach())?;

        let loaded = match &mut self.backing {
            Backing::Uninit(uninit) => uninit.load(kva).map(|_| Some(uninit.resident())),
            Backing::Anon(anon) => anon.swap_in(ctx, kva).map(|_| None),
            Backing::File(file) => file.swap_in(ctx, kva).map(|_| None),
        };
        match loaded {
            Ok(resident) => {
                if let Some(backing) = resident {
                    self.backing = backing;
                }
                self.frame = Some(frame);
                Ok(())
            }
            Err(e) => {
                let _ = ctx.page_table.unmap(self.va);
                frame.detach();
                Err(e)
            }
        }
    }

    /// 将页内容保存到后备存储，撤销硬件翻译并解除页帧关联
    ///
    /// 帧本身的回收由调用者负责。
    pub fn swap_out(&mut self, ctx: &BackingCtx<'_>) -> VmResult<()> {
        let frame = self.frame.clone().ok_or(VmError::NotResident)?;
        match &mut self.backing {
            Backing::Uninit(_) => return Err(VmError::NotResident),
            Backing::Anon(anon) => anon.swap_out(ctx, self.va, &frame)?,
            Backing::File(file) => file.swap_out(ctx, self.va, &frame)?,
        }
        let _ = ctx.page_table.unmap(self.va);
        frame.detach();
        self.frame = None;
        Ok(())
    }

    /// 释放页的后备资源，撤销硬件翻译并解除页帧关联
    pub fn destroy(&mut self, ctx: &BackingCtx<'_>) {
        match &mut self.backing {
            Backing::Uninit(_) => {}
            Backing::Anon(anon) => anon.destroy(ctx, self.va, &mut self.frame),
            Backing::File(file) => file.destroy(ctx, self.va, &mut self.frame),
        }
        if ctx.page_table.is_mapped(self.va) {
            let _ = ctx.page_table.unmap(self.va);
        }
        if let Some(frame) = self.frame.take() {
            frame.detach();
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate test_support;

    use super::*;
    use crate::disk::RamDisk;
    use crate::test_util::{TestFrame, init_test_env};
    use test_support::mock::fs::MockFile;
    use test_support::mock::mmu::MockPageTable;

    const VA: Vaddr = Vaddr::from_usize(0x40_0000);

    fn swap_area(slots: usize) -> (Arc<RamDisk>, SwapArea) {
        init_test_env();
        let disk = RamDisk::new(slots * 8);
        let area = SwapArea::new(Some(disk.clone()));
        (disk, area)
    }

    fn file_desc(file: &Arc<MockFile>, offset: usize, read_bytes: usize) -> LoadDescriptor {
        let file: Arc<dyn MmFile> = file.clone();
        LoadDescriptor::File(FileLoad::new(file, offset, read_bytes).unwrap())
    }

    #[test]
    fn test_uninit_anon_first_touch_zero_fills() {
        let (_disk, swap) = swap_area(2);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let tf = TestFrame::new();
        tf.fill(0xcc);

        let mut page = Page::new_uninit(VA, true, LoadDescriptor::Anon);
        assert_eq!(page.current_type(), VmType::Uninit);
        assert_eq!(page.vm_type(), VmType::Anon);

        page.swap_in(tf.frame(), &ctx).unwrap();
        assert_eq!(page.current_type(), VmType::Anon);
        assert!(tf.contents().iter().all(|&b| b == 0));
        assert_eq!(page.frame().and_then(|f| f.owner()), Some(VA));
        assert_eq!(pt.walk(VA.as_usize()).map(|(kva, _)| kva), Some(tf.kva()));
    }

    #[test]
    fn test_anon_swap_roundtrip_through_page() {
        let (_disk, swap) = swap_area(2);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let first = TestFrame::new();
        let second = TestFrame::new();

        let mut page = Page::new_uninit(VA, true, LoadDescriptor::Anon);
        page.swap_in(first.frame(), &ctx).unwrap();
        assert!(pt.user_write(VA.as_usize(), 100, b"anonymous"));
        let frame = page.frame().cloned().unwrap();

        page.swap_out(&ctx).unwrap();
        assert!(!page.is_resident());
        assert!(page.swap_slot().is_some());
        assert_eq!(frame.owner(), None);
        assert!(!pt.is_mapped(VA));
        assert_eq!(swap.used_slots(), 1);

        page.swap_in(second.frame(), &ctx).unwrap();
        assert_eq!(second.contents(), first.contents());
        assert_eq!(&second.contents()[100..109], b"anonymous");
        assert_eq!(page.swap_slot(), None);
        assert_eq!(swap.used_slots(), 0);
    }

    #[test]
    fn test_anon_swap_out_without_swap_keeps_frame() {
        init_test_env();
        let swap = SwapArea::new(None);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let tf = TestFrame::new();

        let mut page = Page::new_uninit(VA, true, LoadDescriptor::Anon);
        page.swap_in(tf.frame(), &ctx).unwrap();
        tf.write(0, b"keep");

        assert_eq!(page.swap_out(&ctx), Err(VmError::NoSwapDevice));
        assert!(page.is_resident());
        assert!(pt.is_mapped(VA));
        assert_eq!(&tf.contents()[..4], b"keep");
    }

    #[test]
    fn test_anon_swap_in_without_slot_fails() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let tf = TestFrame::new();
        let frame = tf.frame();

        let mut anon = AnonPage::new();
        assert_eq!(anon.swap_in(&ctx, frame.kva()), Err(VmError::NoSwapSlot));
    }

    #[test]
    fn test_anon_destroy_releases_slot() {
        let (_disk, swap) = swap_area(2);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let tf = TestFrame::new();

        let mut page = Page::new_uninit(VA, true, LoadDescriptor::Anon);
        page.swap_in(tf.frame(), &ctx).unwrap();
        page.swap_out(&ctx).unwrap();
        assert_eq!(swap.used_slots(), 1);

        page.destroy(&ctx);
        assert_eq!(swap.used_slots(), 0);
        assert_eq!(page.swap_slot(), None);
        // 重复销毁什么也不做
        page.destroy(&ctx);
        assert_eq!(swap.used_slots(), 0);
    }

    #[test]
    fn test_uninit_file_first_touch_reads_and_zero_fills() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let file = MockFile::new(b"0123456789");
        let tf = TestFrame::new();
        tf.fill(0xee);

        let mut page = Page::new_uninit(VA, false, file_desc(&file, 0, 10));
        assert_eq!(page.vm_type(), VmType::File);
        page.swap_in(tf.frame(), &ctx).unwrap();

        let contents = tf.contents();
        assert_eq!(&contents[..10], b"0123456789");
        assert!(contents[10..].iter().all(|&b| b == 0));
        assert_eq!(page.current_type(), VmType::File);
        assert!(!pt.user_write(VA.as_usize(), 0, b"x"));
    }

    #[test]
    fn test_file_swap_out_writes_only_dirty() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let file = MockFile::new(&[b'a'; 6000]);
        let tf = TestFrame::new();
        let again = TestFrame::new();

        let mut page = Page::new_uninit(VA, true, file_desc(&file, 4096, 6000 - 4096));
        page.swap_in(tf.frame(), &ctx).unwrap();

        // 干净页换出不写文件
        page.swap_out(&ctx).unwrap();
        assert_eq!(file.write_calls(), 0);
        assert_eq!(swap.used_slots(), 0);

        page.swap_in(again.frame(), &ctx).unwrap();
        assert!(pt.user_write(VA.as_usize(), 0, b"ZZ"));
        page.swap_out(&ctx).unwrap();
        assert_eq!(file.write_calls(), 1);
        assert_eq!(&file.contents()[4096..4098], b"ZZ");
        assert_eq!(file.contents().len(), 6000);
    }

    #[test]
    fn test_file_swap_in_rereads_file() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let file = MockFile::new(b"hello world");
        let first = TestFrame::new();
        let second = TestFrame::new();
        second.fill(0x77);

        let mut page = Page::new_uninit(VA, true, file_desc(&file, 0, 11));
        page.swap_in(first.frame(), &ctx).unwrap();
        assert!(pt.user_write(VA.as_usize(), 0, b"HELLO"));
        page.swap_out(&ctx).unwrap();

        page.swap_in(second.frame(), &ctx).unwrap();
        assert_eq!(&second.contents()[..11], b"HELLO world");
        assert!(second.contents()[11..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_file_destroy_writes_back_and_unmaps() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let file = MockFile::new(b"abcdef");
        let tf = TestFrame::new();

        let mut page = Page::new_uninit(VA, true, file_desc(&file, 0, 6));
        page.swap_in(tf.frame(), &ctx).unwrap();
        let frame = page.frame().cloned().unwrap();
        assert!(pt.user_write(VA.as_usize(), 2, b"XY"));

        page.destroy(&ctx);
        assert_eq!(file.contents(), b"abXYef");
        assert!(!pt.is_mapped(VA));
        assert!(!page.is_resident());
        assert_eq!(frame.owner(), None);
    }

    #[test]
    fn test_failed_first_touch_leaves_page_uninit() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let file = MockFile::new(b"data");
        file.set_fail_io(true);
        let tf = TestFrame::new();
        let frame = tf.frame();

        let mut page = Page::new_uninit(VA, true, file_desc(&file, 0, 4));
        assert_eq!(page.swap_in(frame.clone(), &ctx), Err(VmError::FileIo(-5)));
        assert_eq!(page.current_type(), VmType::Uninit);
        assert!(!page.is_resident());
        assert!(!pt.is_mapped(VA));
        assert_eq!(frame.owner(), None);

        file.set_fail_io(false);
        page.swap_in(frame, &ctx).unwrap();
        assert_eq!(&tf.contents()[..4], b"data");
    }

    #[test]
    fn test_swap_out_non_resident_fails() {
        let (_disk, swap) = swap_area(1);
        let pt = MockPageTable::new();
        let ctx = BackingCtx {
            swap: &swap,
            page_table: &pt,
        };
        let mut page = Page::new_uninit(VA, true, LoadDescriptor::Anon);
        assert_eq!(page.swap_out(&ctx), Err(VmError::NotResident));
    }

    #[test]
    fn test_file_load_rejects_oversized_read() {
        let file: Arc<dyn MmFile> = MockFile::new(b"x");
        assert!(FileLoad::new(file.clone(), 0, 4097).is_err());
        let load = FileLoad::new(file, 0, 1).unwrap();
        assert_eq!(load.zero_bytes(), 4095);
    }
}
