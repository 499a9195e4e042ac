//! 未初始化页
//!
//! 页在第一次驻留之前只携带一份加载描述符。首次换入时按描述符填充帧，
//! 随后页变为描述符指定的目标类型，描述符随之消耗。

use alloc::sync::Arc;

use super::anon::AnonPage;
use super::file::{FilePage, load_file_bytes};
use super::{Backing, VmType};
use crate::config::page_size;
use crate::error::{VmError, VmResult};
use crate::file::MmFile;
use crate::frame::frame_bytes_mut;

/// 文件页的加载参数
#[derive(Clone)]
pub struct FileLoad {
    file: Arc<dyn MmFile>,
    offset: usize,
    read_bytes: usize,
    zero_bytes: usize,
}

impl FileLoad {
    /// 从 `file` 的 `offset` 处读取 `read_bytes` 字节，页内其余部分补零
    ///
    /// `read_bytes` 超过一页时返回 [`VmError::InvalidArgument`]。
    pub fn new(file: Arc<dyn MmFile>, offset: usize, read_bytes: usize) -> VmResult<Self> {
        let zero_bytes = page_size()
            .checked_sub(read_bytes)
            .ok_or(VmError::InvalidArgument)?;
        Ok(FileLoad {
            file,
            offset,
            read_bytes,
            zero_bytes,
        })
    }

    /// 源文件句柄
    pub fn file(&self) -> &Arc<dyn MmFile> {
        &self.file
    }

    /// 文件内偏移
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// 有效字节数
    pub fn read_bytes(&self) -> usize {
        self.read_bytes
    }

    /// 页尾补零字节数
    pub fn zero_bytes(&self) -> usize {
        self.zero_bytes
    }
}

/// 延迟加载描述符
#[derive(Clone)]
pub enum LoadDescriptor {
    /// 整页补零
    Anon,
    /// 从文件读取
    File(FileLoad),
}

impl LoadDescriptor {
    /// 加载完成后页的类型
    pub fn target(&self) -> VmType {
        match self {
            LoadDescriptor::Anon => VmType::Anon,
            LoadDescriptor::File(_) => VmType::File,
        }
    }
}

/// 尚未驻留过的页
pub struct UninitPage {
    desc: LoadDescriptor,
}

impl UninitPage {
    pub(crate) fn new(desc: LoadDescriptor) -> Self {
        UninitPage { desc }
    }

    /// 初始化后的类型
    pub fn target(&self) -> VmType {
        self.desc.target()
    }

    /// 加载描述符
    pub fn descriptor(&self) -> &LoadDescriptor {
        &self.desc
    }

    /// 按描述符填充位于 `kva` 的帧
    pub(crate) fn load(&self, kva: usize) -> VmResult<()> {
        // SAFETY: kva 是调用者交给本页的帧，换入期间只有本页访问它
        let page = unsafe { frame_bytes_mut(kva) };
        match &self.desc {
            LoadDescriptor::Anon => {
                page.fill(0);
                Ok(())
            }
            LoadDescriptor::File(load) => {
                load_file_bytes(load.file.as_ref(), load.offset, load.read_bytes, page)
            }
        }
    }

    /// 加载完成后取代本页的后备存储
    pub(crate) fn resident(&self) -> Backing {
        match &self.desc {
            LoadDescriptor::Anon => Backing::Anon(AnonPage::new()),
            LoadDescriptor::File(load) => {
                Backing::File(FilePage::new(load.file.clone(), load.offset, load.read_bytes))
            }
        }
    }
}
