//! 共享内存对象
//!
//! 目录中的一个槽位。对象在第一次按名打开时创建，在第一次 trunc 时分配物理页，
//! 此后大小不再变化；引用计数归零时页被释放、槽位被清空。

use alloc::vec::Vec;

use crate::config::{PAGE_SIZE, SHM_MAX_PAGES, pages_for};
use crate::error::{ShmError, ShmResult};
use crate::frame::ShmFrame;
use crate::name::ShmName;
use crate::ops::ShmFrameOps;

/// 对象状态快照
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShmStat {
    /// 对象名
    pub name: ShmName,
    /// 字节数，0 表示尚未设置大小
    pub size: usize,
    /// 占用的物理页数
    pub pages: usize,
    /// 打开该对象的进程数
    pub ref_count: usize,
}

/// 目录槽位
///
/// 不变式：
/// - `size == 0` 当且仅当 `frames` 为空，二者在 [`ShmObject::truncate`] 中一次性设置；
/// - `ref_count == 0` 当且仅当槽位空闲（`name` 为空）。
#[derive(Debug)]
pub(crate) struct ShmObject {
    name: ShmName,
    size: usize,
    frames: Vec<ShmFrame>,
    ref_count: usize,
}

impl ShmObject {
    pub(crate) const fn new() -> Self {
        Self {
            name: ShmName::EMPTY,
            size: 0,
            frames: Vec::new(),
            ref_count: 0,
        }
    }

    pub(crate) fn is_free(&self) -> bool {
        self.name.is_empty()
    }

    pub(crate) fn name(&self) -> &ShmName {
        &self.name
    }

    pub(crate) fn frames(&self) -> &[ShmFrame] {
        &self.frames
    }

    /// 第 `page` 页实际使用的字节数：最后一页只覆盖到 `size` 为止
    pub(crate) fn page_len(&self, page: usize) -> usize {
        if page + 1 < self.frames.len() {
            PAGE_SIZE
        } else {
            self.size - page * PAGE_SIZE
        }
    }

    pub(crate) fn stat(&self) -> ShmStat {
        ShmStat {
            name: self.name,
            size: self.size,
            pages: self.frames.len(),
            ref_count: self.ref_count,
        }
    }

    /// 用 `name` 占用空闲槽位
    pub(crate) fn claim(&mut self, name: ShmName) {
        debug_assert!(self.is_free() && self.ref_count == 0);
        self.name = name;
    }

    pub(crate) fn get(&mut self) {
        self.ref_count += 1;
    }

    /// 引用计数减一，返回是否已无进程持有
    pub(crate) fn put(&mut self) -> bool {
        debug_assert!(self.ref_count > 0);
        self.ref_count -= 1;
        self.ref_count == 0
    }

    /// 设置对象大小并分配物理页，返回最终生效的大小。
    ///
    /// 只有第一次调用生效；之后的调用直接返回已有大小，请求的新大小被忽略。
    /// 分配是全有或全无的：任何一页分配失败，本次已分配的页全部归还，
    /// 对象保持未设置大小的状态，之后仍可用更小的大小重试。
    pub(crate) fn truncate(&mut self, size: usize, ops: &'static dyn ShmFrameOps) -> ShmResult<usize> {
        if self.size != 0 {
            if size != self.size {
                log::debug!(
                    "shm: '{}' already sized to {} bytes, ignoring {}",
                    self.name,
                    self.size,
                    size
                );
            }
            return Ok(self.size);
        }

        let pages = pages_for(size);
        if pages > SHM_MAX_PAGES {
            return Err(ShmError::TooLarge);
        }

        let mut frames = Vec::with_capacity(pages);
        for _ in 0..pages {
            // 失败时 frames 被 drop，已分配的帧随之归还
            frames.push(ShmFrame::alloc(ops).ok_or(ShmError::OutOfMemory)?);
        }

        self.frames = frames;
        // 最后写 size，未分配完的对象永远不会表现为“已设置大小”
        self.size = size;
        Ok(size)
    }

    /// 释放全部物理页并清空槽位，返回释放的页数
    pub(crate) fn release(&mut self) -> usize {
        let pages = self.frames.len();
        *self = ShmObject::new();
        pages
    }
}
