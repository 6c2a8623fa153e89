//! 共享内存对象持有的物理帧

use core::fmt;

use crate::ops::ShmFrameOps;

/// 物理帧跟踪器。
///
/// 实现了 RAII 模式：创建时清零，drop 时归还给分配它的 [`ShmFrameOps`]。
/// 对象的页列表由这些跟踪器组成，清空列表即释放全部物理页。
pub struct ShmFrame {
    ppn: usize,
    ops: &'static dyn ShmFrameOps,
}

impl ShmFrame {
    /// 从 `ops` 分配一个清零的帧；内存耗尽时返回 `None`。
    pub fn alloc(ops: &'static dyn ShmFrameOps) -> Option<Self> {
        let ppn = ops.alloc_frame()?;
        ops.zero_frame(ppn);
        Some(ShmFrame { ppn, ops })
    }

    /// 物理页号
    pub fn ppn(&self) -> usize {
        self.ppn
    }
}

impl Drop for ShmFrame {
    fn drop(&mut self) {
        self.ops.dealloc_frame(self.ppn);
    }
}

impl fmt::Debug for ShmFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShmFrame").field(&format_args!("{:#x}", self.ppn)).finish()
    }
}
