//! 物理帧分配操作 trait 定义和注册
//!
//! 共享内存对象的物理页来自外部的帧分配器。此模块定义分配器需要提供的接口，
//! 通过 trait 抽象实现与 os crate 的解耦。

use core::sync::atomic::{AtomicUsize, Ordering};

/// 物理帧分配操作
///
/// 实现必须可以在持有共享内存目录锁（关中断）时调用，且不能睡眠：
/// 分配要么立即成功，要么立即失败。
pub trait ShmFrameOps: Send + Sync {
    /// 分配一个物理帧，返回物理页号；内存耗尽时返回 `None`
    fn alloc_frame(&self) -> Option<usize>;

    /// 回收一个物理帧
    fn dealloc_frame(&self, ppn: usize);

    /// 将物理帧清零
    fn zero_frame(&self, ppn: usize);
}

static FRAME_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static FRAME_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册物理帧分配实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_frame_ops(ops: &'static dyn ShmFrameOps) {
    let ptr = ops as *const dyn ShmFrameOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn ShmFrameOps, (usize, usize)>(ptr) };
    FRAME_OPS_DATA.store(data, Ordering::Release);
    FRAME_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的物理帧分配实现
///
/// # Panics
/// 如果尚未调用 [`register_frame_ops`] 注册实现，则 panic
#[inline]
pub fn frame_ops() -> &'static dyn ShmFrameOps {
    let data = FRAME_OPS_DATA.load(Ordering::Acquire);
    let vtable = FRAME_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            return crate::tests::global_frames();
        }
        #[cfg(not(test))]
        panic!("shm: ShmFrameOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ShmFrameOps>((data, vtable)) }
}

#[cfg(test)]
mod test_mock {
    extern crate test_support;

    use super::ShmFrameOps;
    use test_support::mock::mm::MockFrameAllocator;

    impl ShmFrameOps for MockFrameAllocator {
        fn alloc_frame(&self) -> Option<usize> {
            self.alloc()
        }

        fn dealloc_frame(&self, ppn: usize) {
            self.dealloc(ppn);
        }

        fn zero_frame(&self, ppn: usize) {
            self.zero(ppn);
        }
    }
}
