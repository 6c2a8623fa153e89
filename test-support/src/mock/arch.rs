//! 架构相关操作的 Mock 实现
//!
//! 用一个原子标志模拟本地中断使能位。

use core::sync::atomic::{AtomicBool, Ordering};

/// Mock 架构操作
pub struct MockArchOps {
    interrupt_state: AtomicBool,
}

impl MockArchOps {
    pub const fn new() -> Self {
        Self {
            interrupt_state: AtomicBool::new(true),
        }
    }

    /// 关闭中断，返回之前的状态（1 = 开，0 = 关）
    ///
    /// # Safety
    /// 仅修改 mock 标志，没有真实副作用。
    pub unsafe fn read_and_disable_interrupts(&self) -> usize {
        self.interrupt_state.swap(false, Ordering::SeqCst) as usize
    }

    /// 按之前保存的状态恢复中断
    ///
    /// # Safety
    /// 仅修改 mock 标志，没有真实副作用。
    pub unsafe fn restore_interrupts(&self, flags: usize) {
        self.interrupt_state.store(flags != 0, Ordering::SeqCst);
    }

    /// 当前中断是否开启
    pub fn interrupts_enabled(&self) -> bool {
        self.interrupt_state.load(Ordering::SeqCst)
    }

    /// 强制设置中断状态（用于用例初始化）
    pub fn set_interrupts_enabled(&self, enabled: bool) {
        self.interrupt_state.store(enabled, Ordering::SeqCst);
    }
}

impl Default for MockArchOps {
    fn default() -> Self {
        Self::new()
    }
}

/// 全局 Mock 实例
pub static MOCK_ARCH_OPS: MockArchOps = MockArchOps::new();
