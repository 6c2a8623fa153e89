//! 进程侧的接口
//!
//! - [`ShmAddressSpace`]：页表映射器，由进程的地址空间实现
//! - [`ShmProcState`]：嵌在进程控制块里的共享内存状态
//! - [`ShmTask`]：目录操作所需的进程视图

use crate::config::SHM_MAX_OBJECTS;
use crate::fd::ShmFd;
use crate::perm::ShmPteFlags;

/// 页表映射失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 虚拟地址已被映射
    AlreadyMapped,
    /// 提供了无效的地址
    InvalidAddress,
    /// 分配页表页失败
    OutOfMemory,
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;

/// 页表映射器
///
/// 实现方是某个进程的用户地址空间。两个方法都在目录锁内被调用，不能睡眠。
pub trait ShmAddressSpace {
    /// 将物理页 `ppn` 映射到页对齐的 `vaddr`，`len`（不超过一页）为本页实际使用的字节数
    fn map_range(
        &mut self,
        vaddr: usize,
        len: usize,
        ppn: usize,
        flags: ShmPteFlags,
    ) -> PagingResult<()>;

    /// 解除 `vaddr` 所在页的映射；该页未映射时什么也不做
    fn unmap_range(&mut self, vaddr: usize);
}

/// 进程的共享内存状态
///
/// 按描述符下标记录：是否打开、是否已映射、映射时请求的访问模式。
/// 只在该进程自己的调用中（持有目录锁时）修改，fork 时由父进程写入尚未运行的子进程。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShmProcState {
    open: [bool; SHM_MAX_OBJECTS],
    mapped: [bool; SHM_MAX_OBJECTS],
    map_flags: [u32; SHM_MAX_OBJECTS],
}

impl ShmProcState {
    /// 空状态：没有打开任何对象
    pub const fn new() -> Self {
        Self {
            open: [false; SHM_MAX_OBJECTS],
            mapped: [false; SHM_MAX_OBJECTS],
            map_flags: [0; SHM_MAX_OBJECTS],
        }
    }

    /// 是否打开了 `fd`
    pub fn is_open(&self, fd: ShmFd) -> bool {
        self.open[fd.index()]
    }

    /// 是否映射了 `fd`
    pub fn is_mapped(&self, fd: ShmFd) -> bool {
        self.mapped[fd.index()]
    }

    /// 映射 `fd` 时请求的访问模式
    pub fn map_mode(&self, fd: ShmFd) -> Option<u32> {
        self.is_mapped(fd).then(|| self.map_flags[fd.index()])
    }

    /// 当前打开的全部描述符
    pub fn open_fds(&self) -> impl Iterator<Item = ShmFd> + '_ {
        ShmFd::all().filter(|&fd| self.is_open(fd))
    }

    /// 是否没有打开任何对象
    pub fn is_empty(&self) -> bool {
        !self.open.contains(&true)
    }

    pub(crate) fn set_open(&mut self, fd: ShmFd) {
        self.open[fd.index()] = true;
    }

    pub(crate) fn set_mapped(&mut self, fd: ShmFd, mode: u32) {
        self.mapped[fd.index()] = true;
        self.map_flags[fd.index()] = mode;
    }

    pub(crate) fn clear(&mut self, fd: ShmFd) {
        self.open[fd.index()] = false;
        self.mapped[fd.index()] = false;
        self.map_flags[fd.index()] = 0;
    }
}

impl Default for ShmProcState {
    fn default() -> Self {
        Self::new()
    }
}

/// 目录操作所需的进程视图，由进程控制块实现
pub trait ShmTask {
    /// 进程号（仅用于日志）
    fn pid(&self) -> usize;

    /// 共享内存状态
    fn shm_state(&self) -> &ShmProcState;

    /// 共享内存状态（可变）
    fn shm_state_mut(&mut self) -> &mut ShmProcState;

    /// 进程的用户地址空间
    fn address_space(&mut self) -> &mut dyn ShmAddressSpace;
}

#[cfg(test)]
mod test_mock {
    extern crate test_support;

    use super::{PagingError, PagingResult, ShmAddressSpace};
    use crate::perm::ShmPteFlags;
    use test_support::mock::mm::{MockAddressSpace, MockMapError, MockPte};

    impl ShmAddressSpace for MockAddressSpace {
        fn map_range(
            &mut self,
            vaddr: usize,
            len: usize,
            ppn: usize,
            flags: ShmPteFlags,
        ) -> PagingResult<()> {
            let pte = MockPte {
                ppn,
                len,
                user: flags.contains(ShmPteFlags::USER_ACCESSIBLE),
                readable: flags.contains(ShmPteFlags::READABLE),
                writable: flags.contains(ShmPteFlags::WRITEABLE),
            };
            self.map(vaddr, pte).map_err(|err| match err {
                MockMapError::AlreadyMapped => PagingError::AlreadyMapped,
                MockMapError::InvalidAddress => PagingError::InvalidAddress,
                MockMapError::Injected => PagingError::OutOfMemory,
            })
        }

        fn unmap_range(&mut self, vaddr: usize) {
            self.unmap(vaddr);
        }
    }
}
