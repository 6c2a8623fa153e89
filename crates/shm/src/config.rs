//! 共享内存子系统的编译期配置
//!
//! 目录容量与每个对象的页数上限都是编译期常量，进程内的共享内存窗口
//! 由它们直接推出，不需要任何运行时地址分配。

/// 页大小
pub const PAGE_SIZE: usize = 4096;

/// 目录中可同时存在的共享内存对象数
pub const SHM_MAX_OBJECTS: usize = 16;

/// 单个对象最多占用的物理页数
pub const SHM_MAX_PAGES: usize = 32;

/// 对象名的固定宽度（字节）
pub const SHM_NAME_LEN: usize = uapi::shm::SHM_NAME_MAX;

/// 用户地址空间中共享内存区域的起始地址
pub const SHM_REGION_START: usize = 0x6000_0000;

/// 每个描述符独占的虚拟窗口大小
pub const SHM_WINDOW_SIZE: usize = SHM_MAX_PAGES * PAGE_SIZE;

/// 共享内存区域的结束地址（不包含）
pub const SHM_REGION_END: usize = SHM_REGION_START + SHM_MAX_OBJECTS * SHM_WINDOW_SIZE;

/// 覆盖 `size` 字节所需的页数（向上取整）
#[inline]
pub const fn pages_for(size: usize) -> usize {
    size.div_ceil(PAGE_SIZE)
}

const _: () = assert!(SHM_REGION_START % PAGE_SIZE == 0);
const _: () = assert!(SHM_REGION_START < SHM_REGION_END);
