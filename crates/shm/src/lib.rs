//! 命名共享内存子系统
//!
//! 进程按名字打开一个共享内存对象，设置一次大小，把它映射进自己的地址空间，
//! 最后关闭。对象由物理页支撑，打开它的进程看到同一组物理页。
//!
//! # 组成
//!
//! - [`ShmDirectory`]：固定容量的对象目录，一把锁保护全部状态
//! - [`ShmFd`]：描述符，即目录槽位下标，在所有进程间全局一致
//! - [`ShmProcState`]：嵌在进程控制块中的打开 / 映射记录
//! - 映射协议：描述符 `fd` 总是映射在 [`ShmFd::window_base`] 处
//! - 生命周期钩子：[`ShmDirectory::on_fork`]、[`ShmDirectory::on_exit`]
//! - [`syscall`]：`-1` 语义的系统调用入口
//!
//! # 架构解耦
//!
//! - [`ShmFrameOps`]：物理帧分配，使用前必须调用 [`register_frame_ops`] 注册
//! - [`ShmAddressSpace`]：页表映射，由进程地址空间实现
//! - [`ShmTask`]：进程视图，由进程控制块实现
//!
//! 目录锁是 `sync::SpinLock`，因此还需要注册 `sync::ArchOps`。

#![no_std]

extern crate alloc;

mod config;
mod directory;
mod error;
mod fd;
mod frame;
mod name;
mod object;
mod ops;
mod perm;
mod space;

pub mod syscall;

#[cfg(test)]
mod tests;

pub use config::{
    PAGE_SIZE, SHM_MAX_OBJECTS, SHM_MAX_PAGES, SHM_NAME_LEN, SHM_REGION_END, SHM_REGION_START,
    SHM_WINDOW_SIZE, pages_for,
};
pub use directory::{SHM_DIRECTORY, ShmDirectory, init, shm_directory};
pub use error::{ShmError, ShmResult};
pub use fd::ShmFd;
pub use frame::ShmFrame;
pub use name::ShmName;
pub use object::ShmStat;
pub use ops::{ShmFrameOps, frame_ops, register_frame_ops};
pub use perm::{ShmPteFlags, check_map_mode, pte_flags_for};
pub use space::{PagingError, PagingResult, ShmAddressSpace, ShmProcState, ShmTask};
