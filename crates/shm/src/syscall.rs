//! 共享内存系统调用
//!
//! 参数已由系统调用分发层从用户态取出。所有失败都返回 `-1`（[`SHM_FAILED`]），
//! 具体原因只记录在日志中。

use uapi::shm::SHM_FAILED;

use crate::directory::shm_directory;
use crate::error::{ShmError, ShmResult};
use crate::fd::ShmFd;
use crate::space::ShmTask;

fn ret<T>(op: &str, res: ShmResult<T>, ok: impl FnOnce(T) -> isize) -> isize {
    match res {
        Ok(val) => ok(val),
        Err(err) => {
            log::debug!("shm: {} failed: {}", op, err);
            SHM_FAILED
        }
    }
}

/// `shm_open(name)`：打开或创建对象，返回描述符
pub fn sys_shm_open<T: ShmTask + ?Sized>(task: &mut T, name: &str) -> isize {
    ret("shm_open", shm_directory().open(task, name), ShmFd::as_raw)
}

/// `shm_trunc(fd, size)`：设置对象大小，返回最终生效的大小
pub fn sys_shm_trunc(fd: isize, size: isize) -> isize {
    let res = ShmFd::new(fd).and_then(|fd| {
        let size = usize::try_from(size).map_err(|_| ShmError::InvalidSize)?;
        shm_directory().trunc(fd, size)
    });
    // 大小不超过 SHM_MAX_PAGES 页，不会溢出 isize
    ret("shm_trunc", res, |size| size as isize)
}

/// `shm_map(fd, va, flags)`：映射对象，成功时把基址写入 `va` 并返回 0
pub fn sys_shm_map<T: ShmTask + ?Sized>(task: &mut T, fd: isize, va: &mut usize, flags: u32) -> isize {
    let res = ShmFd::new(fd).and_then(|fd| shm_directory().map(task, fd, flags));
    ret("shm_map", res, |base| {
        *va = base;
        0
    })
}

/// `shm_close(fd)`：关闭描述符
pub fn sys_shm_close<T: ShmTask + ?Sized>(task: &mut T, fd: isize) -> isize {
    let res = ShmFd::new(fd).and_then(|fd| shm_directory().close(task, fd));
    ret("shm_close", res, |()| 0)
}

/// 进程 fork 时调用，失败返回 `-1`，调用方负责拆除构造了一半的子进程
pub fn shm_fork<P, C>(parent: &P, child: &mut C) -> isize
where
    P: ShmTask + ?Sized,
    C: ShmTask + ?Sized,
{
    ret("shm_fork", shm_directory().on_fork(parent, child), |()| 0)
}

/// 进程退出时调用，关闭它仍打开的全部描述符
pub fn shm_exit<T: ShmTask + ?Sized>(task: &mut T) {
    shm_directory().on_exit(task);
}
