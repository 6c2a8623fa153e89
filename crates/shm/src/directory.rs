//! 共享内存目录
//!
//! 固定容量的对象表，按名字寻址，由**一把**自旋锁保护。
//!
//! # 锁
//!
//! open / trunc / map / close / fork 钩子在整个操作期间持有目录锁，
//! 包括其中的帧分配和页表映射调用；exit 钩子对每个描述符各调用一次 close，
//! 每次 close 单独加锁。任何两个目录操作（即使针对不同对象）都不会并发执行，
//! 因此引用计数更新、槽位占用、物理页分配与释放之间不存在竞争。
//!
//! # 描述符
//!
//! 描述符是槽位下标（见 [`ShmFd`]），所有进程对同一对象看到同一个值。

use alloc::vec::Vec;

use lazy_static::lazy_static;
use sync::SpinLock;

use crate::config::SHM_MAX_OBJECTS;
use crate::error::{ShmError, ShmResult};
use crate::fd::ShmFd;
use crate::name::ShmName;
use crate::object::{ShmObject, ShmStat};
use crate::ops::{ShmFrameOps, frame_ops};
use crate::perm::{check_map_mode, pte_flags_for};
use crate::space::{PagingResult, ShmAddressSpace, ShmTask};

struct ShmTable {
    objects: [ShmObject; SHM_MAX_OBJECTS],
}

impl ShmTable {
    fn new() -> Self {
        Self {
            objects: core::array::from_fn(|_| ShmObject::new()),
        }
    }

    fn find(&self, name: &ShmName) -> Option<ShmFd> {
        ShmFd::all().find(|fd| self.objects[fd.index()].name() == name)
    }

    fn find_free(&self) -> Option<ShmFd> {
        ShmFd::all().find(|fd| self.objects[fd.index()].is_free())
    }

    fn object(&self, fd: ShmFd) -> &ShmObject {
        &self.objects[fd.index()]
    }

    fn object_mut(&mut self, fd: ShmFd) -> &mut ShmObject {
        &mut self.objects[fd.index()]
    }

    /// 取出正在使用的槽位
    fn used_mut(&mut self, fd: ShmFd) -> ShmResult<&mut ShmObject> {
        let obj = self.object_mut(fd);
        if obj.is_free() {
            return Err(ShmError::NotInUse);
        }
        Ok(obj)
    }
}

/// 把对象的全部物理页映射到 `fd` 的固定窗口。
///
/// 中途失败时解除本次已经建立的映射，再返回错误。
fn map_object(
    obj: &ShmObject,
    fd: ShmFd,
    space: &mut dyn ShmAddressSpace,
    mode: u32,
) -> PagingResult<()> {
    let flags = pte_flags_for(mode);
    for (page, frame) in obj.frames().iter().enumerate() {
        if let Err(err) = space.map_range(fd.page_vaddr(page), obj.page_len(page), frame.ppn(), flags)
        {
            for mapped in 0..page {
                space.unmap_range(fd.page_vaddr(mapped));
            }
            return Err(err);
        }
    }
    Ok(())
}

fn unmap_object(obj: &ShmObject, fd: ShmFd, space: &mut dyn ShmAddressSpace) {
    for page in 0..obj.frames().len() {
        space.unmap_range(fd.page_vaddr(page));
    }
}

/// 共享内存目录
pub struct ShmDirectory {
    table: SpinLock<ShmTable>,
    frame_ops: &'static dyn ShmFrameOps,
}

impl ShmDirectory {
    /// 创建一个空目录，对象的物理页从 `frame_ops` 分配
    pub fn new(frame_ops: &'static dyn ShmFrameOps) -> Self {
        Self {
            table: SpinLock::new(ShmTable::new()),
            frame_ops,
        }
    }

    /// 按名打开对象，不存在则创建。
    ///
    /// 成功时对象引用计数加一，并在调用进程中记为已打开。同一进程重复打开同一对象
    /// 直接返回原描述符，不再增加引用计数。
    ///
    /// # Errors
    /// - [`ShmError::InvalidName`]：名字为空
    /// - [`ShmError::DirectoryFull`]：没有空闲槽位，目录不受影响
    pub fn open<T: ShmTask + ?Sized>(&self, task: &mut T, name: &str) -> ShmResult<ShmFd> {
        let key = ShmName::new(name)?;
        let mut table = self.table.lock();

        let fd = match table.find(&key) {
            Some(fd) => fd,
            None => {
                let fd = table.find_free().ok_or(ShmError::DirectoryFull)?;
                table.object_mut(fd).claim(key);
                log::debug!("shm: pid {} created '{}' as fd {}", task.pid(), key, fd.index());
                fd
            }
        };

        if !task.shm_state().is_open(fd) {
            table.object_mut(fd).get();
            task.shm_state_mut().set_open(fd);
        }
        Ok(fd)
    }

    /// 设置对象大小，返回最终生效的大小。
    ///
    /// 只有第一次调用会分配物理页，之后返回第一次确定的大小（忽略新请求的大小）。
    ///
    /// # Errors
    /// - [`ShmError::NotInUse`]：槽位空闲
    /// - [`ShmError::TooLarge`]：超过单对象页数上限
    /// - [`ShmError::OutOfMemory`]：物理帧不足，本次分配已全部回滚
    pub fn trunc(&self, fd: ShmFd, size: usize) -> ShmResult<usize> {
        let mut table = self.table.lock();
        table.used_mut(fd)?.truncate(size, self.frame_ops)
    }

    /// 将对象映射到调用进程的地址空间，返回映射基址。
    ///
    /// 基址只由描述符决定（[`ShmFd::window_base`]）。最后一页只映射到对象大小为止。
    /// 尚未设置大小的对象没有页可映射，调用仍然成功并记为已映射。
    ///
    /// # Errors
    /// - [`ShmError::NotInUse`] / [`ShmError::NotOpen`] / [`ShmError::AlreadyMapped`]
    /// - [`ShmError::WriteOnly`] / [`ShmError::InvalidMode`]
    /// - [`ShmError::Paging`]：页表映射失败，本次已建立的映射已被撤销
    pub fn map<T: ShmTask + ?Sized>(&self, task: &mut T, fd: ShmFd, mode: u32) -> ShmResult<usize> {
        let mut table = self.table.lock();
        let obj = table.used_mut(fd)?;

        let state = task.shm_state();
        if !state.is_open(fd) {
            return Err(ShmError::NotOpen);
        }
        if state.is_mapped(fd) {
            return Err(ShmError::AlreadyMapped);
        }
        check_map_mode(mode)?;

        map_object(obj, fd, task.address_space(), mode)?;
        task.shm_state_mut().set_mapped(fd, mode);
        Ok(fd.window_base())
    }

    /// 关闭描述符。
    ///
    /// 若调用进程映射了该对象，先解除整个窗口的映射。引用计数归零时释放全部物理页
    /// 并清空槽位，与调用者是否为创建者无关。
    ///
    /// # Errors
    /// - [`ShmError::NotInUse`]：槽位空闲
    /// - [`ShmError::NotOpen`]：调用进程没有打开该描述符
    pub fn close<T: ShmTask + ?Sized>(&self, task: &mut T, fd: ShmFd) -> ShmResult<()> {
        let mut table = self.table.lock();
        let obj = table.used_mut(fd)?;
        if !task.shm_state().is_open(fd) {
            return Err(ShmError::NotOpen);
        }

        if task.shm_state().is_mapped(fd) {
            unmap_object(obj, fd, task.address_space());
        }
        task.shm_state_mut().clear(fd);

        if obj.put() {
            let name = *obj.name();
            let pages = obj.release();
            log::debug!("shm: '{}' (fd {}) destroyed, {} pages freed", name, fd.index(), pages);
        }
        Ok(())
    }

    /// fork 钩子：把父进程打开、映射的对象复制给子进程。
    ///
    /// 子进程此时尚未运行，不会与本调用竞争。父进程打开的每个描述符在子进程中记为打开
    /// 并增加引用计数；父进程映射的每个描述符以相同基址、相同权限映射到子进程。
    ///
    /// 映射失败时整个钩子失败。已复制到子进程的状态保持一致（引用计数与子进程的
    /// 打开记录对应），调用方应通过 [`ShmDirectory::on_exit`] 拆除子进程。
    pub fn on_fork<P, C>(&self, parent: &P, child: &mut C) -> ShmResult<()>
    where
        P: ShmTask + ?Sized,
        C: ShmTask + ?Sized,
    {
        debug_assert!(child.shm_state().is_empty());
        let mut table = self.table.lock();

        for fd in parent.shm_state().open_fds() {
            let obj = table.object_mut(fd);
            debug_assert!(!obj.is_free());
            obj.get();
            child.shm_state_mut().set_open(fd);

            if let Some(mode) = parent.shm_state().map_mode(fd) {
                if let Err(err) = map_object(obj, fd, child.address_space(), mode) {
                    log::warn!(
                        "shm: fork {} -> {}: mapping fd {} failed: {:?}",
                        parent.pid(),
                        child.pid(),
                        fd.index(),
                        err
                    );
                    return Err(err.into());
                }
                child.shm_state_mut().set_mapped(fd, mode);
            }
        }
        Ok(())
    }

    /// exit 钩子：代替进程关闭它仍打开的全部描述符。
    ///
    /// 保证进程退出时解除映射、减少引用计数（必要时销毁对象）。
    /// 可以重复调用，没有打开的描述符会被跳过。
    pub fn on_exit<T: ShmTask + ?Sized>(&self, task: &mut T) {
        let open: Vec<ShmFd> = task.shm_state().open_fds().collect();
        for fd in open {
            if let Err(err) = self.close(task, fd) {
                log::warn!("shm: pid {} exit: close fd {} failed: {}", task.pid(), fd.index(), err);
            }
        }
    }

    /// 描述符对应对象的状态，槽位空闲时返回 `None`
    pub fn stat(&self, fd: ShmFd) -> Option<ShmStat> {
        let table = self.table.lock();
        let obj = table.object(fd);
        (!obj.is_free()).then(|| obj.stat())
    }

    /// 当前存在的对象数
    pub fn live_objects(&self) -> usize {
        let table = self.table.lock();
        table.objects.iter().filter(|obj| !obj.is_free()).count()
    }
}

lazy_static! {
    /// 全局共享内存目录，物理页来自已注册的 [`ShmFrameOps`]
    pub static ref SHM_DIRECTORY: ShmDirectory = ShmDirectory::new(frame_ops());
}

/// 初始化全局共享内存目录
///
/// 必须在 [`register_frame_ops`](crate::register_frame_ops) 之后调用。
pub fn init() {
    lazy_static::initialize(&SHM_DIRECTORY);
    log::info!("shm: directory ready, {} slots", SHM_MAX_OBJECTS);
}

/// 全局共享内存目录
#[inline]
pub fn shm_directory() -> &'static ShmDirectory {
    &SHM_DIRECTORY
}
