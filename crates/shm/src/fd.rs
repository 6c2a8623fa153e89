//! 共享内存描述符
//!
//! 描述符就是对象在目录中的槽位下标，是**全局**句柄：所有打开同一对象的进程
//! 拿到的都是同一个数值。它和进程私有的文件描述符表没有任何关系。

use crate::config::{PAGE_SIZE, SHM_MAX_OBJECTS, SHM_REGION_START, SHM_WINDOW_SIZE};
use crate::error::{ShmError, ShmResult};

/// 共享内存描述符（目录槽位句柄）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ShmFd(usize);

impl ShmFd {
    /// 校验用户传入的描述符值
    pub fn new(raw: isize) -> ShmResult<Self> {
        usize::try_from(raw)
            .ok()
            .and_then(Self::from_index)
            .ok_or(ShmError::BadDescriptor)
    }

    /// 由槽位下标构造，越界返回 `None`
    pub const fn from_index(index: usize) -> Option<Self> {
        if index < SHM_MAX_OBJECTS {
            Some(ShmFd(index))
        } else {
            None
        }
    }

    /// 槽位下标
    pub const fn index(self) -> usize {
        self.0
    }

    /// 返回给用户的描述符值
    pub const fn as_raw(self) -> isize {
        self.0 as isize
    }

    /// 按槽位顺序遍历全部描述符
    pub fn all() -> impl Iterator<Item = ShmFd> {
        (0..SHM_MAX_OBJECTS).map(ShmFd)
    }

    /// 该描述符在每个进程中的固定映射基址。
    ///
    /// 基址只由描述符决定，所以任意两个进程映射同一对象得到的地址相同，
    /// 各窗口互不重叠，也不需要在地址空间里查找空闲区域。
    pub const fn window_base(self) -> usize {
        SHM_REGION_START + self.0 * SHM_WINDOW_SIZE
    }

    /// 窗口内第 `page` 页的虚拟地址
    pub const fn page_vaddr(self, page: usize) -> usize {
        self.window_base() + page * PAGE_SIZE
    }
}
