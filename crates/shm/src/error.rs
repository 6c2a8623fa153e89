//! 共享内存错误类型
//!
//! 系统调用层把所有错误统一折算为 `-1`，这里的区分主要服务于日志和测试。

use core::fmt;

use crate::space::PagingError;

/// 共享内存操作错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmError {
    // 用法错误
    /// 描述符越界或为负
    BadDescriptor,
    /// 描述符对应的槽位空闲
    NotInUse,
    /// 调用进程没有打开该描述符
    NotOpen,
    /// 调用进程已经映射过该描述符
    AlreadyMapped,
    /// 请求只写映射
    WriteOnly,
    /// 无法识别的访问模式
    InvalidMode,
    /// 对象名为空
    InvalidName,
    /// 请求的大小为负
    InvalidSize,

    // 资源耗尽
    /// 目录已满
    DirectoryFull,
    /// 请求的大小超过单对象页数上限
    TooLarge,
    /// 物理帧分配失败
    OutOfMemory,

    /// 页表映射失败
    Paging(PagingError),
}

impl From<PagingError> for ShmError {
    fn from(err: PagingError) -> Self {
        ShmError::Paging(err)
    }
}

impl fmt::Display for ShmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShmError::BadDescriptor => f.write_str("bad descriptor"),
            ShmError::NotInUse => f.write_str("object not in use"),
            ShmError::NotOpen => f.write_str("descriptor not open in this process"),
            ShmError::AlreadyMapped => f.write_str("already mapped in this process"),
            ShmError::WriteOnly => f.write_str("write-only mapping requested"),
            ShmError::InvalidMode => f.write_str("invalid access mode"),
            ShmError::InvalidName => f.write_str("invalid object name"),
            ShmError::InvalidSize => f.write_str("invalid size"),
            ShmError::DirectoryFull => f.write_str("directory full"),
            ShmError::TooLarge => f.write_str("size exceeds page limit"),
            ShmError::OutOfMemory => f.write_str("out of physical frames"),
            ShmError::Paging(err) => write!(f, "paging error: {err:?}"),
        }
    }
}

/// 共享内存操作的结果类型
pub type ShmResult<T> = Result<T, ShmError>;
