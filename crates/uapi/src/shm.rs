//! 命名共享内存对象的用户可见限制

/// 共享内存对象名的最大字节数（超出部分被截断）
pub const SHM_NAME_MAX: usize = 16;

/// 系统调用失败时的统一返回值
pub const SHM_FAILED: isize = -1;
