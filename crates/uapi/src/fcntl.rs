//! `open(2)` 风格的访问模式
//!
//! 共享内存的 `shm_map` 复用这些常量描述映射权限，数值与 Linux 保持一致。

pub const O_RDONLY: u32 = 0o0;
pub const O_WRONLY: u32 = 0o1;
pub const O_RDWR: u32 = 0o2;
/// 访问模式掩码
pub const O_ACCMODE: u32 = 0o3;

/// 取出标志中的访问模式部分
#[inline]
pub const fn access_mode(flags: u32) -> u32 {
    flags & O_ACCMODE
}
