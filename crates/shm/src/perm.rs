//! 映射权限
//!
//! `shm_map` 接受与 `open(2)` 相同的访问模式常量，只允许 `O_RDONLY` 与 `O_RDWR`。

use bitflags::bitflags;
use uapi::fcntl::{O_RDONLY, O_RDWR, O_WRONLY, access_mode};

use crate::error::{ShmError, ShmResult};

bitflags! {
    /// 交给页表映射器的权限位
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ShmPteFlags: usize {
        /// 可读
        const READABLE = 1 << 1;
        /// 可写
        const WRITEABLE = 1 << 2;
        /// 用户态可访问
        const USER_ACCESSIBLE = 1 << 4;
    }
}

/// 校验用户请求的映射模式。
///
/// 只写映射按策略拒绝：共享区域至少必须可读。
pub fn check_map_mode(mode: u32) -> ShmResult<()> {
    if access_mode(mode) == O_WRONLY {
        return Err(ShmError::WriteOnly);
    }
    if mode != O_RDONLY && mode != O_RDWR {
        return Err(ShmError::InvalidMode);
    }
    Ok(())
}

/// 将访问模式翻译为页表权限位。
///
/// # Panics
/// 传入 `O_RDONLY` / `O_RDWR` 以外的模式说明内核内部记录已损坏，直接 panic。
/// 用户传入的模式必须先经过 [`check_map_mode`]。
pub fn pte_flags_for(mode: u32) -> ShmPteFlags {
    match mode {
        O_RDONLY => ShmPteFlags::USER_ACCESSIBLE | ShmPteFlags::READABLE,
        O_RDWR => ShmPteFlags::USER_ACCESSIBLE | ShmPteFlags::READABLE | ShmPteFlags::WRITEABLE,
        _ => panic!("shm: invalid map mode {mode:#o}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_is_not_writeable() {
        let flags = pte_flags_for(O_RDONLY);
        assert!(flags.contains(ShmPteFlags::USER_ACCESSIBLE | ShmPteFlags::READABLE));
        assert!(!flags.contains(ShmPteFlags::WRITEABLE));
    }

    #[test]
    fn test_read_write_adds_writeable() {
        assert_eq!(
            pte_flags_for(O_RDWR),
            pte_flags_for(O_RDONLY) | ShmPteFlags::WRITEABLE
        );
    }

    #[test]
    fn test_check_map_mode() {
        assert_eq!(check_map_mode(O_RDONLY), Ok(()));
        assert_eq!(check_map_mode(O_RDWR), Ok(()));
        assert_eq!(check_map_mode(O_WRONLY), Err(ShmError::WriteOnly));
        assert_eq!(check_map_mode(0o3), Err(ShmError::InvalidMode));
        assert_eq!(check_map_mode(O_RDWR | 0o100), Err(ShmError::InvalidMode));
    }

    #[test]
    #[should_panic(expected = "invalid map mode")]
    fn test_translation_rejects_write_only() {
        let _ = pte_flags_for(O_WRONLY);
    }
}
