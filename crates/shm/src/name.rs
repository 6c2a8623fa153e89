//! 定宽对象名
//!
//! 对象名是目录的唯一键：固定 [`SHM_NAME_LEN`] 字节，不足部分补零，
//! 首字节为零表示槽位空闲。

use core::fmt;

use crate::config::SHM_NAME_LEN;
use crate::error::{ShmError, ShmResult};

/// 共享内存对象名
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct ShmName([u8; SHM_NAME_LEN]);

impl ShmName {
    /// 空名，表示空闲槽位
    pub const EMPTY: ShmName = ShmName([0; SHM_NAME_LEN]);

    /// 由用户传入的名字构造键。
    ///
    /// 名字在第一个 NUL 处结束，超过 [`SHM_NAME_LEN`] 的部分被截断；
    /// 截断后为空的名字会被拒绝，否则它会和空闲槽位无法区分。
    pub fn new(name: &str) -> ShmResult<Self> {
        let bytes = name.as_bytes();
        let len = bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(bytes.len())
            .min(SHM_NAME_LEN);
        if len == 0 {
            return Err(ShmError::InvalidName);
        }
        let mut key = [0u8; SHM_NAME_LEN];
        key[..len].copy_from_slice(&bytes[..len]);
        Ok(ShmName(key))
    }

    /// 是否为空名
    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    /// 去掉填充零之后的字节
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(SHM_NAME_LEN);
        &self.0[..len]
    }
}

impl fmt::Debug for ShmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ShmName").field(&format_args!("{self}")).finish()
    }
}

impl fmt::Display for ShmName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.as_bytes().utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}
