//! 自旋锁封装
//!
//! 提供对数据的互斥访问的自旋锁。
//!
//! # 示例
//! ```ignore
//! let lock = SpinLock::new(0);
//! {
//!     let mut guard = lock.lock(); // 获取锁，关闭中断
//!     *guard += 1;
//! } // 离开作用域，释放锁并恢复中断状态
//! ```
//!
//! # 注意
//! SpinLock 不是可重入的，持锁期间再次获取同一把锁会死锁。
//! 持锁期间中断处于关闭状态，临界区内不应执行长时间运行或可能睡眠的操作。

use crate::raw_spin_lock::RawSpinLock;

/// 提供对数据的互斥访问的关中断自旋锁。
pub type SpinLock<T> = lock_api::Mutex<RawSpinLock, T>;

/// SpinLock 的 RAII 保护器，离开作用域时释放锁。
pub type SpinLockGuard<'a, T> = lock_api::MutexGuard<'a, RawSpinLock, T>;
