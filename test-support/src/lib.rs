//! 测试支持 crate
//!
//! 提供宿主机单元测试使用的 Mock 实现。各内核 crate 在 `cfg(test)` 下
//! 为这些类型实现自己的 trait，本 crate 不反向依赖它们（避免循环依赖）。

pub mod mock;
