//! 内存管理相关操作的 Mock 实现
//!
//! - [`MockFrameAllocator`]：用堆上的页数组模拟物理内存，可设置可分配帧数上限
//! - [`MockAddressSpace`]：记录“虚拟页 -> 物理帧”的页表项，并按权限模拟用户访问
//!
//! 注意：这里不直接依赖 `shm` crate（避免循环依赖）。
//! `shm` crate 在 `cfg(test)` 下为这些类型实现其 trait。

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Mock 页大小
pub const MOCK_PAGE_SIZE: usize = 4096;

/// 第一个 mock 物理帧的页号
pub const MOCK_BASE_PPN: usize = 0x8_0000;

/// 新分配帧的填充字节，用于检查调用方是否清零
pub const MOCK_DIRTY_BYTE: u8 = 0xAA;

struct PhysMem {
    frames: Vec<Option<Box<[u8; MOCK_PAGE_SIZE]>>>,
    live: usize,
    limit: usize,
    total_allocs: usize,
}

/// Mock 物理帧分配器
pub struct MockFrameAllocator {
    mem: Mutex<PhysMem>,
}

impl MockFrameAllocator {
    /// 不限帧数的分配器
    pub fn new() -> Self {
        Self::with_limit(usize::MAX)
    }

    /// 最多同时存在 `limit` 个已分配帧的分配器
    pub fn with_limit(limit: usize) -> Self {
        Self {
            mem: Mutex::new(PhysMem {
                frames: Vec::new(),
                live: 0,
                limit,
                total_allocs: 0,
            }),
        }
    }

    fn mem(&self) -> MutexGuard<'_, PhysMem> {
        self.mem.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 调整可同时存在的帧数上限
    pub fn set_limit(&self, limit: usize) {
        self.mem().limit = limit;
    }

    /// 分配一个帧，返回物理页号；达到上限时返回 `None`
    pub fn alloc(&self) -> Option<usize> {
        let mut mem = self.mem();
        if mem.live >= mem.limit {
            return None;
        }
        let page = Box::new([MOCK_DIRTY_BYTE; MOCK_PAGE_SIZE]);
        let idx = match mem.frames.iter().position(Option::is_none) {
            Some(idx) => {
                mem.frames[idx] = Some(page);
                idx
            }
            None => {
                mem.frames.push(Some(page));
                mem.frames.len() - 1
            }
        };
        mem.live += 1;
        mem.total_allocs += 1;
        Some(MOCK_BASE_PPN + idx)
    }

    /// 回收一个帧
    ///
    /// # Panics
    /// 回收未分配的帧（重复释放）时 panic
    pub fn dealloc(&self, ppn: usize) {
        let mut mem = self.mem();
        let slot = mem
            .frames
            .get_mut(ppn - MOCK_BASE_PPN)
            .expect("mock dealloc: frame out of range");
        assert!(slot.is_some(), "mock dealloc: double free of ppn {ppn:#x}");
        *slot = None;
        mem.live -= 1;
    }

    /// 将帧清零
    pub fn zero(&self, ppn: usize) {
        self.with_frame(ppn, |page| page.fill(0));
    }

    /// 从帧内 `offset` 处读出 `buf.len()` 字节
    pub fn read(&self, ppn: usize, offset: usize, buf: &mut [u8]) {
        self.with_frame(ppn, |page| buf.copy_from_slice(&page[offset..offset + buf.len()]));
    }

    /// 向帧内 `offset` 处写入数据
    pub fn write(&self, ppn: usize, offset: usize, data: &[u8]) {
        self.with_frame(ppn, |page| page[offset..offset + data.len()].copy_from_slice(data));
    }

    fn with_frame<R>(&self, ppn: usize, f: impl FnOnce(&mut [u8; MOCK_PAGE_SIZE]) -> R) -> R {
        let mut mem = self.mem();
        let page = mem
            .frames
            .get_mut(ppn - MOCK_BASE_PPN)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("mock frame {ppn:#x} is not allocated"));
        f(page)
    }

    /// 帧当前是否处于已分配状态
    pub fn is_allocated(&self, ppn: usize) -> bool {
        ppn >= MOCK_BASE_PPN
            && self
                .mem()
                .frames
                .get(ppn - MOCK_BASE_PPN)
                .is_some_and(Option::is_some)
    }

    /// 当前已分配的帧数
    pub fn live_frames(&self) -> usize {
        self.mem().live
    }

    /// 累计成功分配的次数
    pub fn total_allocs(&self) -> usize {
        self.mem().total_allocs
    }
}

impl Default for MockFrameAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock 页表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPte {
    /// 映射到的物理页号
    pub ppn: usize,
    /// 本次映射声明的字节数（最后一页可能不足一页）
    pub len: usize,
    /// 用户态可访问
    pub user: bool,
    /// 可读
    pub readable: bool,
    /// 可写
    pub writable: bool,
}

/// Mock 映射失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMapError {
    /// 虚拟页已有映射
    AlreadyMapped,
    /// 地址未按页对齐或长度非法
    InvalidAddress,
    /// 由 [`MockAddressSpace::fail_map_after`] 注入的失败
    Injected,
}

/// Mock 用户访问异常
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    /// 缺页：地址没有映射
    NotMapped,
    /// 权限异常：例如写只读页
    ProtectionViolation,
}

/// Mock 用户地址空间
#[derive(Debug, Default)]
pub struct MockAddressSpace {
    ptes: BTreeMap<usize, MockPte>,
    /// 剩余允许成功的映射次数，`None` 表示不限
    fail_after: Option<usize>,
}

impl MockAddressSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// 之后再成功映射 `n` 页，第 `n + 1` 次映射返回 [`MockMapError::Injected`]
    pub fn fail_map_after(&mut self, n: usize) {
        self.fail_after = Some(n);
    }

    /// 在 `vaddr` 处建立一页映射
    pub fn map(&mut self, vaddr: usize, pte: MockPte) -> Result<(), MockMapError> {
        if vaddr % MOCK_PAGE_SIZE != 0 || pte.len == 0 || pte.len > MOCK_PAGE_SIZE {
            return Err(MockMapError::InvalidAddress);
        }
        if self.ptes.contains_key(&vaddr) {
            return Err(MockMapError::AlreadyMapped);
        }
        match self.fail_after {
            Some(0) => return Err(MockMapError::Injected),
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        self.ptes.insert(vaddr, pte);
        Ok(())
    }

    /// 解除 `vaddr` 处的映射，返回原页表项
    pub fn unmap(&mut self, vaddr: usize) -> Option<MockPte> {
        self.ptes.remove(&vaddr)
    }

    /// 查询包含 `vaddr` 的页的页表项
    pub fn pte(&self, vaddr: usize) -> Option<MockPte> {
        self.ptes.get(&(vaddr & !(MOCK_PAGE_SIZE - 1))).copied()
    }

    /// 已映射的页数
    pub fn mapped_pages(&self) -> usize {
        self.ptes.len()
    }

    fn translate(&self, vaddr: usize, write: bool) -> Result<(usize, usize), MockFault> {
        let offset = vaddr % MOCK_PAGE_SIZE;
        let pte = self.pte(vaddr).ok_or(MockFault::NotMapped)?;
        if !pte.user || !pte.readable || (write && !pte.writable) {
            return Err(MockFault::ProtectionViolation);
        }
        Ok((pte.ppn, offset))
    }

    /// 以用户态身份读取 `vaddr` 处的 u32（不允许跨页）
    pub fn load_u32(&self, mem: &MockFrameAllocator, vaddr: usize) -> Result<u32, MockFault> {
        let (ppn, offset) = self.translate(vaddr, false)?;
        let mut buf = [0u8; 4];
        mem.read(ppn, offset, &mut buf);
        Ok(u32::from_ne_bytes(buf))
    }

    /// 以用户态身份向 `vaddr` 写入 u32（不允许跨页）
    pub fn store_u32(
        &self,
        mem: &MockFrameAllocator,
        vaddr: usize,
        value: u32,
    ) -> Result<(), MockFault> {
        let (ppn, offset) = self.translate(vaddr, true)?;
        mem.write(ppn, offset, &value.to_ne_bytes());
        Ok(())
    }
}
