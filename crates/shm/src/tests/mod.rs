// Scenario tests for the shared-memory directory.
//
// Every test builds its own `ShmDirectory` on top of a leaked `MockFrameAllocator`, so tests
// never observe each other's objects. Only `syscall.rs` goes through the global directory.

extern crate std;
extern crate test_support;

use core::sync::atomic::{AtomicUsize, Ordering};
use std::boxed::Box;
use std::sync::OnceLock;

use sync::ArchOps;
use test_support::mock::mm::{MockAddressSpace, MockFault, MockFrameAllocator};

use crate::{ShmAddressSpace, ShmDirectory, ShmFrameOps, ShmProcState, ShmTask};

mod lifecycle;

struct DummyArchOps;

impl ArchOps for DummyArchOps {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        0
    }

    unsafe fn restore_interrupts(&self, _flags: usize) {}

    fn interrupts_enabled(&self, _flags: usize) -> bool {
        false
    }
}

static DUMMY_ARCH_OPS: DummyArchOps = DummyArchOps;
// 0 = uninit, 1 = initializing, 2 = ready
static SYNC_INIT: AtomicUsize = AtomicUsize::new(0);

fn init_sync_arch_ops() {
    match SYNC_INIT.compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire) {
        Ok(_) => {
            // Safety: tests use a single global dummy ArchOps.
            unsafe { sync::register_arch_ops(&DUMMY_ARCH_OPS) };
            SYNC_INIT.store(2, Ordering::Release);
        }
        Err(_) => {
            while SYNC_INIT.load(Ordering::Acquire) != 2 {
                core::hint::spin_loop();
            }
        }
    }
}

/// Frame allocator behind the global directory while no real one is registered.
pub(crate) fn global_frames() -> &'static dyn ShmFrameOps {
    static FRAMES: OnceLock<MockFrameAllocator> = OnceLock::new();
    FRAMES.get_or_init(MockFrameAllocator::new)
}

/// A process as seen by the directory: its shm bookkeeping plus a mock page table.
pub(super) struct TestTask {
    pid: usize,
    state: ShmProcState,
    space: MockAddressSpace,
}

impl TestTask {
    pub(super) fn new(pid: usize) -> Self {
        Self {
            pid,
            state: ShmProcState::new(),
            space: MockAddressSpace::new(),
        }
    }

    pub(super) fn space(&self) -> &MockAddressSpace {
        &self.space
    }

    pub(super) fn space_mut(&mut self) -> &mut MockAddressSpace {
        &mut self.space
    }

    pub(super) fn load(&self, mem: &MockFrameAllocator, vaddr: usize) -> Result<u32, MockFault> {
        self.space.load_u32(mem, vaddr)
    }

    pub(super) fn store(
        &self,
        mem: &MockFrameAllocator,
        vaddr: usize,
        value: u32,
    ) -> Result<(), MockFault> {
        self.space.store_u32(mem, vaddr, value)
    }
}

impl ShmTask for TestTask {
    fn pid(&self) -> usize {
        self.pid
    }

    fn shm_state(&self) -> &ShmProcState {
        &self.state
    }

    fn shm_state_mut(&mut self) -> &mut ShmProcState {
        &mut self.state
    }

    fn address_space(&mut self) -> &mut dyn ShmAddressSpace {
        &mut self.space
    }
}

/// An isolated directory with its own physical memory.
pub(super) struct Harness {
    pub(super) mem: &'static MockFrameAllocator,
    pub(super) dir: ShmDirectory,
}

impl Harness {
    pub(super) fn new() -> Self {
        Self::with_frame_limit(usize::MAX)
    }

    pub(super) fn with_frame_limit(limit: usize) -> Self {
        init_sync_arch_ops();
        let mem: &'static MockFrameAllocator =
            Box::leak(Box::new(MockFrameAllocator::with_limit(limit)));
        Self {
            mem,
            dir: ShmDirectory::new(mem),
        }
    }
}
