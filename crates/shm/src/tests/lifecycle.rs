use uapi::fcntl::{O_RDONLY, O_RDWR};

use super::*;
use crate::{PAGE_SIZE, PagingError, ShmError};

#[test]
fn test_fork_inherits_open_and_mapped() {
    let h = Harness::new();
    let mut parent = TestTask::new(1);

    let mapped = h.dir.open(&mut parent, "/mapped").unwrap();
    let opened = h.dir.open(&mut parent, "/opened").unwrap();
    h.dir.trunc(mapped, PAGE_SIZE + 4).unwrap();
    let base = h.dir.map(&mut parent, mapped, O_RDWR).unwrap();
    parent.store(h.mem, base + PAGE_SIZE, 99).unwrap();

    let mut child = TestTask::new(2);
    h.dir.on_fork(&parent, &mut child).unwrap();

    assert!(child.shm_state().is_open(mapped));
    assert!(child.shm_state().is_open(opened));
    assert_eq!(child.shm_state().map_mode(mapped), Some(O_RDWR));
    assert!(!child.shm_state().is_mapped(opened));
    assert_eq!(h.dir.stat(mapped).unwrap().ref_count, 2);
    assert_eq!(h.dir.stat(opened).unwrap().ref_count, 2);

    // 同一地址、同一物理页
    assert_eq!(child.space().pte(base), parent.space().pte(base));
    assert_eq!(child.load(h.mem, base + PAGE_SIZE), Ok(99));
    child.store(h.mem, base, 3).unwrap();
    assert_eq!(parent.load(h.mem, base), Ok(3));
}

#[test]
fn test_fork_preserves_read_only() {
    let h = Harness::new();
    let mut parent = TestTask::new(1);
    let fd = h.dir.open(&mut parent, "/ro-fork").unwrap();
    h.dir.trunc(fd, 4).unwrap();
    let base = h.dir.map(&mut parent, fd, O_RDONLY).unwrap();

    let mut child = TestTask::new(2);
    h.dir.on_fork(&parent, &mut child).unwrap();

    assert_eq!(child.shm_state().map_mode(fd), Some(O_RDONLY));
    assert_eq!(child.load(h.mem, base), Ok(0));
    assert_eq!(child.store(h.mem, base, 1), Err(MockFault::ProtectionViolation));
}

#[test]
fn test_fork_of_process_without_objects() {
    let h = Harness::new();
    let parent = TestTask::new(1);
    let mut child = TestTask::new(2);

    h.dir.on_fork(&parent, &mut child).unwrap();
    assert!(child.shm_state().is_empty());
    assert_eq!(child.space().mapped_pages(), 0);
}

#[test]
fn test_fork_mapping_failure_then_exit() {
    let h = Harness::new();
    let mut parent = TestTask::new(1);
    let fd = h.dir.open(&mut parent, "/fork-fail").unwrap();
    h.dir.trunc(fd, 3 * PAGE_SIZE).unwrap();
    h.dir.map(&mut parent, fd, O_RDWR).unwrap();

    let mut child = TestTask::new(2);
    child.space_mut().fail_map_after(1);
    assert_eq!(
        h.dir.on_fork(&parent, &mut child),
        Err(ShmError::Paging(PagingError::OutOfMemory))
    );
    assert_eq!(child.space().mapped_pages(), 0);
    assert!(child.shm_state().is_open(fd));
    assert!(!child.shm_state().is_mapped(fd));
    assert_eq!(h.dir.stat(fd).unwrap().ref_count, 2);

    // 调用方拆除半成品子进程
    h.dir.on_exit(&mut child);
    assert!(child.shm_state().is_empty());
    assert_eq!(h.dir.stat(fd).unwrap().ref_count, 1);
    assert_eq!(parent.space().mapped_pages(), 3);
}

#[test]
fn test_exit_closes_everything() {
    let h = Harness::new();
    let mut p = TestTask::new(1);

    let a = h.dir.open(&mut p, "/exit-a").unwrap();
    let b = h.dir.open(&mut p, "/exit-b").unwrap();
    h.dir.trunc(a, 2 * PAGE_SIZE).unwrap();
    h.dir.trunc(b, 1).unwrap();
    h.dir.map(&mut p, a, O_RDWR).unwrap();
    assert_eq!(h.mem.live_frames(), 3);

    h.dir.on_exit(&mut p);

    assert!(p.shm_state().is_empty());
    assert_eq!(p.space().mapped_pages(), 0);
    assert_eq!(h.dir.live_objects(), 0);
    assert_eq!(h.mem.live_frames(), 0);

    // 再次调用不做任何事
    h.dir.on_exit(&mut p);
    assert_eq!(h.dir.live_objects(), 0);
}

#[test]
fn test_exit_leaves_shared_objects_alive() {
    let h = Harness::new();
    let mut p = TestTask::new(1);
    let mut q = TestTask::new(2);

    let fd = h.dir.open(&mut p, "/survivor").unwrap();
    h.dir.open(&mut q, "/survivor").unwrap();
    h.dir.trunc(fd, 16).unwrap();
    let base = h.dir.map(&mut p, fd, O_RDWR).unwrap();
    p.store(h.mem, base + 8, 11).unwrap();

    h.dir.on_exit(&mut p);

    let stat = h.dir.stat(fd).unwrap();
    assert_eq!(stat.ref_count, 1);
    assert_eq!(stat.size, 16);
    let qbase = h.dir.map(&mut q, fd, O_RDONLY).unwrap();
    assert_eq!(q.load(h.mem, qbase + 8), Ok(11));
}

#[test]
fn test_fork_then_exit_both() {
    let h = Harness::new();
    let mut parent = TestTask::new(1);
    let fd = h.dir.open(&mut parent, "/family").unwrap();
    h.dir.trunc(fd, PAGE_SIZE).unwrap();
    h.dir.map(&mut parent, fd, O_RDWR).unwrap();

    let mut child = TestTask::new(2);
    h.dir.on_fork(&parent, &mut child).unwrap();

    h.dir.on_exit(&mut parent);
    assert_eq!(h.dir.stat(fd).unwrap().ref_count, 1);
    assert_eq!(h.mem.live_frames(), 1);

    h.dir.on_exit(&mut child);
    assert_eq!(h.dir.stat(fd), None);
    assert_eq!(h.mem.live_frames(), 0);
}
