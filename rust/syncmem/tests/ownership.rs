//! Release of owned and borrowed regions.

mod common;

use common::{Fixture, SIZE};
use syncmem::SyncedHead;

#[test]
fn test_owned_host_freed_once_on_drop() {
    let fx = Fixture::new();
    let mut mem = fx.memory(SIZE);
    let ptr = mem.write_host().as_ptr();
    assert!(fx.allocator.is_live(ptr));
    drop(mem);
    assert_eq!(fx.allocator.allocations(), 1);
    assert_eq!(fx.allocator.frees(), 1);
    assert_eq!(fx.allocator.live(), 0);
}

#[test]
fn test_borrowed_host_survives_drop() {
    let fx = Fixture::new();
    let mut external = vec![3u8; SIZE];
    {
        let mut mem = fx.memory(SIZE);
        mem.attach_host(&mut external);
        mem.write_host()[0] = 4;
        mem.read_device();
    }
    assert_eq!(external[0], 4);
    assert!(external[1..].iter().all(|&b| b == 3));
    assert_eq!(fx.allocator.allocations(), 0);
    assert_eq!(fx.allocator.frees(), 0);
    assert_eq!(fx.device.live_allocations(), 0);
}

#[test]
fn test_attach_host_releases_owned_region() {
    let fx = Fixture::new();
    let mut external = vec![0u8; SIZE];
    let mut mem = fx.memory(SIZE);
    mem.write_host().fill(1);
    assert!(mem.owns_host());

    mem.attach_host(&mut external);
    assert!(!mem.owns_host());
    assert_eq!(fx.allocator.frees(), 1);
    assert_eq!(fx.allocator.live(), 0);
    assert_eq!(mem.head(), SyncedHead::HeadAtHost);
    // Attached bytes are taken as the contents; nothing is copied over them.
    assert!(mem.read_host().iter().all(|&b| b == 0));

    drop(mem);
    assert_eq!(fx.allocator.frees(), 1);
}

#[test]
fn test_attach_host_replaces_previous_attachment() {
    let fx = Fixture::new();
    let mut first = vec![1u8; SIZE];
    let mut second = vec![2u8; SIZE];
    let second_ptr = second.as_ptr();
    let mut mem = fx.memory(SIZE);

    mem.attach_host(&mut first);
    mem.attach_host(&mut second);
    assert_eq!(mem.read_host().as_ptr(), second_ptr);
    assert_eq!(fx.allocator.allocations(), 0);
}

#[test]
fn test_device_memory_freed_on_drop() {
    let fx = Fixture::new();
    let mut mem = fx.memory(SIZE);
    mem.write_host().fill(9);
    mem.read_device();
    assert_eq!(fx.device.live_allocations(), 1);
    drop(mem);
    assert_eq!(fx.device.live_allocations(), 0);
    assert_eq!(fx.device.stats().frees, 1);
}

#[test]
fn test_owned_optimized_freed_on_drop() {
    let fx = Fixture::new();
    let mut mem = fx.memory(SIZE);
    mem.write_host().fill(1);
    mem.init_optimized();
    assert!(mem.owns_optimized());
    assert_eq!(fx.allocator.live(), 2);
    drop(mem);
    assert_eq!(fx.allocator.frees(), 2);
    assert_eq!(fx.allocator.live(), 0);
}

#[test]
fn test_attach_optimized_releases_owned_region() {
    let fx = Fixture::new();
    let mut external = vec![0u8; SIZE];
    let mut mem = fx.memory(SIZE);
    mem.init_optimized();
    assert_eq!(fx.allocator.live(), 1);

    mem.attach_optimized(&mut external, true);
    assert!(!mem.owns_optimized());
    assert_eq!(fx.allocator.live(), 0);
    assert_eq!(mem.head(), SyncedHead::HeadAtOptimized);
}

#[test]
fn test_drop_does_not_convert_or_copy() {
    let fx = Fixture::new();
    let mut optimized = vec![0u8; SIZE];
    {
        let mut mem = fx.memory(SIZE);
        mem.write_host().fill(1);
        mem.read_device();
        mem.attach_optimized(&mut optimized, false);
    }
    assert_eq!(fx.conversions(), 0);
    assert_eq!(fx.device.stats().copies(), 1);
    assert_eq!(fx.device.live_allocations(), 0);
    assert_eq!(fx.allocator.live(), 0);
}

#[test]
fn test_unused_buffer_allocates_nothing() {
    let fx = Fixture::new();
    let mem = fx.memory(1 << 20);
    assert_eq!(mem.head(), SyncedHead::Uninitialized);
    drop(mem);
    assert_eq!(fx.allocator.allocations(), 0);
    assert_eq!(fx.device.stats().allocations, 0);
}
