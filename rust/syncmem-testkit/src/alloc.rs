//! Instrumented host allocator.

use std::{
    alloc::Layout,
    collections::HashSet,
    ptr::NonNull,
    sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};

use syncmem_page_alloc::{HostAllocator, LargePageAllocator};

/// Wraps a [`LargePageAllocator`], counting allocations and frees.
///
/// Freeing a pointer this allocator did not hand out (or freeing it twice) panics,
/// which makes ownership mistakes visible in tests. Allocation failure can be
/// injected with [`CountingAllocator::set_fail`].
#[derive(Debug)]
pub struct CountingAllocator {
    inner: LargePageAllocator,
    allocations: AtomicUsize,
    frees: AtomicUsize,
    fail: AtomicBool,
    live: Mutex<HashSet<usize>>,
}

impl CountingAllocator {
    pub fn new() -> CountingAllocator {
        CountingAllocator {
            inner: LargePageAllocator::new(false),
            allocations: AtomicUsize::new(0),
            frees: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
            live: Mutex::new(HashSet::new()),
        }
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Relaxed)
    }

    pub fn frees(&self) -> usize {
        self.frees.load(Ordering::Relaxed)
    }

    /// Blocks handed out and not yet returned.
    pub fn live(&self) -> usize {
        self.live.lock().unwrap().len()
    }

    /// Whether `ptr` is the start of a live block of this allocator.
    pub fn is_live(&self, ptr: *const u8) -> bool {
        self.live.lock().unwrap().contains(&(ptr as usize))
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::Relaxed);
    }
}

impl Default for CountingAllocator {
    fn default() -> Self {
        CountingAllocator::new()
    }
}

unsafe impl HostAllocator for CountingAllocator {
    fn allocate(&self, layout: Layout) -> std::io::Result<NonNull<u8>> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                "injected allocation failure",
            ));
        }
        let ptr = self.inner.allocate(layout)?;
        self.allocations.fetch_add(1, Ordering::Relaxed);
        self.live.lock().unwrap().insert(ptr.as_ptr() as usize);
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        let known = self.live.lock().unwrap().remove(&(ptr.as_ptr() as usize));
        assert!(known, "freeing memory not owned by this allocator: {ptr:?}");
        self.frees.fetch_add(1, Ordering::Relaxed);
        unsafe { self.inner.deallocate(ptr, layout) }
    }
}
