//! `HostAllocator`: the source of host-resident memory for synchronized buffers.

use std::{
    alloc::Layout,
    ptr::NonNull,
    sync::{Arc, OnceLock},
};

use crate::pages;

/// Default alignment of host allocations: one 2MB large page.
pub const DEFAULT_HOST_ALIGNMENT: usize = 2 * 1024 * 1024;

/// A provider of zero-initialized host memory.
///
/// # Safety
///
/// Implementors must guarantee that:
/// - A successful `allocate(layout)` returns a pointer to `layout.size()` writable,
///   zero-initialized bytes, aligned to at least `layout.align()`.
/// - The memory stays valid until it is passed back to `deallocate` with the same
///   layout.
/// - `allocate` never returns a dangling or null pointer on success.
pub unsafe trait HostAllocator: Send + Sync + std::fmt::Debug {
    /// Allocates a zeroed memory block described by `layout`.
    ///
    /// `layout.size()` is never zero.
    fn allocate(&self, layout: Layout) -> std::io::Result<NonNull<u8>>;

    /// Releases a block previously returned by [`HostAllocator::allocate`].
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate` on this allocator with the same `layout`,
    /// and must not be used afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);
}

/// Allocates host memory through the global allocator with large page alignment.
///
/// When `advise_huge_pages` is set, regions spanning at least one large page are
/// additionally advised for transparent huge page backing (Linux only).
#[derive(Debug, Clone)]
pub struct LargePageAllocator {
    advise_huge_pages: bool,
}

impl LargePageAllocator {
    pub fn new(advise_huge_pages: bool) -> LargePageAllocator {
        LargePageAllocator { advise_huge_pages }
    }

    /// Process-wide instance with huge page advice enabled.
    pub fn shared() -> Arc<dyn HostAllocator> {
        static SHARED: OnceLock<Arc<LargePageAllocator>> = OnceLock::new();
        SHARED
            .get_or_init(|| Arc::new(LargePageAllocator::new(true)))
            .clone()
    }

    #[inline]
    pub fn advises_huge_pages(&self) -> bool {
        self.advise_huge_pages
    }
}

impl Default for LargePageAllocator {
    fn default() -> Self {
        LargePageAllocator::new(true)
    }
}

unsafe impl HostAllocator for LargePageAllocator {
    fn allocate(&self, layout: Layout) -> std::io::Result<NonNull<u8>> {
        debug_assert_ne!(layout.size(), 0);
        let ptr = unsafe { std::alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::OutOfMemory,
                format!("failed to allocate {} bytes", layout.size()),
            )
        })?;

        let large_page = pages::get_large_page_size();
        if self.advise_huge_pages
            && layout.size() >= large_page
            && (ptr.as_ptr() as usize).is_multiple_of(large_page)
        {
            let advised = layout.size() & !(large_page - 1);
            if let Err(e) = unsafe { pages::advise_huge_pages(ptr.as_ptr(), advised) } {
                log::trace!("huge page advice for {advised} bytes ignored: {e}");
            }
        }
        Ok(ptr)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
