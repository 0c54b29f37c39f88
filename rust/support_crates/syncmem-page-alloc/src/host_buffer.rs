//! Owned, aligned host memory region.
//!
//! `HostBuffer` keeps a handle to the [`HostAllocator`] it came from and returns the
//! memory to that allocator exactly once, on drop.

use std::{alloc::Layout, ptr::NonNull, sync::Arc};

use crate::allocator::{DEFAULT_HOST_ALIGNMENT, HostAllocator, LargePageAllocator};

/// A zero-initialized, fixed-length region of host memory.
pub struct HostBuffer {
    /// Start of the allocated block.
    ptr: NonNull<u8>,
    /// The requested length in bytes. May be zero even though the underlying
    /// block always spans at least one byte.
    len: usize,
    /// Layout passed to the allocator, needed to release the block.
    layout: Layout,
    allocator: Arc<dyn HostAllocator>,
}

impl HostBuffer {
    /// Allocates `len` zeroed bytes aligned to [`DEFAULT_HOST_ALIGNMENT`] using the
    /// shared [`LargePageAllocator`].
    pub fn allocate(len: usize) -> std::io::Result<HostBuffer> {
        Self::allocate_in(LargePageAllocator::shared(), len, DEFAULT_HOST_ALIGNMENT)
    }

    /// Allocates `len` zeroed bytes aligned to `alignment` from `allocator`.
    ///
    /// # Errors
    ///
    /// Returns an error if `alignment` is not a power of two, if the rounded size
    /// overflows, or if the allocator cannot satisfy the request.
    pub fn allocate_in(
        allocator: Arc<dyn HostAllocator>,
        len: usize,
        alignment: usize,
    ) -> std::io::Result<HostBuffer> {
        let layout = Layout::from_size_align(len.max(1), alignment).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid host layout (len {len}, alignment {alignment}): {e}"),
            )
        })?;
        let ptr = allocator.allocate(layout)?;
        debug_assert!((ptr.as_ptr() as usize).is_multiple_of(alignment));
        Ok(HostBuffer {
            ptr,
            len,
            layout,
            allocator,
        })
    }

    /// Allocates a buffer of the same length as `data` and copies `data` into it.
    pub fn copy_from_slice_in(
        allocator: Arc<dyn HostAllocator>,
        data: &[u8],
        alignment: usize,
    ) -> std::io::Result<HostBuffer> {
        let mut buf = Self::allocate_in(allocator, data.len(), alignment)?;
        buf.as_bytes_mut().copy_from_slice(data);
        Ok(buf)
    }

    /// Returns the length of the buffer in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the alignment the buffer was allocated with.
    #[inline]
    pub fn alignment(&self) -> usize {
        self.layout.align()
    }

    /// Returns a raw pointer to the beginning of the buffer.
    ///
    /// The pointer is valid for `len()` bytes for as long as the buffer is alive.
    #[inline]
    pub fn ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Reinterprets the buffer as a slice of `T`.
    ///
    /// # Panics
    ///
    /// Panics if `len()` is not a multiple of `size_of::<T>()`, or if the buffer
    /// alignment is smaller than the alignment of `T`.
    #[inline]
    pub fn as_slice<T>(&self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::cast_slice(self.as_bytes())
    }

    /// Reinterprets the buffer as a mutable slice of `T`.
    ///
    /// # Panics
    ///
    /// Same conditions as [`HostBuffer::as_slice`].
    #[inline]
    pub fn as_mut_slice<T>(&mut self) -> &mut [T]
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        bytemuck::cast_slice_mut(self.as_bytes_mut())
    }
}

impl std::ops::Deref for HostBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.as_bytes()
    }
}

impl std::ops::DerefMut for HostBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_bytes_mut()
    }
}

impl AsRef<[u8]> for HostBuffer {
    #[inline]
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl AsMut<[u8]> for HostBuffer {
    #[inline]
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_bytes_mut()
    }
}

impl Drop for HostBuffer {
    fn drop(&mut self) {
        unsafe { self.allocator.deallocate(self.ptr, self.layout) };
    }
}

// SAFETY: HostBuffer exclusively owns its memory block, and the allocator handle is
// itself Send + Sync.
unsafe impl Send for HostBuffer {}

// SAFETY: shared access only hands out immutable byte views.
unsafe impl Sync for HostBuffer {}

impl std::fmt::Debug for HostBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .field("alignment", &self.layout.align())
            .finish()
    }
}
