//! Device memory backend abstraction.
//!
//! The accelerator runtime (CUDA, Vulkan, an emulator...) plugs in through
//! [`DeviceBackend`]. Each backend keeps its own error domain via the associated
//! `Error` type; [`DeviceMemory`] maps those errors into the allocation and copy
//! failures of [`syncmem_common::Error`].

use std::sync::Arc;

use syncmem_common::{CopyDirection, Error, Result};

/// Allocation and transfer primitives of an accelerator.
///
/// All operations are synchronous: a copy returns once the transfer completed.
pub trait DeviceBackend {
    /// Opaque handle to a device allocation.
    type Ptr: Copy + std::fmt::Debug;

    type Error: std::error::Error + Send + Sync + 'static;

    /// Allocates `size` bytes of device memory.
    fn allocate(&self, size: usize) -> std::result::Result<Self::Ptr, Self::Error>;

    /// Releases a device allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` on this backend and must not have
    /// been freed already.
    unsafe fn free(&self, ptr: Self::Ptr) -> std::result::Result<(), Self::Error>;

    /// Copies `src.len()` bytes from host memory to the start of `dst`.
    fn copy_host_to_device(
        &self,
        dst: Self::Ptr,
        src: &[u8],
    ) -> std::result::Result<(), Self::Error>;

    /// Copies `dst.len()` bytes from the start of `src` into host memory.
    fn copy_device_to_host(
        &self,
        dst: &mut [u8],
        src: Self::Ptr,
    ) -> std::result::Result<(), Self::Error>;
}

/// Backend for host-only buffers. It has no values, so a buffer typed with it can
/// never reach device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoDevice {}

impl DeviceBackend for NoDevice {
    type Ptr = ();
    type Error = std::convert::Infallible;

    fn allocate(&self, _size: usize) -> std::result::Result<(), Self::Error> {
        match *self {}
    }

    unsafe fn free(&self, _ptr: ()) -> std::result::Result<(), Self::Error> {
        match *self {}
    }

    fn copy_host_to_device(&self, _dst: (), _src: &[u8]) -> std::result::Result<(), Self::Error> {
        match *self {}
    }

    fn copy_device_to_host(
        &self,
        _dst: &mut [u8],
        _src: (),
    ) -> std::result::Result<(), Self::Error> {
        match *self {}
    }
}

/// An owned device allocation, released through its backend on drop.
pub struct DeviceMemory<B: DeviceBackend> {
    backend: Arc<B>,
    ptr: B::Ptr,
    len: usize,
}

impl<B: DeviceBackend> DeviceMemory<B> {
    /// Allocates `len` bytes on the device served by `backend`.
    pub fn allocate(backend: Arc<B>, len: usize) -> Result<DeviceMemory<B>> {
        let ptr = backend
            .allocate(len)
            .map_err(|e| Error::device_allocation(len, e))?;
        log::debug!("allocated {len} bytes of device memory at {ptr:?}");
        Ok(DeviceMemory { backend, ptr, len })
    }

    /// Device handle of the allocation.
    #[inline]
    pub fn ptr(&self) -> B::Ptr {
        self.ptr
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Uploads `src` (exactly `len()` bytes) to the device.
    pub fn upload(&self, src: &[u8]) -> Result<()> {
        debug_assert_eq!(src.len(), self.len);
        self.backend
            .copy_host_to_device(self.ptr, src)
            .map_err(|e| Error::copy(CopyDirection::HostToDevice, src.len(), e))
    }

    /// Downloads the device contents into `dst` (exactly `len()` bytes).
    pub fn download(&self, dst: &mut [u8]) -> Result<()> {
        debug_assert_eq!(dst.len(), self.len);
        let size = dst.len();
        self.backend
            .copy_device_to_host(dst, self.ptr)
            .map_err(|e| Error::copy(CopyDirection::DeviceToHost, size, e))
    }
}

impl<B: DeviceBackend> Drop for DeviceMemory<B> {
    fn drop(&mut self) {
        if let Err(e) = unsafe { self.backend.free(self.ptr) } {
            log::warn!("failed to free device memory at {:?}: {e}", self.ptr);
        }
    }
}

impl<B: DeviceBackend> std::fmt::Debug for DeviceMemory<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceMemory")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
