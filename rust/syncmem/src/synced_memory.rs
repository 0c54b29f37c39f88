//! `SyncedMemory`: one logical byte buffer mirrored lazily across host memory,
//! device memory and an optimized-layout region.
//!
//! The buffer allocates and copies only when an accessor needs a representation that
//! is absent or stale. [`SyncedHead`] records which copy is authoritative:
//!
//! | accessor       | Uninitialized    | HeadAtHost   | HeadAtDevice   | Synced | HeadAtOptimized       | SyncedOptimized |
//! |----------------|------------------|--------------|----------------|--------|-----------------------|-----------------|
//! | `read_host`    | alloc, AtHost    | -            | d->h, Synced   | -      | convert, SyncedOpt.   | -               |
//! | `read_device`  | alloc, AtDevice  | h->d, Synced | -              | -      | convert, h->d, Synced | h->d, Synced    |
//!
//! The `write_*` accessors perform the same reconciliation and then make their own
//! representation the head.
//!
//! A `SyncedMemory` has a single owner: every accessor that may allocate or copy
//! takes `&mut self`. Callers sharing a buffer across threads wrap it in a lock.

use std::sync::Arc;

use syncmem_common::{Error, Result};
use syncmem_page_alloc::HostBuffer;

use crate::{
    backend::{DeviceBackend, DeviceMemory, NoDevice},
    convert::LayoutConverter,
    head::SyncedHead,
    options::SyncedMemoryOptions,
    region::Region,
};

pub struct SyncedMemory<'a, B: DeviceBackend = NoDevice> {
    size: usize,
    head: SyncedHead,
    host: Option<Region<'a>>,
    device: Option<DeviceMemory<B>>,
    optimized: Option<Region<'a>>,
    /// The optimized region holds plain host-layout bytes; no conversion needed.
    optimized_same_layout: bool,
    converter: Option<Box<dyn LayoutConverter + Send + 'a>>,
    backend: Option<Arc<B>>,
    options: SyncedMemoryOptions,
}

impl<'a> SyncedMemory<'a, NoDevice> {
    /// Creates a host-only buffer of `size` bytes with default options.
    ///
    /// Nothing is allocated until the first accessor call.
    pub fn new(size: usize) -> SyncedMemory<'a, NoDevice> {
        SyncedMemory::build(size, None, SyncedMemoryOptions::default())
    }
}

impl Default for SyncedMemory<'_, NoDevice> {
    fn default() -> Self {
        SyncedMemory::new(0)
    }
}

impl<'a, B: DeviceBackend> SyncedMemory<'a, B> {
    /// Creates a buffer of `size` bytes that can be mirrored on `backend`.
    pub fn with_device(size: usize, backend: Arc<B>) -> SyncedMemory<'a, B> {
        SyncedMemory::build(size, Some(backend), SyncedMemoryOptions::default())
    }

    /// Creates a buffer with explicit options. `backend` may be `None` for host-only
    /// use of a device-capable type.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are invalid.
    pub fn with_options(
        size: usize,
        backend: Option<Arc<B>>,
        options: SyncedMemoryOptions,
    ) -> Result<SyncedMemory<'a, B>> {
        options.validate()?;
        Ok(SyncedMemory::build(size, backend, options))
    }

    fn build(
        size: usize,
        backend: Option<Arc<B>>,
        options: SyncedMemoryOptions,
    ) -> SyncedMemory<'a, B> {
        SyncedMemory {
            size,
            head: SyncedHead::Uninitialized,
            host: None,
            device: None,
            optimized: None,
            optimized_same_layout: false,
            converter: None,
            backend,
            options,
        }
    }

    /// Byte length of the logical buffer.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Current head. Intended for diagnostics and tests; accessors reconcile on
    /// their own.
    #[inline]
    pub fn head(&self) -> SyncedHead {
        self.head
    }

    #[inline]
    pub fn has_host(&self) -> bool {
        self.host.is_some()
    }

    #[inline]
    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    #[inline]
    pub fn has_optimized(&self) -> bool {
        self.optimized.is_some()
    }

    /// `true` if the host region was allocated by this buffer and is freed with it.
    pub fn owns_host(&self) -> bool {
        self.host.as_ref().is_some_and(Region::is_owned)
    }

    /// `true` if the optimized region was allocated by this buffer.
    pub fn owns_optimized(&self) -> bool {
        self.optimized.as_ref().is_some_and(Region::is_owned)
    }

    pub fn backend(&self) -> Option<&Arc<B>> {
        self.backend.as_ref()
    }

    pub fn options(&self) -> &SyncedMemoryOptions {
        &self.options
    }

    /// Installs the converter used to bring a foreign-layout optimized region back
    /// to host layout.
    pub fn set_converter(&mut self, converter: impl LayoutConverter + Send + 'a) {
        self.converter = Some(Box::new(converter));
    }

    /// Returns host bytes that reflect the latest write to any representation.
    ///
    /// Failures (allocation, transfer, conversion) are fatal, see
    /// [`FatalHandler`](crate::FatalHandler).
    pub fn read_host(&mut self) -> &[u8] {
        let fatal = Arc::clone(self.options.fatal_handler());
        self.try_read_host().unwrap_or_else(|e| fatal.fatal(&e))
    }

    /// Brings host memory up to date and makes it the head: device and optimized
    /// copies become stale.
    pub fn write_host(&mut self) -> &mut [u8] {
        let fatal = Arc::clone(self.options.fatal_handler());
        self.try_write_host().unwrap_or_else(|e| fatal.fatal(&e))
    }

    /// Fallible form of [`SyncedMemory::read_host`].
    pub fn try_read_host(&mut self) -> Result<&[u8]> {
        self.to_host()?;
        self.host
            .as_ref()
            .map(Region::as_bytes)
            .ok_or_else(|| missing_region("host"))
    }

    /// Fallible form of [`SyncedMemory::write_host`].
    pub fn try_write_host(&mut self) -> Result<&mut [u8]> {
        self.to_host()?;
        self.set_head(SyncedHead::HeadAtHost);
        self.host
            .as_mut()
            .map(Region::as_bytes_mut)
            .ok_or_else(|| missing_region("host"))
    }

    /// Host bytes reinterpreted as `T`.
    ///
    /// # Panics
    ///
    /// Panics if the size or the alignment of the host region does not fit `T`.
    pub fn read_host_as<T>(&mut self) -> &[T]
    where
        T: bytemuck::AnyBitPattern,
    {
        bytemuck::cast_slice(self.read_host())
    }

    /// Mutable host bytes reinterpreted as `T`; same transition as `write_host`.
    pub fn write_host_as<T>(&mut self) -> &mut [T]
    where
        T: bytemuck::AnyBitPattern + bytemuck::NoUninit,
    {
        bytemuck::cast_slice_mut(self.write_host())
    }

    /// Returns device memory that reflects the latest write to any representation.
    ///
    /// An optimized-layout head is first converted to host layout and then uploaded.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was built without a device backend.
    pub fn read_device(&mut self) -> &DeviceMemory<B> {
        let fatal = Arc::clone(self.options.fatal_handler());
        self.try_read_device().unwrap_or_else(|e| fatal.fatal(&e))
    }

    /// Brings device memory up to date and makes it the head.
    pub fn write_device(&mut self) -> &mut DeviceMemory<B> {
        let fatal = Arc::clone(self.options.fatal_handler());
        self.try_write_device().unwrap_or_else(|e| fatal.fatal(&e))
    }

    pub fn try_read_device(&mut self) -> Result<&DeviceMemory<B>> {
        self.to_device()?;
        self.device.as_ref().ok_or_else(|| missing_region("device"))
    }

    pub fn try_write_device(&mut self) -> Result<&mut DeviceMemory<B>> {
        self.to_device()?;
        self.set_head(SyncedHead::HeadAtDevice);
        self.device.as_mut().ok_or_else(|| missing_region("device"))
    }

    /// Makes caller-owned memory the host representation and the head.
    ///
    /// Any host region owned by this buffer is released first. No bytes are copied:
    /// `data` is taken as the current contents.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` differs from the buffer size.
    pub fn attach_host(&mut self, data: &'a mut [u8]) {
        assert_eq!(
            data.len(),
            self.size,
            "attached host memory must match the buffer size"
        );
        if self.owns_host() {
            log::debug!("releasing owned host region of {} bytes", self.size);
        }
        self.host = Some(Region::Borrowed(data));
        self.set_head(SyncedHead::HeadAtHost);
    }

    /// Prepares an optimized-layout staging region with the plain host layout.
    ///
    /// If no optimized region is installed, one is allocated and owned by the buffer.
    /// A device or optimized head is reconciled to the host first; current host bytes
    /// are then copied into the region. The head is left unchanged: whoever repacks
    /// the region declares it authoritative with [`SyncedMemory::commit_optimized`].
    pub fn init_optimized(&mut self) -> &mut [u8] {
        let fatal = Arc::clone(self.options.fatal_handler());
        self.try_init_optimized().unwrap_or_else(|e| fatal.fatal(&e))
    }

    pub fn try_init_optimized(&mut self) -> Result<&mut [u8]> {
        if matches!(
            self.head,
            SyncedHead::HeadAtDevice | SyncedHead::HeadAtOptimized
        ) {
            self.to_host()?;
        }
        let optimized = materialize_host(&mut self.optimized, self.size, &self.options)?;
        if self.head.is_host_current() {
            if let Some(host) = &self.host {
                optimized.as_bytes_mut().copy_from_slice(host.as_bytes());
            }
        }
        // The staging region now holds plain host-layout bytes.
        self.optimized_same_layout = true;
        Ok(optimized.as_bytes_mut())
    }

    /// Makes caller-owned optimized-layout data the head.
    ///
    /// With `same_layout`, later host reads byte-copy the region; otherwise they run
    /// the installed [`LayoutConverter`]. An owned optimized region is released.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` differs from the buffer size.
    pub fn attach_optimized(&mut self, data: &'a mut [u8], same_layout: bool) {
        assert_eq!(
            data.len(),
            self.size,
            "attached optimized memory must match the buffer size"
        );
        self.optimized = Some(Region::Borrowed(data));
        self.optimized_same_layout = same_layout;
        self.set_head(SyncedHead::HeadAtOptimized);
    }

    /// Declares the installed optimized region authoritative, typically after a
    /// backend repacked the staging region returned by `init_optimized`.
    ///
    /// # Panics
    ///
    /// Panics if no optimized region is installed.
    pub fn commit_optimized(&mut self, same_layout: bool) {
        assert!(
            self.optimized.is_some(),
            "commit_optimized requires an optimized region"
        );
        self.optimized_same_layout = same_layout;
        self.set_head(SyncedHead::HeadAtOptimized);
    }

    /// Optimized-layout data, if it is current.
    ///
    /// Returns `None` while another representation is the head: refreshing the
    /// optimized layout from host data is up to the backend that owns the format.
    pub fn read_optimized(&self) -> Option<&[u8]> {
        if self.head.is_optimized_current() {
            self.optimized.as_ref().map(Region::as_bytes)
        } else {
            None
        }
    }

    /// Grants write access to the optimized region and makes it the head.
    ///
    /// A device head is downloaded to the host first so that no data is lost.
    ///
    /// # Panics
    ///
    /// Panics if no optimized region is installed.
    pub fn write_optimized(&mut self) -> &mut [u8] {
        let fatal = Arc::clone(self.options.fatal_handler());
        self.try_write_optimized().unwrap_or_else(|e| fatal.fatal(&e))
    }

    pub fn try_write_optimized(&mut self) -> Result<&mut [u8]> {
        assert!(
            self.optimized.is_some(),
            "write_optimized requires an optimized region; call init_optimized or attach_optimized first"
        );
        if self.head == SyncedHead::HeadAtDevice {
            self.to_host()?;
        }
        self.set_head(SyncedHead::HeadAtOptimized);
        self.optimized
            .as_mut()
            .map(Region::as_bytes_mut)
            .ok_or_else(|| missing_region("optimized"))
    }

    fn to_host(&mut self) -> Result<()> {
        match self.head {
            SyncedHead::Uninitialized => {
                materialize_host(&mut self.host, self.size, &self.options)?;
                self.set_head(SyncedHead::HeadAtHost);
            }
            SyncedHead::HeadAtDevice => {
                let host = materialize_host(&mut self.host, self.size, &self.options)?;
                let device = self.device.as_ref().ok_or_else(|| missing_region("device"))?;
                device.download(host.as_bytes_mut())?;
                self.set_head(SyncedHead::Synced);
            }
            SyncedHead::HeadAtOptimized => {
                let host = materialize_host(&mut self.host, self.size, &self.options)?;
                let optimized = self
                    .optimized
                    .as_ref()
                    .ok_or_else(|| missing_region("optimized"))?;
                if self.optimized_same_layout {
                    host.as_bytes_mut().copy_from_slice(optimized.as_bytes());
                } else {
                    let converter = self.converter.as_deref().unwrap_or_else(|| {
                        panic!("optimized data has a foreign layout but no layout converter is set")
                    });
                    converter
                        .to_host_layout(optimized.as_bytes(), host.as_bytes_mut())
                        .map_err(Error::conversion)?;
                }
                self.set_head(SyncedHead::SyncedOptimized);
            }
            SyncedHead::HeadAtHost | SyncedHead::Synced | SyncedHead::SyncedOptimized => {
                log::trace!("host already current ({})", self.head);
            }
        }
        Ok(())
    }

    fn to_device(&mut self) -> Result<()> {
        match self.head {
            SyncedHead::Uninitialized => {
                materialize_device(&mut self.device, self.backend.as_ref(), self.size)?;
                self.set_head(SyncedHead::HeadAtDevice);
            }
            SyncedHead::HeadAtOptimized => {
                self.to_host()?;
                self.upload_host()?;
            }
            SyncedHead::HeadAtHost | SyncedHead::SyncedOptimized => self.upload_host()?,
            SyncedHead::HeadAtDevice | SyncedHead::Synced => {
                log::trace!("device already current ({})", self.head);
            }
        }
        Ok(())
    }

    fn upload_host(&mut self) -> Result<()> {
        let device = materialize_device(&mut self.device, self.backend.as_ref(), self.size)?;
        let host = self.host.as_ref().ok_or_else(|| missing_region("host"))?;
        device.upload(host.as_bytes())?;
        self.set_head(SyncedHead::Synced);
        Ok(())
    }

    #[inline]
    fn set_head(&mut self, head: SyncedHead) {
        if self.head != head {
            log::debug!("synced memory ({} bytes): {} -> {}", self.size, self.head, head);
            self.head = head;
        }
    }
}

/// Returns the region in `slot`, allocating an owned one first if it is empty.
fn materialize_host<'r, 'a>(
    slot: &'r mut Option<Region<'a>>,
    size: usize,
    options: &SyncedMemoryOptions,
) -> Result<&'r mut Region<'a>> {
    match slot.take() {
        Some(region) => Ok(slot.insert(region)),
        None => {
            let buf = HostBuffer::allocate_in(
                Arc::clone(options.host_allocator()),
                size,
                options.host_alignment(),
            )
            .map_err(|e| Error::host_allocation(size, e))?;
            log::debug!(
                "allocated {size} bytes of host memory (alignment {})",
                options.host_alignment()
            );
            Ok(slot.insert(Region::Owned(buf)))
        }
    }
}

fn materialize_device<'r, B: DeviceBackend>(
    slot: &'r mut Option<DeviceMemory<B>>,
    backend: Option<&Arc<B>>,
    size: usize,
) -> Result<&'r mut DeviceMemory<B>> {
    match slot.take() {
        Some(memory) => Ok(slot.insert(memory)),
        None => {
            let backend = backend.unwrap_or_else(|| {
                panic!("device memory requested from a buffer without a device backend")
            });
            let memory = DeviceMemory::allocate(Arc::clone(backend), size)?;
            Ok(slot.insert(memory))
        }
    }
}

#[cold]
fn missing_region(name: &str) -> Error {
    Error::invalid_operation(format!("{name} region is missing for the current head"))
}

impl<B: DeviceBackend> std::fmt::Debug for SyncedMemory<'_, B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncedMemory")
            .field("size", &self.size)
            .field("head", &self.head)
            .field("host", &self.host)
            .field("device", &self.device)
            .field("optimized", &self.optimized)
            .field("optimized_same_layout", &self.optimized_same_layout)
            .field("has_converter", &self.converter.is_some())
            .finish_non_exhaustive()
    }
}
