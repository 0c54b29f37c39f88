use std::sync::Arc;

use syncmem_common::{Result, verify_arg};
use syncmem_page_alloc::{DEFAULT_HOST_ALIGNMENT, HostAllocator, LargePageAllocator};

use crate::fatal::{AbortOnFatal, FatalHandler};

/// Configuration of a [`SyncedMemory`](crate::SyncedMemory).
///
/// By default host regions are 2MB aligned and come from the shared
/// [`LargePageAllocator`]; fatal errors abort the process.
#[derive(Debug, Clone)]
pub struct SyncedMemoryOptions {
    host_alignment: usize,
    host_allocator: Arc<dyn HostAllocator>,
    fatal_handler: Arc<dyn FatalHandler>,
}

impl SyncedMemoryOptions {
    pub fn new() -> SyncedMemoryOptions {
        SyncedMemoryOptions {
            host_alignment: DEFAULT_HOST_ALIGNMENT,
            host_allocator: LargePageAllocator::shared(),
            fatal_handler: Arc::new(AbortOnFatal),
        }
    }

    /// Alignment of host and owned optimized-layout regions, in bytes.
    pub fn with_host_alignment(mut self, alignment: usize) -> Self {
        self.host_alignment = alignment;
        self
    }

    pub fn with_host_allocator(mut self, allocator: Arc<dyn HostAllocator>) -> Self {
        self.host_allocator = allocator;
        self
    }

    /// Replaces the allocator with a [`LargePageAllocator`] that does (or does not)
    /// request transparent huge pages.
    pub fn with_huge_page_advice(self, advise: bool) -> Self {
        self.with_host_allocator(Arc::new(LargePageAllocator::new(advise)))
    }

    pub fn with_fatal_handler(mut self, handler: Arc<dyn FatalHandler>) -> Self {
        self.fatal_handler = handler;
        self
    }

    #[inline]
    pub fn host_alignment(&self) -> usize {
        self.host_alignment
    }

    #[inline]
    pub fn host_allocator(&self) -> &Arc<dyn HostAllocator> {
        &self.host_allocator
    }

    #[inline]
    pub fn fatal_handler(&self) -> &Arc<dyn FatalHandler> {
        &self.fatal_handler
    }

    pub fn validate(&self) -> Result<()> {
        verify_arg!(host_alignment, self.host_alignment.is_power_of_two());
        Ok(())
    }
}

impl Default for SyncedMemoryOptions {
    fn default() -> Self {
        SyncedMemoryOptions::new()
    }
}
