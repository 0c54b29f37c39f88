//! Host memory allocation aligned to large page boundaries.
//!
//! [`HostBuffer`] is an owned, zero-initialized byte region obtained from a
//! [`HostAllocator`]. The default [`LargePageAllocator`] aligns every region to the
//! system large page size so that big numeric buffers map onto as few TLB entries as
//! possible.

pub mod allocator;
pub mod host_buffer;

#[cfg_attr(target_os = "linux", path = "pages_linux.rs")]
#[cfg_attr(not(target_os = "linux"), path = "pages_fallback.rs")]
pub mod pages;


pub use allocator::{DEFAULT_HOST_ALIGNMENT, HostAllocator, LargePageAllocator};
pub use host_buffer::HostBuffer;
