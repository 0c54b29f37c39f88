//! # syncmem: lazily synchronized host/device memory
//!
//! [`SyncedMemory`] tracks one logical byte buffer that may be materialized in up to
//! three places: host memory, accelerator device memory, and an "optimized layout"
//! region produced by a backend-specific repacking step. At any time [`SyncedHead`]
//! says which copy is authoritative; accessors allocate and copy only when the
//! requested representation is absent or stale.
//!
//! ## Collaborators
//!
//! * [`DeviceBackend`] - allocation and synchronous copies on the accelerator.
//! * [`LayoutConverter`] - turns optimized-layout data back into host layout.
//! * [`HostAllocator`] - source of large-page aligned host memory
//!   (see [`syncmem_page_alloc`]).
//! * [`FatalHandler`] - receives unrecoverable allocation, transfer and conversion
//!   failures.
//!
//! ## Example
//!
//! ```
//! use syncmem::{SyncedHead, SyncedMemory};
//!
//! let mut mem = SyncedMemory::new(16);
//! mem.write_host().fill(0xAB);
//! assert_eq!(mem.head(), SyncedHead::HeadAtHost);
//! assert!(mem.read_host().iter().all(|&b| b == 0xAB));
//! ```

pub mod backend;
pub mod convert;
pub mod fatal;
pub mod head;
pub mod options;
pub mod region;
pub mod synced_memory;

pub use backend::{DeviceBackend, DeviceMemory, NoDevice};
pub use convert::LayoutConverter;
pub use fatal::{AbortOnFatal, FatalHandler, PanicOnFatal};
pub use head::SyncedHead;
pub use options::SyncedMemoryOptions;
pub use region::Region;
pub use synced_memory::SyncedMemory;

pub use syncmem_common::{CopyDirection, Error, ErrorKind, Result};
pub use syncmem_page_alloc::{HostAllocator, HostBuffer, LargePageAllocator};
