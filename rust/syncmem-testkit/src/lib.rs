//! Test utilities and fixtures for the syncmem crates.
//!
//! - [`device::EmulatedDevice`]: a `DeviceBackend` living in host memory that counts
//!   allocations and transfers and can inject failures
//! - [`alloc::CountingAllocator`]: an instrumented `HostAllocator`
//! - [`fatal::RecordingFatal`]: a fatal handler that records diagnostics before
//!   unwinding
//! - [`data_gen`]: reproducible byte patterns

pub mod alloc;
pub mod data_gen;
pub mod device;
pub mod fatal;
