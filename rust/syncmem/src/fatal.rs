//! Handling of unrecoverable memory failures.
//!
//! Allocation, transfer and conversion failures leave a buffer without valid
//! contents, so the infallible accessors of [`SyncedMemory`](crate::SyncedMemory)
//! hand them to a [`FatalHandler`] that never returns.

use syncmem_common::Error;

pub trait FatalHandler: Send + Sync + std::fmt::Debug {
    /// Reports `error` and terminates the current computation.
    fn fatal(&self, error: &Error) -> !;
}

/// Logs the diagnostic and aborts the process.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortOnFatal;

impl FatalHandler for AbortOnFatal {
    fn fatal(&self, error: &Error) -> ! {
        log::error!("fatal memory error: {error}");
        eprintln!("fatal memory error: {error}");
        std::process::abort()
    }
}

/// Panics with the diagnostic, unwinding only the current thread.
///
/// Meant for tests and for hosts that isolate work units with `catch_unwind`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicOnFatal;

impl FatalHandler for PanicOnFatal {
    fn fatal(&self, error: &Error) -> ! {
        log::error!("fatal memory error: {error}");
        panic!("fatal memory error: {error}")
    }
}
