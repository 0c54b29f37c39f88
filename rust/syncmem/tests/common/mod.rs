#![allow(dead_code)]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use syncmem::{PanicOnFatal, SyncedHead, SyncedMemory, SyncedMemoryOptions};
use syncmem_testkit::{alloc::CountingAllocator, data_gen, device::EmulatedDevice};

pub const SIZE: usize = 64;

/// Device, allocator and conversion counter shared by the buffers of one test.
pub struct Fixture {
    pub device: Arc<EmulatedDevice>,
    pub allocator: Arc<CountingAllocator>,
    pub conversions: Arc<AtomicUsize>,
    /// Address of the optimized bytes handed to each conversion.
    pub converted_from: Arc<Mutex<Vec<usize>>>,
}

impl Fixture {
    pub fn new() -> Fixture {
        Fixture {
            device: Arc::new(EmulatedDevice::new()),
            allocator: Arc::new(CountingAllocator::new()),
            conversions: Arc::new(AtomicUsize::new(0)),
            converted_from: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn options(&self) -> SyncedMemoryOptions {
        SyncedMemoryOptions::new()
            .with_host_alignment(4096)
            .with_host_allocator(self.allocator.clone())
            .with_fatal_handler(Arc::new(PanicOnFatal))
    }

    /// A device-capable buffer whose converter inverts every byte
    /// (see [`to_foreign_layout`]).
    pub fn memory<'a>(&self, size: usize) -> SyncedMemory<'a, EmulatedDevice> {
        let mut mem =
            SyncedMemory::with_options(size, Some(self.device.clone()), self.options()).unwrap();
        let conversions = self.conversions.clone();
        let converted_from = self.converted_from.clone();
        mem.set_converter(move |optimized: &[u8], host: &mut [u8]| -> syncmem::Result<()> {
            conversions.fetch_add(1, Ordering::SeqCst);
            converted_from.lock().unwrap().push(optimized.as_ptr() as usize);
            for (dst, src) in host.iter_mut().zip(optimized) {
                *dst = !*src;
            }
            Ok(())
        });
        mem
    }

    pub fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }

    pub fn converted_from(&self) -> Vec<usize> {
        self.converted_from.lock().unwrap().clone()
    }
}

/// The "optimized" layout used by the fixture converter: every byte inverted.
pub fn to_foreign_layout(data: &[u8]) -> Vec<u8> {
    data.iter().map(|b| !b).collect()
}

/// Logical contents the buffers created by [`drive`] hold.
pub fn pattern() -> Vec<u8> {
    let mut data = vec![0u8; SIZE];
    data_gen::fill_ascending(&mut data, 1);
    data
}

/// Creates a buffer of [`SIZE`] bytes whose head is `head` and whose authoritative
/// copy holds [`pattern`]. `optimized` backs the optimized-layout heads.
pub fn drive<'a>(
    fx: &Fixture,
    head: SyncedHead,
    optimized: &'a mut [u8],
) -> SyncedMemory<'a, EmulatedDevice> {
    let mut mem = fx.memory(SIZE);
    match head {
        SyncedHead::Uninitialized => {}
        SyncedHead::HeadAtHost => mem.write_host().copy_from_slice(&pattern()),
        SyncedHead::HeadAtDevice => {
            let ptr = mem.write_device().ptr();
            fx.device.write(ptr, &pattern()).unwrap();
        }
        SyncedHead::Synced => {
            mem.write_host().copy_from_slice(&pattern());
            mem.read_device();
        }
        SyncedHead::HeadAtOptimized | SyncedHead::SyncedOptimized => {
            optimized.copy_from_slice(&to_foreign_layout(&pattern()));
            mem.attach_optimized(optimized, false);
            if head == SyncedHead::SyncedOptimized {
                mem.read_host();
            }
        }
    }
    assert_eq!(mem.head(), head);
    mem
}
