//! A device backend emulated in host memory.

use std::{collections::HashMap, sync::Mutex};

use syncmem::DeviceBackend;

/// Byte pattern of freshly allocated emulated device memory, standing in for the
/// uninitialized contents a real device allocation has.
pub const UNINIT_PATTERN: u8 = 0xCD;

/// Handle of an emulated device allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DevicePtr(u64);

/// Operation counters of an [`EmulatedDevice`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    pub allocations: usize,
    pub frees: usize,
    pub host_to_device: usize,
    pub device_to_host: usize,
    pub bytes_to_device: usize,
    pub bytes_to_host: usize,
}

impl DeviceStats {
    /// Total number of transfers in either direction.
    pub fn copies(&self) -> usize {
        self.host_to_device + self.device_to_host
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EmulatedDeviceError {
    #[error("out of device memory ({requested} bytes requested)")]
    OutOfMemory { requested: usize },
    #[error("unknown device pointer {0:?}")]
    UnknownPointer(DevicePtr),
    #[error("transfer of {len} bytes does not match the allocation of {capacity} bytes")]
    SizeMismatch { len: usize, capacity: usize },
    #[error("injected transfer failure")]
    TransferFailure,
}

/// Device memory kept in host `Vec`s.
///
/// Every operation is counted, double frees and unknown handles are reported as
/// errors, and allocation or transfer failures can be switched on to exercise the
/// fatal paths of a buffer.
#[derive(Debug, Default)]
pub struct EmulatedDevice {
    state: Mutex<DeviceState>,
}

#[derive(Debug, Default)]
struct DeviceState {
    next_handle: u64,
    blocks: HashMap<u64, Vec<u8>>,
    stats: DeviceStats,
    fail_allocations: bool,
    fail_transfers: bool,
}

impl EmulatedDevice {
    pub fn new() -> EmulatedDevice {
        EmulatedDevice::default()
    }

    pub fn stats(&self) -> DeviceStats {
        self.state.lock().unwrap().stats
    }

    /// Number of allocations not yet freed.
    pub fn live_allocations(&self) -> usize {
        self.state.lock().unwrap().blocks.len()
    }

    /// Snapshot of the bytes behind `ptr`.
    pub fn contents(&self, ptr: DevicePtr) -> Option<Vec<u8>> {
        self.state.lock().unwrap().blocks.get(&ptr.0).cloned()
    }

    /// Overwrites device memory directly, as a kernel running on the device would.
    pub fn write(&self, ptr: DevicePtr, data: &[u8]) -> Result<(), EmulatedDeviceError> {
        let mut state = self.state.lock().unwrap();
        let block = state
            .blocks
            .get_mut(&ptr.0)
            .ok_or(EmulatedDeviceError::UnknownPointer(ptr))?;
        if block.len() != data.len() {
            return Err(EmulatedDeviceError::SizeMismatch {
                len: data.len(),
                capacity: block.len(),
            });
        }
        block.copy_from_slice(data);
        Ok(())
    }

    pub fn set_fail_allocations(&self, fail: bool) {
        self.state.lock().unwrap().fail_allocations = fail;
    }

    pub fn set_fail_transfers(&self, fail: bool) {
        self.state.lock().unwrap().fail_transfers = fail;
    }
}

impl DeviceBackend for EmulatedDevice {
    type Ptr = DevicePtr;
    type Error = EmulatedDeviceError;

    fn allocate(&self, size: usize) -> Result<DevicePtr, EmulatedDeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_allocations {
            return Err(EmulatedDeviceError::OutOfMemory { requested: size });
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.blocks.insert(handle, vec![UNINIT_PATTERN; size]);
        state.stats.allocations += 1;
        Ok(DevicePtr(handle))
    }

    unsafe fn free(&self, ptr: DevicePtr) -> Result<(), EmulatedDeviceError> {
        let mut state = self.state.lock().unwrap();
        state
            .blocks
            .remove(&ptr.0)
            .ok_or(EmulatedDeviceError::UnknownPointer(ptr))?;
        state.stats.frees += 1;
        Ok(())
    }

    fn copy_host_to_device(&self, dst: DevicePtr, src: &[u8]) -> Result<(), EmulatedDeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_transfers {
            return Err(EmulatedDeviceError::TransferFailure);
        }
        let block = state
            .blocks
            .get_mut(&dst.0)
            .ok_or(EmulatedDeviceError::UnknownPointer(dst))?;
        if block.len() != src.len() {
            return Err(EmulatedDeviceError::SizeMismatch {
                len: src.len(),
                capacity: block.len(),
            });
        }
        block.copy_from_slice(src);
        state.stats.host_to_device += 1;
        state.stats.bytes_to_device += src.len();
        Ok(())
    }

    fn copy_device_to_host(
        &self,
        dst: &mut [u8],
        src: DevicePtr,
    ) -> Result<(), EmulatedDeviceError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_transfers {
            return Err(EmulatedDeviceError::TransferFailure);
        }
        let block = state
            .blocks
            .get(&src.0)
            .ok_or(EmulatedDeviceError::UnknownPointer(src))?;
        if block.len() != dst.len() {
            return Err(EmulatedDeviceError::SizeMismatch {
                len: dst.len(),
                capacity: block.len(),
            });
        }
        dst.copy_from_slice(block);
        state.stats.device_to_host += 1;
        state.stats.bytes_to_host += dst.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_copy_free() {
        let device = EmulatedDevice::new();
        let ptr = device.allocate(4).unwrap();
        assert_eq!(device.contents(ptr).unwrap(), vec![UNINIT_PATTERN; 4]);

        device.copy_host_to_device(ptr, &[1, 2, 3, 4]).unwrap();
        let mut host = [0u8; 4];
        device.copy_device_to_host(&mut host, ptr).unwrap();
        assert_eq!(host, [1, 2, 3, 4]);

        unsafe { device.free(ptr).unwrap() };
        assert_eq!(device.live_allocations(), 0);
        assert_eq!(
            unsafe { device.free(ptr) },
            Err(EmulatedDeviceError::UnknownPointer(ptr))
        );

        let stats = device.stats();
        assert_eq!(stats.allocations, 1);
        assert_eq!(stats.frees, 1);
        assert_eq!(stats.copies(), 2);
        assert_eq!(stats.bytes_to_device, 4);
        assert_eq!(stats.bytes_to_host, 4);
    }

    #[test]
    fn test_injected_failures() {
        let device = EmulatedDevice::new();
        let ptr = device.allocate(2).unwrap();
        device.set_fail_transfers(true);
        assert_eq!(
            device.copy_host_to_device(ptr, &[1, 2]),
            Err(EmulatedDeviceError::TransferFailure)
        );
        device.set_fail_allocations(true);
        assert_eq!(
            device.allocate(8),
            Err(EmulatedDeviceError::OutOfMemory { requested: 8 })
        );
    }

    #[test]
    fn test_size_mismatch() {
        let device = EmulatedDevice::new();
        let ptr = device.allocate(2).unwrap();
        assert_eq!(
            device.write(ptr, &[1, 2, 3]),
            Err(EmulatedDeviceError::SizeMismatch {
                len: 3,
                capacity: 2
            })
        );
    }
}
