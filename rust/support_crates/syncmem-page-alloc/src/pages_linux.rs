use std::sync::OnceLock;

/// Gets the system's large page (huge page) size in bytes.
///
/// The value is read once from `/proc/meminfo` and cached. If it cannot be
/// determined, 2MB is assumed.
pub fn get_large_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| read_large_page_size().unwrap_or(2 * 1024 * 1024))
}

/// Gets the system's standard page size in bytes (cached `sysconf(_SC_PAGESIZE)`).
pub fn get_page_size() -> usize {
    static SIZE: OnceLock<usize> = OnceLock::new();
    *SIZE.get_or_init(|| read_page_size().unwrap_or(4 * 1024))
}

/// Asks the kernel to back the given range with transparent huge pages.
///
/// This is advice only: the mapping stays valid whether or not the kernel honors it.
/// `ptr` must be aligned to the regular page size.
///
/// # Safety
///
/// `ptr..ptr + len` must lie within a single live allocation owned by the caller.
pub unsafe fn advise_huge_pages(ptr: *mut u8, len: usize) -> std::io::Result<()> {
    if len == 0 {
        return Ok(());
    }
    let res = unsafe { libc::madvise(ptr as *mut libc::c_void, len, libc::MADV_HUGEPAGE) };
    if res != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Parses the `Hugepagesize:` entry of `/proc/meminfo`, e.g. `Hugepagesize:    2048 kB`.
fn read_large_page_size() -> std::io::Result<usize> {
    let meminfo = std::fs::read_to_string("/proc/meminfo")?;
    meminfo
        .lines()
        .find_map(|line| line.strip_prefix("Hugepagesize:"))
        .and_then(|rest| rest.split_whitespace().next())
        .and_then(|kb| kb.parse::<usize>().ok())
        .map(|kb| kb * 1024)
        .filter(|size| size.is_power_of_two())
        .ok_or_else(|| std::io::Error::other("Failed to read Hugepagesize"))
}

fn read_page_size() -> std::io::Result<usize> {
    let res = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if res <= 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(res as usize)
}
