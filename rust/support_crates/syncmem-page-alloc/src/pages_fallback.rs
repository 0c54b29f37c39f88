/// Returns the "large page" size in bytes.
pub fn get_large_page_size() -> usize {
    2 * 1024 * 1024
}

/// Returns the "standard page" size in bytes.
pub fn get_page_size() -> usize {
    4 * 1024
}

/// Huge page advice is not available on this platform; always succeeds.
///
/// # Safety
///
/// `ptr..ptr + len` must lie within a single live allocation owned by the caller.
pub unsafe fn advise_huge_pages(_ptr: *mut u8, _len: usize) -> std::io::Result<()> {
    Ok(())
}
