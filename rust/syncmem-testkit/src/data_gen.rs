//! Data generation utilities for testing.

/// Generates `len` pseudo-random bytes; the same `seed` always yields the same bytes.
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut bytes = vec![0u8; len];
    rng.fill(&mut bytes);
    bytes
}

/// Fills `dst` with an ascending byte sequence starting at `start`.
pub fn fill_ascending(dst: &mut [u8], start: u8) {
    for (i, b) in dst.iter_mut().enumerate() {
        *b = start.wrapping_add(i as u8);
    }
}
