use syncmem_common::Result;

/// Converts an optimized-layout representation back into plain host layout.
///
/// Whatever describes the optimized layout (block sizes, strides, a primitive
/// descriptor of the math library) is state of the implementing type. Closures of
/// the form `Fn(&[u8], &mut [u8]) -> Result<()>` implement this trait, so the
/// descriptor can simply be captured.
pub trait LayoutConverter {
    /// Fills `host` with the host-layout bytes derived from `optimized`.
    ///
    /// `host` always spans the full buffer size.
    fn to_host_layout(&self, optimized: &[u8], host: &mut [u8]) -> Result<()>;
}

impl<F> LayoutConverter for F
where
    F: Fn(&[u8], &mut [u8]) -> Result<()>,
{
    fn to_host_layout(&self, optimized: &[u8], host: &mut [u8]) -> Result<()> {
        self(optimized, host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Optimized layout storing 4-byte words in reversed byte order.
    struct ByteSwapped;

    impl LayoutConverter for ByteSwapped {
        fn to_host_layout(&self, optimized: &[u8], host: &mut [u8]) -> Result<()> {
            for (dst, src) in host.chunks_exact_mut(4).zip(optimized.chunks_exact(4)) {
                dst.copy_from_slice(&[src[3], src[2], src[1], src[0]]);
            }
            Ok(())
        }
    }

    #[test]
    fn test_struct_converter() {
        let optimized = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut host = [0u8; 8];
        ByteSwapped.to_host_layout(&optimized, &mut host).unwrap();
        assert_eq!(host, [4, 3, 2, 1, 8, 7, 6, 5]);
    }

    #[test]
    fn test_closure_converter_captures_descriptor() {
        let offset = 10u8;
        let converter = move |optimized: &[u8], host: &mut [u8]| -> Result<()> {
            for (dst, src) in host.iter_mut().zip(optimized) {
                *dst = src.wrapping_add(offset);
            }
            Ok(())
        };
        let mut host = [0u8; 3];
        converter.to_host_layout(&[1, 2, 3], &mut host).unwrap();
        assert_eq!(host, [11, 12, 13]);
    }
}
