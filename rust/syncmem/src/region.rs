use syncmem_page_alloc::HostBuffer;

/// Host-addressable memory that is either owned by the buffer or lent by the caller.
///
/// Dropping an `Owned` region releases it; a `Borrowed` region is left untouched and
/// the borrow checker keeps the caller's memory alive for `'a`.
pub enum Region<'a> {
    Owned(HostBuffer),
    Borrowed(&'a mut [u8]),
}

impl Region<'_> {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Region::Owned(buf) => buf.as_bytes(),
            Region::Borrowed(data) => &data[..],
        }
    }

    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        match self {
            Region::Owned(buf) => buf.as_bytes_mut(),
            Region::Borrowed(data) => &mut data[..],
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_owned(&self) -> bool {
        matches!(self, Region::Owned(_))
    }

    #[inline]
    pub fn ptr(&self) -> *const u8 {
        self.as_bytes().as_ptr()
    }
}

impl std::fmt::Debug for Region<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = if self.is_owned() { "Owned" } else { "Borrowed" };
        f.debug_struct(kind)
            .field("ptr", &self.ptr())
            .field("len", &self.len())
            .finish()
    }
}
