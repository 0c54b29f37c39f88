//! Which physical copy of a synchronized buffer holds the authoritative bytes.

/// The "head" of a [`SyncedMemory`](crate::SyncedMemory).
///
/// `Synced` means host and device agree; `SyncedOptimized` means host and the
/// optimized-layout region agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SyncedHead {
    /// Nothing has been allocated yet.
    #[default]
    Uninitialized,
    HeadAtHost,
    HeadAtDevice,
    Synced,
    HeadAtOptimized,
    SyncedOptimized,
}

impl SyncedHead {
    pub const ALL: [SyncedHead; 6] = [
        SyncedHead::Uninitialized,
        SyncedHead::HeadAtHost,
        SyncedHead::HeadAtDevice,
        SyncedHead::Synced,
        SyncedHead::HeadAtOptimized,
        SyncedHead::SyncedOptimized,
    ];

    /// Host memory holds up-to-date bytes.
    #[inline]
    pub fn is_host_current(self) -> bool {
        matches!(
            self,
            SyncedHead::HeadAtHost | SyncedHead::Synced | SyncedHead::SyncedOptimized
        )
    }

    /// Device memory holds up-to-date bytes.
    #[inline]
    pub fn is_device_current(self) -> bool {
        matches!(self, SyncedHead::HeadAtDevice | SyncedHead::Synced)
    }

    /// The optimized-layout region holds up-to-date data.
    #[inline]
    pub fn is_optimized_current(self) -> bool {
        matches!(
            self,
            SyncedHead::HeadAtOptimized | SyncedHead::SyncedOptimized
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SyncedHead::Uninitialized => "UNINITIALIZED",
            SyncedHead::HeadAtHost => "HEAD_AT_HOST",
            SyncedHead::HeadAtDevice => "HEAD_AT_DEVICE",
            SyncedHead::Synced => "SYNCED",
            SyncedHead::HeadAtOptimized => "HEAD_AT_OPTIMIZED",
            SyncedHead::SyncedOptimized => "SYNCED_OPTIMIZED",
        }
    }
}

impl std::fmt::Display for SyncedHead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_predicates() {
        for head in SyncedHead::ALL {
            let current = [
                head.is_host_current(),
                head.is_device_current(),
                head.is_optimized_current(),
            ];
            let expected = match head {
                SyncedHead::Uninitialized => [false, false, false],
                SyncedHead::HeadAtHost => [true, false, false],
                SyncedHead::HeadAtDevice => [false, true, false],
                SyncedHead::Synced => [true, true, false],
                SyncedHead::HeadAtOptimized => [false, false, true],
                SyncedHead::SyncedOptimized => [true, false, true],
            };
            assert_eq!(current, expected, "{head}");
        }
    }

    #[test]
    fn test_default_and_display() {
        assert_eq!(SyncedHead::default(), SyncedHead::Uninitialized);
        assert_eq!(SyncedHead::SyncedOptimized.to_string(), "SYNCED_OPTIMIZED");
        assert_eq!(format!("{}", SyncedHead::HeadAtDevice), "HEAD_AT_DEVICE");
    }
}
