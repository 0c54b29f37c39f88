use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

pub type StdErrorBoxed = Box<dyn std::error::Error + Send + Sync + 'static>;

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// Returns `true` for host or device allocation failures.
    pub fn is_allocation_failure(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::HostAllocation { .. } | ErrorKind::DeviceAllocation { .. }
        )
    }

    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    pub fn invalid_operation(name: impl Into<String>) -> Error {
        Error(ErrorKind::InvalidOperation { name: name.into() }.into())
    }

    pub fn host_allocation(size: usize, source: std::io::Error) -> Error {
        Error(ErrorKind::HostAllocation { size, source }.into())
    }

    pub fn device_allocation<E>(size: usize, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::DeviceAllocation {
                size,
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn copy<E>(direction: CopyDirection, size: usize, source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::BackendCopy {
                direction,
                size,
                source: source.into(),
            }
            .into(),
        )
    }

    pub fn conversion<E>(source: E) -> Error
    where
        E: Into<StdErrorBoxed>,
    {
        Error(
            ErrorKind::LayoutConversion {
                source: source.into(),
            }
            .into(),
        )
    }
}

/// Direction of a transfer between host memory and device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyDirection {
    HostToDevice,
    DeviceToHost,
}

impl std::fmt::Display for CopyDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CopyDirection::HostToDevice => f.write_str("host-to-device"),
            CopyDirection::DeviceToHost => f.write_str("device-to-host"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("invalid operation {name}")]
    InvalidOperation { name: String },

    #[error("host allocation of size {size} failed: {source}")]
    HostAllocation {
        size: usize,
        source: std::io::Error,
    },

    #[error("device allocation of size {size} failed: {source}")]
    DeviceAllocation { size: usize, source: StdErrorBoxed },

    #[error("{direction} copy of {size} bytes failed: {source}")]
    BackendCopy {
        direction: CopyDirection,
        size: usize,
        source: StdErrorBoxed,
    },

    #[error("layout conversion to host failed: {source}")]
    LayoutConversion { source: StdErrorBoxed },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}
