//! Error types for boot orchestration

use bootstd_core::disk::DiskError;
use bootstd_core::fs::FsError;
use bootstd_persistent::StateError;
use core::fmt;

/// Result type for boot orchestration
pub type Result<T> = core::result::Result<T, BootError>;

/// Why a candidate, an operation or a boot attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootError {
    /// Operation not provided by this method or medium; never fatal
    Unsupported,
    /// Expected resource is absent; try the next candidate
    NotFound,
    /// Malformed data; the candidate is rejected
    Invalid,
    /// Content exceeds the method's size cap
    TooLarge,
    /// Destination buffer smaller than the content
    NoSpace,
    /// Per-medium candidate cap reached
    ResourceExhausted,
    /// Transport or read failure below the orchestrator
    IoFault,
    /// Bootflow has not reached a bootable state
    NotReady,
}

impl BootError {
    /// Short name shown in status columns
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unsupported => "unsupp",
            Self::NotFound => "nofile",
            Self::Invalid => "inval",
            Self::TooLarge => "toobig",
            Self::NoSpace => "nospc",
            Self::ResourceExhausted => "toomany",
            Self::IoFault => "io",
            Self::NotReady => "notrdy",
        }
    }
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported => write!(f, "operation not supported"),
            Self::NotFound => write!(f, "not found"),
            Self::Invalid => write!(f, "invalid data"),
            Self::TooLarge => write!(f, "file too large"),
            Self::NoSpace => write!(f, "buffer too small"),
            Self::ResourceExhausted => write!(f, "too many bootflows on one medium"),
            Self::IoFault => write!(f, "I/O error"),
            Self::NotReady => write!(f, "bootflow not ready"),
        }
    }
}

impl From<DiskError> for BootError {
    fn from(err: DiskError) -> Self {
        match err {
            DiskError::Io | DiskError::OutOfRange => BootError::IoFault,
            DiskError::UnsupportedBlockSize => BootError::Unsupported,
            DiskError::InvalidHeader | DiskError::InvalidLayout => BootError::Invalid,
            DiskError::NoSpace => BootError::NoSpace,
        }
    }
}

impl From<FsError> for BootError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::IoError => BootError::IoFault,
            FsError::NotFound | FsError::NotAFile => BootError::NotFound,
            FsError::Unrecognized | FsError::Corrupt => BootError::Invalid,
        }
    }
}

impl From<StateError> for BootError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::IoError => BootError::IoFault,
            StateError::Denied => BootError::Unsupported,
            StateError::OutOfRange
            | StateError::InvalidLayout
            | StateError::BadRecord
            | StateError::BadVersion => BootError::Invalid,
        }
    }
}

impl From<fmt::Error> for BootError {
    fn from(_: fmt::Error) -> Self {
        BootError::IoFault
    }
}

/// Outcome of asking for the candidate at one sequence number.
///
/// `EndOfMedium` closes the (method, medium) pair and is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discovery {
    Found,
    EndOfMedium,
    Fault(BootError),
}

impl From<Result<()>> for Discovery {
    fn from(res: Result<()>) -> Self {
        match res {
            Ok(()) => Discovery::Found,
            Err(e) => Discovery::Fault(e),
        }
    }
}
