//! Error types for slot-state operations

use bootstd_core::disk::DiskError;
use core::fmt;

/// Result type for slot-state operations
pub type Result<T> = core::result::Result<T, StateError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateError {
    /// Storage transfer failed
    IoError,

    /// Field or area lies outside the medium or the declared area
    OutOfRange,

    /// Area configuration is unusable (zero sizes, overlap, overflow)
    InvalidLayout,

    /// Record failed its header or checksum test
    BadRecord,

    /// Version field is not a string
    BadVersion,

    /// Storage refuses the access
    Denied,
}

impl fmt::Display for StateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error"),
            Self::OutOfRange => write!(f, "access outside the state area"),
            Self::InvalidLayout => write!(f, "invalid state area layout"),
            Self::BadRecord => write!(f, "state record failed validation"),
            Self::BadVersion => write!(f, "version field is not a valid string"),
            Self::Denied => write!(f, "state area not accessible"),
        }
    }
}

impl From<DiskError> for StateError {
    fn from(err: DiskError) -> Self {
        match err {
            DiskError::OutOfRange => StateError::OutOfRange,
            _ => StateError::IoError,
        }
    }
}
