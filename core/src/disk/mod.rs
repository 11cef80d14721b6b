//! Block device access and GPT partition tables.
//!
//! Every backend is adapted to `BlockIo<Error = DiskError>` so the rest of
//! the stack can pass devices around as trait objects.

pub mod block;
pub mod gpt;
pub mod gpt_writer;
pub mod partition;

pub use block::{read_bytes, write_bytes, BlockRef, DeviceAdapter, DynBlockIo};
pub use gpt::scan_partitions;
pub use gpt_writer::{write_gpt, PartitionSpec};
pub use partition::{PartitionInfo, PartitionKind, PartitionTable};

use core::fmt;

/// Result type for disk operations
pub type Result<T> = core::result::Result<T, DiskError>;

/// Errors reported by the disk layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    /// The device reported a transfer failure
    Io,
    /// Access beyond the end of the device
    OutOfRange,
    /// Device block size is not usable for this operation
    UnsupportedBlockSize,
    /// GPT header present but unusable
    InvalidHeader,
    /// Partition layout does not fit the disk
    InvalidLayout,
    /// No free partition entry
    NoSpace,
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io => write!(f, "I/O error"),
            Self::OutOfRange => write!(f, "access beyond end of device"),
            Self::UnsupportedBlockSize => write!(f, "unsupported block size"),
            Self::InvalidHeader => write!(f, "invalid GPT header"),
            Self::InvalidLayout => write!(f, "invalid partition layout"),
            Self::NoSpace => write!(f, "no free partition entry"),
        }
    }
}
