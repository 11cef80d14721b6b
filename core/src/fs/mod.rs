//! Filesystem collaborators.
//!
//! The boot core only ever needs three things from a filesystem: does a
//! path exist, how big is it, and give me its bytes.

pub mod fat32;

pub use fat32::Fat32Volume;

use crate::disk::DynBlockIo;
use alloc::boxed::Box;
use core::fmt;

/// Result type for filesystem operations
pub type Result<T> = core::result::Result<T, FsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    /// Block device transfer failed
    IoError,
    /// No filesystem this layer understands
    Unrecognized,
    /// Path does not exist
    NotFound,
    /// Path names a directory
    NotAFile,
    /// On-disk structures are inconsistent
    Corrupt,
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IoError => write!(f, "I/O error"),
            Self::Unrecognized => write!(f, "unrecognized filesystem"),
            Self::NotFound => write!(f, "file not found"),
            Self::NotAFile => write!(f, "not a regular file"),
            Self::Corrupt => write!(f, "corrupt filesystem"),
        }
    }
}

/// A mounted, read-only filesystem.
pub trait Filesystem {
    fn fs_type(&self) -> &'static str;

    /// Size in bytes of the regular file at `path`.
    fn size(&mut self, path: &str) -> Result<u64>;

    /// Read from `offset` into `dst`; returns bytes copied (short at EOF).
    fn read(&mut self, path: &str, offset: u64, dst: &mut [u8]) -> Result<usize>;

    fn exists(&mut self, path: &str) -> bool {
        self.size(path).is_ok()
    }
}

/// Mount whatever filesystem lives at `start_lba`.
pub fn mount<'a>(io: &'a mut DynBlockIo<'a>, start_lba: u64) -> Result<Box<dyn Filesystem + 'a>> {
    let volume = Fat32Volume::mount(io, start_lba)?;
    Ok(Box::new(volume))
}
