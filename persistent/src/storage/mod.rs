//! State storage backends
//!
//! The slot-state code only needs raw byte-range access; where those bytes
//! live (a block device region, SPI flash, an emulated NVRAM) is up to the
//! backend.

pub mod block;

use crate::error::Result;

/// Trait for state storage backends
pub trait StateStore {
    /// Read `dst.len()` bytes at absolute offset `offset`
    fn read(&mut self, offset: u64, dst: &mut [u8]) -> Result<()>;

    /// Write `src` at absolute offset `offset`
    fn write(&mut self, offset: u64, src: &[u8]) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
