//! Common test utilities and mock block devices

pub mod builder;
#[allow(unused_imports)]
pub use builder::Fat32Builder;

use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::io;

pub const SECTOR: usize = 512;

/// In-memory block device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
    pub block_size: usize,
    /// Reads touching this LBA fail
    pub bad_lba: Option<u64>,
}

impl MemoryBlockDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            block_size: SECTOR,
            bad_lba: None,
        }
    }

    pub fn zeroed(blocks: usize) -> Self {
        Self::new(vec![0u8; blocks * SECTOR])
    }

    /// Copy a filesystem image in at `start_lba`.
    #[allow(dead_code)]
    pub fn place(&mut self, start_lba: u64, image: &[u8]) {
        let offset = start_lba as usize * self.block_size;
        self.data[offset..offset + image.len()].copy_from_slice(image);
    }
}

impl BlockIo for MemoryBlockDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::new(self.block_size as u32).expect("valid block size")
    }

    fn num_blocks(&mut self) -> Result<u64, Self::Error> {
        Ok((self.data.len() / self.block_size) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<(), Self::Error> {
        let count = (dst.len() / self.block_size) as u64;
        if let Some(bad) = self.bad_lba {
            if bad >= start_lba.0 && bad < start_lba.0 + count {
                return Err(io::Error::new(io::ErrorKind::Other, "media error"));
            }
        }
        let offset = start_lba.0 as usize * self.block_size;
        if offset + dst.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "read beyond end of device",
            ));
        }
        dst.copy_from_slice(&self.data[offset..offset + dst.len()]);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<(), Self::Error> {
        let offset = start_lba.0 as usize * self.block_size;
        if offset + src.len() > self.data.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "write beyond end of device",
            ));
        }
        self.data[offset..offset + src.len()].copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
