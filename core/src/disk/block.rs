// Block I/O adapters and byte-granular access

use super::{DiskError, Result};
use alloc::vec;
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};

/// Block device with errors already mapped into `DiskError`.
pub type DynBlockIo<'a> = dyn BlockIo<Error = DiskError> + 'a;

/// Adapter that turns any driver's `BlockIo` into one reporting `DiskError`.
pub struct DeviceAdapter<B: BlockIo> {
    inner: B,
}

impl<B: BlockIo> DeviceAdapter<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &B {
        &self.inner
    }

    pub fn into_inner(self) -> B {
        self.inner
    }
}

impl<B: BlockIo> BlockIo for DeviceAdapter<B> {
    type Error = DiskError;

    fn block_size(&self) -> BlockSize {
        self.inner.block_size()
    }

    fn num_blocks(&mut self) -> Result<u64> {
        self.inner.num_blocks().map_err(|e| {
            log::debug!("block size query failed: {}", e);
            DiskError::Io
        })
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<()> {
        self.inner.read_blocks(start_lba, dst).map_err(|e| {
            log::debug!("read at lba {} failed: {}", start_lba.0, e);
            DiskError::Io
        })
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<()> {
        self.inner.write_blocks(start_lba, src).map_err(|e| {
            log::debug!("write at lba {} failed: {}", start_lba.0, e);
            DiskError::Io
        })
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(|_| DiskError::Io)
    }
}

/// Borrowed device handed to APIs that take a `BlockIo` by value,
/// such as `gpt_disk_io::Disk`.
pub struct BlockRef<'a> {
    inner: &'a mut DynBlockIo<'a>,
}

impl<'a> BlockRef<'a> {
    pub fn new(inner: &'a mut DynBlockIo<'a>) -> Self {
        Self { inner }
    }
}

impl BlockIo for BlockRef<'_> {
    type Error = DiskError;

    fn block_size(&self) -> BlockSize {
        self.inner.block_size()
    }

    fn num_blocks(&mut self) -> Result<u64> {
        self.inner.num_blocks()
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> Result<()> {
        self.inner.read_blocks(start_lba, dst)
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> Result<()> {
        self.inner.write_blocks(start_lba, src)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

fn check_range(io: &mut DynBlockIo<'_>, offset: u64, len: usize) -> Result<u64> {
    let block_size = u64::from(io.block_size().to_u32());
    if block_size == 0 {
        return Err(DiskError::UnsupportedBlockSize);
    }
    let end = offset
        .checked_add(len as u64)
        .ok_or(DiskError::OutOfRange)?;
    let capacity = io
        .num_blocks()?
        .checked_mul(block_size)
        .ok_or(DiskError::OutOfRange)?;
    if end > capacity {
        return Err(DiskError::OutOfRange);
    }
    Ok(block_size)
}

/// Read `dst.len()` bytes starting at byte `offset` of the device.
pub fn read_bytes(io: &mut DynBlockIo<'_>, offset: u64, dst: &mut [u8]) -> Result<()> {
    let block_size = check_range(io, offset, dst.len())?;
    let mut block = vec![0u8; block_size as usize];
    let mut done = 0usize;

    while done < dst.len() {
        let pos = offset + done as u64;
        let lba = pos / block_size;
        let within = (pos % block_size) as usize;
        let chunk = (block_size as usize - within).min(dst.len() - done);

        io.read_blocks(Lba(lba), &mut block)?;
        dst[done..done + chunk].copy_from_slice(&block[within..within + chunk]);
        done += chunk;
    }
    Ok(())
}

/// Write `src` at byte `offset`, read-modify-writing partial blocks.
pub fn write_bytes(io: &mut DynBlockIo<'_>, offset: u64, src: &[u8]) -> Result<()> {
    let block_size = check_range(io, offset, src.len())?;
    let mut block = vec![0u8; block_size as usize];
    let mut done = 0usize;

    while done < src.len() {
        let pos = offset + done as u64;
        let lba = pos / block_size;
        let within = (pos % block_size) as usize;
        let chunk = (block_size as usize - within).min(src.len() - done);

        if chunk != block_size as usize {
            io.read_blocks(Lba(lba), &mut block)?;
        }
        block[within..within + chunk].copy_from_slice(&src[done..done + chunk]);
        io.write_blocks(Lba(lba), &block)?;
        done += chunk;
    }
    io.flush()
}
