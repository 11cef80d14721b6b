// Block-device state storage

use super::StateStore;
use crate::error::Result;
use bootstd_core::disk::{read_bytes, write_bytes, DynBlockIo};

/// State area stored directly on a block device, outside any filesystem.
pub struct BlockStateStore<'a> {
    io: &'a mut DynBlockIo<'a>,
    name: &'a str,
}

impl<'a> BlockStateStore<'a> {
    pub fn new(name: &'a str, io: &'a mut DynBlockIo<'a>) -> Self {
        Self { io, name }
    }
}

impl StateStore for BlockStateStore<'_> {
    fn read(&mut self, offset: u64, dst: &mut [u8]) -> Result<()> {
        read_bytes(self.io, offset, dst)?;
        Ok(())
    }

    fn write(&mut self, offset: u64, src: &[u8]) -> Result<()> {
        write_bytes(self.io, offset, src)?;
        Ok(())
    }

    fn name(&self) -> &str {
        self.name
    }
}
