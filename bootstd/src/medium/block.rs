// Partitioned block device medium

use super::{Medium, MediumKind};
use crate::error::{BootError, Result};
use crate::iter::MAX_PART_PER_MEDIUM;
use alloc::boxed::Box;
use bootstd_core::disk::{scan_partitions, BlockRef, DeviceAdapter, DynBlockIo, PartitionTable};
use bootstd_core::fs::{self, Filesystem};
use gpt_disk_io::BlockIo;

/// Block device whose partition table is scanned on first probe.
pub struct BlockMedium<B: BlockIo> {
    io: DeviceAdapter<B>,
    table: Option<PartitionTable>,
    removable: bool,
}

impl<B: BlockIo> BlockMedium<B> {
    pub fn new(io: B) -> Self {
        Self {
            io: DeviceAdapter::new(io),
            table: None,
            removable: false,
        }
    }

    pub fn removable(mut self, removable: bool) -> Self {
        self.removable = removable;
        self
    }
}

impl<B: BlockIo> Medium for BlockMedium<B> {
    fn kind(&self) -> MediumKind {
        MediumKind::Block
    }

    fn is_removable(&self) -> bool {
        self.removable
    }

    fn probe(&mut self) -> Result<()> {
        if self.table.is_none() {
            let table = scan_partitions(BlockRef::new(&mut self.io))?;
            self.table = Some(table);
        }
        Ok(())
    }

    fn partitions(&mut self) -> Result<&PartitionTable> {
        self.probe()?;
        self.table.as_ref().ok_or(BootError::NotReady)
    }

    fn seq_limit(&mut self) -> Result<Option<u32>> {
        let last = self.partitions()?.last_index();
        Ok(Some(last.min(MAX_PART_PER_MEDIUM) + 1))
    }

    fn mount(&mut self, part: u32) -> Result<Box<dyn Filesystem + '_>> {
        self.probe()?;
        let start_lba = if part == 0 {
            0
        } else {
            self.table
                .as_ref()
                .and_then(|t| t.get(part))
                .map(|p| p.start_lba)
                .ok_or(BootError::NotFound)?
        };
        Ok(fs::mount(&mut self.io, start_lba)?)
    }

    fn block_io(&mut self) -> Option<&mut DynBlockIo<'_>> {
        Some(&mut self.io)
    }
}
