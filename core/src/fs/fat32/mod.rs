//! Read-only FAT32 volume.
//!
//! Lookup walks directory cluster chains and matches each path component
//! against the long name when one is present, else the 8.3 name. All
//! matching is ASCII case-insensitive.

pub mod context;
pub mod dir;

pub use context::Fat32Context;
pub use dir::DirEntry;

use super::{Filesystem, FsError, Result};
use crate::disk::DynBlockIo;
use alloc::vec;
use context::{END_OF_CHAIN, SECTOR_SIZE};
use dir::{LfnCollector, ATTR_DIRECTORY, ATTR_LONG_NAME, ATTR_VOLUME_ID, DIR_ENTRY_SIZE};
use gpt_disk_types::{BlockSize, Lba};

pub struct Fat32Volume<'a> {
    io: &'a mut DynBlockIo<'a>,
    partition_start: u64,
    ctx: Fat32Context,
}

impl<'a> Fat32Volume<'a> {
    pub fn mount(io: &'a mut DynBlockIo<'a>, partition_start: u64) -> Result<Self> {
        if io.block_size() != BlockSize::BS_512 {
            return Err(FsError::Unrecognized);
        }
        let ctx = Fat32Context::from_boot_sector(io, partition_start)?;
        Ok(Self {
            io,
            partition_start,
            ctx,
        })
    }

    pub fn context(&self) -> &Fat32Context {
        &self.ctx
    }

    fn read_sector(&mut self, sector: u32, dst: &mut [u8]) -> Result<()> {
        self.io
            .read_blocks(Lba(self.partition_start + sector as u64), dst)
            .map_err(|_| FsError::IoError)
    }

    fn next_cluster(&mut self, cluster: u32) -> Result<Option<u32>> {
        let next = self
            .ctx
            .read_fat_entry(self.io, self.partition_start, cluster)?;
        if next >= END_OF_CHAIN {
            Ok(None)
        } else if next < 2 {
            Err(FsError::Corrupt)
        } else {
            Ok(Some(next))
        }
    }

    fn find_in_dir(&mut self, dir_cluster: u32, component: &str) -> Result<Option<DirEntry>> {
        let mut sector_data = [0u8; SECTOR_SIZE];
        let mut lfn = LfnCollector::new();
        let mut cluster = dir_cluster;
        let mut hops = 0;

        loop {
            let first = self.ctx.cluster_to_sector(cluster)?;
            for sec_offset in 0..self.ctx.sectors_per_cluster {
                self.read_sector(first + sec_offset, &mut sector_data)?;

                for raw in sector_data.chunks_exact(DIR_ENTRY_SIZE) {
                    match raw[0] {
                        0x00 => return Ok(None),
                        0xE5 => {
                            lfn.reset();
                            continue;
                        }
                        _ => {}
                    }
                    if raw[11] == ATTR_LONG_NAME {
                        lfn.push(raw);
                        continue;
                    }

                    let entry = DirEntry::parse(raw);
                    let long_name = lfn.take(&entry);
                    if entry.attr & ATTR_VOLUME_ID != 0 {
                        continue;
                    }
                    let matches = match long_name {
                        Some(name) => name.eq_ignore_ascii_case(component),
                        None => entry.short_name_matches(component),
                    };
                    if matches {
                        return Ok(Some(entry));
                    }
                }
            }

            hops += 1;
            if hops > self.ctx.max_chain() {
                return Err(FsError::Corrupt);
            }
            match self.next_cluster(cluster)? {
                Some(next) => cluster = next,
                None => return Ok(None),
            }
        }
    }

    fn lookup(&mut self, path: &str) -> Result<DirEntry> {
        let mut current = DirEntry {
            name: *b"           ",
            attr: ATTR_DIRECTORY,
            first_cluster: self.ctx.root_cluster,
            file_size: 0,
        };

        for component in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
            if !current.is_dir() {
                return Err(FsError::NotFound);
            }
            let mut cluster = current.first_cluster;
            // ".." back to the root is stored as cluster 0
            if cluster == 0 {
                cluster = self.ctx.root_cluster;
            }
            current = self
                .find_in_dir(cluster, component)?
                .ok_or(FsError::NotFound)?;
        }
        Ok(current)
    }

    fn lookup_file(&mut self, path: &str) -> Result<DirEntry> {
        let entry = self.lookup(path)?;
        if entry.is_dir() {
            return Err(FsError::NotAFile);
        }
        Ok(entry)
    }

    fn read_data(&mut self, entry: &DirEntry, offset: u64, dst: &mut [u8]) -> Result<usize> {
        let size = entry.file_size as u64;
        if offset >= size || dst.is_empty() {
            return Ok(0);
        }
        let total = ((size - offset) as usize).min(dst.len());
        let cluster_bytes = self.ctx.cluster_bytes();

        let mut cluster = entry.first_cluster;
        let mut skip = offset as usize;
        let mut hops = 0;
        while skip >= cluster_bytes {
            cluster = self.next_cluster(cluster)?.ok_or(FsError::Corrupt)?;
            skip -= cluster_bytes;
            hops += 1;
            if hops > self.ctx.max_chain() {
                return Err(FsError::Corrupt);
            }
        }

        let mut cluster_data = vec![0u8; cluster_bytes];
        let mut done = 0;
        loop {
            let first = self.ctx.cluster_to_sector(cluster)?;
            for (i, chunk) in cluster_data.chunks_exact_mut(SECTOR_SIZE).enumerate() {
                self.read_sector(first + i as u32, chunk)?;
            }

            let n = (cluster_bytes - skip).min(total - done);
            dst[done..done + n].copy_from_slice(&cluster_data[skip..skip + n]);
            done += n;
            skip = 0;
            if done == total {
                return Ok(done);
            }

            hops += 1;
            if hops > self.ctx.max_chain() {
                return Err(FsError::Corrupt);
            }
            cluster = self.next_cluster(cluster)?.ok_or(FsError::Corrupt)?;
        }
    }
}

impl Filesystem for Fat32Volume<'_> {
    fn fs_type(&self) -> &'static str {
        "fat32"
    }

    fn size(&mut self, path: &str) -> Result<u64> {
        Ok(self.lookup_file(path)?.file_size as u64)
    }

    fn read(&mut self, path: &str, offset: u64, dst: &mut [u8]) -> Result<usize> {
        let entry = self.lookup_file(path)?;
        self.read_data(&entry, offset, dst)
    }
}
