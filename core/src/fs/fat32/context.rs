// FAT32 boot sector and FAT operations

use super::super::{FsError, Result};
use crate::disk::DynBlockIo;
use gpt_disk_types::Lba;

pub const SECTOR_SIZE: usize = 512;
pub const FAT_ENTRY_MASK: u32 = 0x0FFF_FFFF;
pub const END_OF_CHAIN: u32 = 0x0FFF_FFF8;
const BAD_CLUSTER: u32 = 0x0FFF_FFF7;
/// Highest cluster count a 28-bit FAT can address
const MAX_CLUSTERS: u32 = BAD_CLUSTER - 2;
const ENTRIES_PER_SECTOR: u32 = (SECTOR_SIZE / 4) as u32;

/// FAT32 filesystem context
#[derive(Clone, Copy, Debug)]
pub struct Fat32Context {
    pub sectors_per_cluster: u32,
    pub reserved_sectors: u32,
    pub fat_size: u32,
    pub num_fats: u32,
    pub root_cluster: u32,
    pub data_start_sector: u32,
    pub cluster_count: u32,
}

fn le16(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn le32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

impl Fat32Context {
    pub fn from_boot_sector(io: &mut DynBlockIo<'_>, partition_start: u64) -> Result<Self> {
        let mut boot_sector = [0u8; SECTOR_SIZE];
        io.read_blocks(Lba(partition_start), &mut boot_sector)
            .map_err(|_| FsError::IoError)?;

        if boot_sector[510] != 0x55 || boot_sector[511] != 0xAA {
            return Err(FsError::Unrecognized);
        }
        if le16(&boot_sector, 0x0B) as usize != SECTOR_SIZE {
            return Err(FsError::Unrecognized);
        }

        let sectors_per_cluster = boot_sector[0x0D] as u32;
        let reserved_sectors = le16(&boot_sector, 0x0E) as u32;
        let num_fats = boot_sector[0x10] as u32;
        let fat16_size = le16(&boot_sector, 0x16);
        let total_sectors = le32(&boot_sector, 0x20);
        let fat_size = le32(&boot_sector, 0x24);
        let root_cluster = le32(&boot_sector, 0x2C);

        // FAT12/16 volumes carry a 16-bit FAT size
        if fat16_size != 0 || fat_size == 0 {
            return Err(FsError::Unrecognized);
        }
        if !sectors_per_cluster.is_power_of_two() || reserved_sectors == 0 || num_fats == 0 {
            return Err(FsError::Corrupt);
        }

        let data_start_sector = num_fats
            .checked_mul(fat_size)
            .and_then(|fats| fats.checked_add(reserved_sectors))
            .ok_or(FsError::Corrupt)?;
        if data_start_sector >= total_sectors || root_cluster < 2 {
            return Err(FsError::Corrupt);
        }
        // The FAT itself bounds the cluster count, whatever total_sectors claims
        let fat_capacity = fat_size
            .saturating_mul(ENTRIES_PER_SECTOR)
            .saturating_sub(2);
        let cluster_count = ((total_sectors - data_start_sector) / sectors_per_cluster)
            .min(fat_capacity)
            .min(MAX_CLUSTERS);

        Ok(Self {
            sectors_per_cluster,
            reserved_sectors,
            fat_size,
            num_fats,
            root_cluster,
            data_start_sector,
            cluster_count,
        })
    }

    pub fn cluster_bytes(&self) -> usize {
        self.sectors_per_cluster as usize * SECTOR_SIZE
    }

    fn check_cluster(&self, cluster: u32) -> Result<()> {
        if cluster < 2 || cluster - 2 >= self.cluster_count {
            return Err(FsError::Corrupt);
        }
        Ok(())
    }

    pub fn cluster_to_sector(&self, cluster: u32) -> Result<u32> {
        self.check_cluster(cluster)?;
        Ok(self.data_start_sector + ((cluster - 2) * self.sectors_per_cluster))
    }

    pub fn read_fat_entry(
        &self,
        io: &mut DynBlockIo<'_>,
        partition_start: u64,
        cluster: u32,
    ) -> Result<u32> {
        self.check_cluster(cluster)?;
        let fat_offset = cluster.checked_mul(4).ok_or(FsError::Corrupt)?;
        let fat_sector = self.reserved_sectors + (fat_offset / SECTOR_SIZE as u32);
        let entry_offset = (fat_offset % SECTOR_SIZE as u32) as usize;

        let mut sector = [0u8; SECTOR_SIZE];
        io.read_blocks(Lba(partition_start + fat_sector as u64), &mut sector)
            .map_err(|_| FsError::IoError)?;

        let next = le32(&sector, entry_offset) & FAT_ENTRY_MASK;
        #[cfg(feature = "fat32_debug")]
        log::trace!("fat32: cluster {:#x} -> {:#x}", cluster, next);
        if next == BAD_CLUSTER {
            return Err(FsError::Corrupt);
        }
        Ok(next)
    }

    /// Upper bound on chain length; anything longer is a loop.
    pub fn max_chain(&self) -> u32 {
        self.cluster_count
    }
}
