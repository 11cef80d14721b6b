// GPT provisioning: protective MBR, primary and secondary tables

use super::partition::PartitionKind;
use super::{DiskError, Result};
use alloc::vec;
use gpt_disk_io::{BlockIo, Disk};
use gpt_disk_types::{
    BlockSize, GptHeader, GptPartitionEntry, GptPartitionEntryArray, LbaLe, U32Le,
};
use uguid::{guid, Guid};

const NUM_ENTRIES: u32 = 128;
const ENTRY_SIZE: u32 = 128;
/// Header block plus the 16 KiB entry array
const GPT_RESERVED_BLOCKS: u64 = 1 + (NUM_ENTRIES as u64 * ENTRY_SIZE as u64) / 512;

const DISK_GUID: Guid = guid!("5b3e1f0a-8c2d-4e6f-9a1b-3c5d7e9f0b2d");

/// One partition to lay down, in GPT entry order.
#[derive(Clone, Copy, Debug)]
pub struct PartitionSpec {
    pub kind: PartitionKind,
    pub start_lba: u64,
    pub end_lba: u64,
}

fn unique_guid(slot: usize) -> Guid {
    let mut bytes = DISK_GUID.to_bytes();
    bytes[15] = slot as u8;
    bytes[14] ^= 0x5a;
    Guid::from_bytes(bytes)
}

/// Write a fresh GPT holding `parts` (entry 0 becomes partition 1).
///
/// Only 512-byte sectors are supported.
pub fn write_gpt<B: BlockIo>(mut block_io: B, parts: &[PartitionSpec]) -> Result<()> {
    if block_io.block_size() != BlockSize::BS_512 {
        return Err(DiskError::UnsupportedBlockSize);
    }
    let num_blocks = block_io.num_blocks().map_err(|_| DiskError::Io)?;
    if num_blocks < 2 * (GPT_RESERVED_BLOCKS + 1) + 1 {
        return Err(DiskError::OutOfRange);
    }
    if parts.len() > NUM_ENTRIES as usize {
        return Err(DiskError::NoSpace);
    }

    let first_usable = GPT_RESERVED_BLOCKS + 1;
    let last_usable = num_blocks - GPT_RESERVED_BLOCKS - 1;
    for (i, part) in parts.iter().enumerate() {
        if part.start_lba < first_usable
            || part.end_lba > last_usable
            || part.start_lba > part.end_lba
        {
            return Err(DiskError::InvalidLayout);
        }
        let overlaps = parts[..i]
            .iter()
            .any(|p| part.start_lba <= p.end_lba && p.start_lba <= part.end_lba);
        if overlaps {
            return Err(DiskError::InvalidLayout);
        }
    }

    let mut disk = Disk::new(block_io).map_err(|_| DiskError::Io)?;

    let mut header = GptHeader {
        my_lba: LbaLe::from_u64(1),
        alternate_lba: LbaLe::from_u64(num_blocks - 1),
        first_usable_lba: LbaLe::from_u64(first_usable),
        last_usable_lba: LbaLe::from_u64(last_usable),
        disk_guid: DISK_GUID,
        partition_entry_lba: LbaLe::from_u64(2),
        number_of_partition_entries: U32Le::from_u32(NUM_ENTRIES),
        size_of_partition_entry: U32Le::from_u32(ENTRY_SIZE),
        ..Default::default()
    };

    let mut mbr_buf = [0u8; 512];
    disk.write_protective_mbr(&mut mbr_buf)
        .map_err(|_| DiskError::Io)?;

    let layout = header
        .get_partition_entry_array_layout()
        .map_err(|_| DiskError::InvalidHeader)?;

    let mut entry_buf = vec![0u8; (NUM_ENTRIES * ENTRY_SIZE) as usize];
    let mut entry_array = GptPartitionEntryArray::new(layout, BlockSize::BS_512, &mut entry_buf)
        .map_err(|_| DiskError::InvalidHeader)?;

    for (slot, part) in parts.iter().enumerate() {
        let entry = entry_array
            .get_partition_entry_mut(slot as u32)
            .ok_or(DiskError::NoSpace)?;
        *entry = GptPartitionEntry {
            partition_type_guid: part.kind.to_gpt_type(),
            unique_partition_guid: unique_guid(slot),
            starting_lba: LbaLe::from_u64(part.start_lba),
            ending_lba: LbaLe::from_u64(part.end_lba),
            ..Default::default()
        };
    }

    header.partition_entry_array_crc32 = entry_array.calculate_crc32();
    header.update_header_crc32();

    disk.write_primary_gpt_header(&header, &mut [0u8; 512])
        .map_err(|_| DiskError::Io)?;
    disk.write_gpt_partition_entry_array(&entry_array)
        .map_err(|_| DiskError::Io)?;

    // Secondary copy: entry array sits right before the backup header
    let mut secondary = header.clone();
    secondary.my_lba = header.alternate_lba;
    secondary.alternate_lba = header.my_lba;
    secondary.partition_entry_lba = LbaLe::from_u64(num_blocks - GPT_RESERVED_BLOCKS);
    secondary.update_header_crc32();

    disk.write_secondary_gpt_header(&secondary, &mut [0u8; 512])
        .map_err(|_| DiskError::Io)?;

    let secondary_layout = secondary
        .get_partition_entry_array_layout()
        .map_err(|_| DiskError::InvalidHeader)?;
    let mut secondary_buf = entry_array.storage().to_vec();
    let secondary_array =
        GptPartitionEntryArray::new(secondary_layout, BlockSize::BS_512, &mut secondary_buf)
            .map_err(|_| DiskError::InvalidHeader)?;
    disk.write_gpt_partition_entry_array(&secondary_array)
        .map_err(|_| DiskError::Io)?;

    disk.flush().map_err(|_| DiskError::Io)?;
    log::debug!("gpt: wrote {} partitions", parts.len());
    Ok(())
}
