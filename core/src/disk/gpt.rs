// GPT scanning using gpt-disk-rs

use super::partition::{PartitionInfo, PartitionKind, PartitionTable};
use super::{DiskError, Result};
use alloc::vec;
use gpt_disk_io::{BlockIo, Disk};

/// Largest entry array accepted from a header
const MAX_ENTRY_ARRAY_BYTES: u64 = 1 << 20;

/// Scan a disk for a GPT and return its partition table.
///
/// A disk without a GPT signature yields an empty table. A GPT whose
/// header or entry array cannot be used, or whose CRCs do not match, is
/// `InvalidHeader`.
pub fn scan_partitions<B: BlockIo>(block_io: B) -> Result<PartitionTable> {
    let mut table = PartitionTable::new();
    let block_size = block_io.block_size();
    let block_bytes = block_size
        .to_usize()
        .ok_or(DiskError::UnsupportedBlockSize)?;

    let mut disk = Disk::new(block_io).map_err(|_| DiskError::Io)?;

    let mut block_buf = vec![0u8; block_bytes];
    let header = disk
        .read_primary_gpt_header(&mut block_buf)
        .map_err(|_| DiskError::Io)?;

    if !header.is_signature_valid() {
        // No GPT is not an error
        return Ok(table);
    }
    if header.calculate_header_crc32() != header.header_crc32 {
        log::warn!("gpt: header crc mismatch");
        return Err(DiskError::InvalidHeader);
    }
    table.has_gpt = true;

    let layout = header
        .get_partition_entry_array_layout()
        .map_err(|_| DiskError::InvalidHeader)?;
    let array_bytes = layout
        .num_bytes_rounded_to_block(block_size)
        .filter(|&n| n <= MAX_ENTRY_ARRAY_BYTES)
        .ok_or(DiskError::InvalidHeader)?;

    let mut array_buf = vec![0u8; array_bytes as usize];
    let entries = disk
        .read_gpt_partition_entry_array(layout, &mut array_buf)
        .map_err(|_| DiskError::Io)?;
    if entries.calculate_crc32() != header.partition_entry_array_crc32 {
        log::warn!("gpt: entry array crc mismatch");
        return Err(DiskError::InvalidHeader);
    }

    for index in 0..layout.num_entries {
        let Some(entry) = entries.get_partition_entry(index) else {
            break;
        };
        if !entry.is_used() {
            continue;
        }

        // Copy the guid to avoid unaligned reference
        let guid = entry.partition_type_guid.0;
        let start_lba = entry.starting_lba.to_u64();
        let end_lba = entry.ending_lba.to_u64();
        if end_lba < start_lba {
            return Err(DiskError::InvalidLayout);
        }

        table.add_partition(PartitionInfo {
            index: index + 1,
            kind: PartitionKind::from_guid(&guid),
            type_guid: guid,
            start_lba,
            end_lba,
            block_size: block_size.to_u32(),
        });
    }

    log::debug!("gpt: {} partitions", table.count());
    Ok(table)
}
