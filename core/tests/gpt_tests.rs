//! GPT scan and provisioning tests

mod common;

use bootstd_core::disk::{
    scan_partitions, write_gpt, BlockRef, DeviceAdapter, DiskError, PartitionKind,
    PartitionSpec,
};
use common::MemoryBlockDevice;

fn provisioned(parts: &[PartitionSpec]) -> MemoryBlockDevice {
    let mut disk = DeviceAdapter::new(MemoryBlockDevice::zeroed(8192));
    write_gpt(BlockRef::new(&mut disk), parts).expect("write gpt");
    disk.into_inner()
}

#[test]
fn test_blank_disk_has_no_partitions() {
    let device = MemoryBlockDevice::zeroed(8192);
    let table = scan_partitions(device).expect("scan");
    assert!(!table.has_gpt);
    assert_eq!(table.count(), 0);
    assert_eq!(table.last_index(), 0);
}

#[test]
fn test_scan_returns_written_partitions() {
    let device = provisioned(&[
        PartitionSpec {
            kind: PartitionKind::EfiSystem,
            start_lba: 2048,
            end_lba: 4095,
        },
        PartitionSpec {
            kind: PartitionKind::LinuxFilesystem,
            start_lba: 4096,
            end_lba: 8000,
        },
    ]);

    let table = scan_partitions(DeviceAdapter::new(device)).expect("scan");
    assert!(table.has_gpt);
    assert_eq!(table.count(), 2);

    let esp = table.get(1).expect("partition 1");
    assert_eq!(esp.kind, PartitionKind::EfiSystem);
    assert_eq!(esp.start_lba, 2048);
    assert_eq!(esp.size_bytes(), 2048 * 512);

    let root = table.get(2).expect("partition 2");
    assert_eq!(root.kind, PartitionKind::LinuxFilesystem);
    assert_eq!(root.end_lba, 8000);
    assert_eq!(table.last_index(), 2);
}

#[test]
fn test_secondary_header_is_written() {
    let device = provisioned(&[PartitionSpec {
        kind: PartitionKind::BasicData,
        start_lba: 100,
        end_lba: 200,
    }]);
    let last = device.data.len() - 512;
    assert_eq!(&device.data[last..last + 8], b"EFI PART");
    assert_eq!(&device.data[512..520], b"EFI PART");
    // Protective MBR signature
    assert_eq!(&device.data[510..512], &[0x55, 0xAA]);
}

#[test]
fn test_overlapping_partitions_rejected() {
    let mut disk = DeviceAdapter::new(MemoryBlockDevice::zeroed(8192));
    let result = write_gpt(
        BlockRef::new(&mut disk),
        &[
            PartitionSpec {
                kind: PartitionKind::BasicData,
                start_lba: 100,
                end_lba: 300,
            },
            PartitionSpec {
                kind: PartitionKind::BasicData,
                start_lba: 200,
                end_lba: 400,
            },
        ],
    );
    assert_eq!(result, Err(DiskError::InvalidLayout));
}

#[test]
fn test_partition_outside_usable_range_rejected() {
    let mut disk = DeviceAdapter::new(MemoryBlockDevice::zeroed(8192));
    let result = write_gpt(
        BlockRef::new(&mut disk),
        &[PartitionSpec {
            kind: PartitionKind::BasicData,
            start_lba: 10,
            end_lba: 400,
        }],
    );
    assert_eq!(result, Err(DiskError::InvalidLayout));
}

fn one_partition() -> MemoryBlockDevice {
    provisioned(&[PartitionSpec {
        kind: PartitionKind::EfiSystem,
        start_lba: 2048,
        end_lba: 4095,
    }])
}

#[test]
fn test_corrupt_entry_array_rejected() {
    let mut device = one_partition();
    // Entry array at LBA 2; starting LBA sits 32 bytes into entry 0
    device.data[2 * 512 + 32] ^= 0x01;
    assert_eq!(
        scan_partitions(DeviceAdapter::new(device)).err(),
        Some(DiskError::InvalidHeader)
    );
}

#[test]
fn test_corrupt_header_rejected() {
    let mut device = one_partition();
    // Last usable LBA in the primary header
    device.data[512 + 48] ^= 0x80;
    assert_eq!(
        scan_partitions(DeviceAdapter::new(device)).err(),
        Some(DiskError::InvalidHeader)
    );
}
