// Partition information and classification

use alloc::vec::Vec;
use gpt_disk_types::GptPartitionType;
use uguid::{guid, Guid};

const LINUX_FS: Guid = guid!("0fc63daf-8483-4772-8e79-3d69d8477de4");
const LINUX_SWAP: Guid = guid!("0657fd6d-a4ab-43c4-84e5-0933c84b4f4f");
const XBOOTLDR: Guid = guid!("bc13c2ff-59e6-4262-a352-b275fd6f7172");

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PartitionInfo {
    /// 1-based partition number (GPT entry index + 1)
    pub index: u32,
    pub kind: PartitionKind,
    pub type_guid: Guid,
    pub start_lba: u64,
    pub end_lba: u64,
    pub block_size: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PartitionKind {
    EfiSystem,
    BasicData,
    LinuxFilesystem,
    LinuxSwap,
    XbootLdr,
    Unknown,
}

impl PartitionInfo {
    pub fn num_blocks(&self) -> u64 {
        self.end_lba.saturating_sub(self.start_lba) + 1
    }

    pub fn size_bytes(&self) -> u64 {
        self.num_blocks() * u64::from(self.block_size)
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.name()
    }
}

impl PartitionKind {
    pub fn from_guid(guid: &Guid) -> Self {
        if *guid == GptPartitionType::EFI_SYSTEM.0 {
            PartitionKind::EfiSystem
        } else if *guid == GptPartitionType::BASIC_DATA.0 {
            PartitionKind::BasicData
        } else if *guid == LINUX_FS {
            PartitionKind::LinuxFilesystem
        } else if *guid == LINUX_SWAP {
            PartitionKind::LinuxSwap
        } else if *guid == XBOOTLDR {
            PartitionKind::XbootLdr
        } else {
            PartitionKind::Unknown
        }
    }

    pub fn to_gpt_type(&self) -> GptPartitionType {
        match self {
            PartitionKind::EfiSystem => GptPartitionType::EFI_SYSTEM,
            PartitionKind::BasicData => GptPartitionType::BASIC_DATA,
            PartitionKind::LinuxFilesystem => GptPartitionType(LINUX_FS),
            PartitionKind::LinuxSwap => GptPartitionType(LINUX_SWAP),
            PartitionKind::XbootLdr => GptPartitionType(XBOOTLDR),
            PartitionKind::Unknown => GptPartitionType::UNUSED,
        }
    }

    /// Whether the partition can carry a filesystem at all.
    pub fn may_hold_filesystem(&self) -> bool {
        !matches!(self, PartitionKind::LinuxSwap)
    }

    pub fn name(&self) -> &'static str {
        match self {
            PartitionKind::EfiSystem => "EFI System",
            PartitionKind::BasicData => "Basic Data",
            PartitionKind::LinuxFilesystem => "Linux FS",
            PartitionKind::LinuxSwap => "Linux Swap",
            PartitionKind::XbootLdr => "XBOOTLDR",
            PartitionKind::Unknown => "Unknown",
        }
    }
}

/// Partition table for a disk, ordered by partition number.
#[derive(Clone, Debug, Default)]
pub struct PartitionTable {
    partitions: Vec<PartitionInfo>,
    pub has_gpt: bool,
}

impl PartitionTable {
    pub const fn new() -> Self {
        Self {
            partitions: Vec::new(),
            has_gpt: false,
        }
    }

    pub fn clear(&mut self) {
        self.partitions.clear();
        self.has_gpt = false;
    }

    pub fn add_partition(&mut self, info: PartitionInfo) {
        let pos = self
            .partitions
            .iter()
            .position(|p| p.index > info.index)
            .unwrap_or(self.partitions.len());
        self.partitions.insert(pos, info);
    }

    pub fn count(&self) -> usize {
        self.partitions.len()
    }

    /// Look up by 1-based partition number. Unused entries are gaps.
    pub fn get(&self, index: u32) -> Option<&PartitionInfo> {
        self.partitions.iter().find(|p| p.index == index)
    }

    /// Highest partition number in use, 0 for an empty table.
    pub fn last_index(&self) -> u32 {
        self.partitions.last().map(|p| p.index).unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PartitionInfo> {
        self.partitions.iter()
    }
}
