// FAT32 directory entries and long file names

use super::context::FAT_ENTRY_MASK;
use alloc::string::String;

pub const DIR_ENTRY_SIZE: usize = 32;
pub const ATTR_VOLUME_ID: u8 = 0x08;
pub const ATTR_DIRECTORY: u8 = 0x10;
pub const ATTR_LONG_NAME: u8 = 0x0F;

const LFN_LAST: u8 = 0x40;
const LFN_CHARS: usize = 13;
const LFN_MAX_ENTRIES: usize = 20;
/// Byte offsets of the 13 UCS-2 characters inside an LFN entry
const LFN_CHAR_OFFSETS: [usize; LFN_CHARS] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];

/// Parsed short (8.3) directory entry
#[derive(Clone, Copy, Debug)]
pub struct DirEntry {
    pub name: [u8; 11],
    pub attr: u8,
    pub first_cluster: u32,
    pub file_size: u32,
}

impl DirEntry {
    pub fn parse(raw: &[u8]) -> Self {
        let mut name = [0u8; 11];
        name.copy_from_slice(&raw[..11]);
        let high = u16::from_le_bytes([raw[20], raw[21]]) as u32;
        let low = u16::from_le_bytes([raw[26], raw[27]]) as u32;
        Self {
            name,
            attr: raw[11],
            first_cluster: ((high << 16) | low) & FAT_ENTRY_MASK,
            file_size: u32::from_le_bytes([raw[28], raw[29], raw[30], raw[31]]),
        }
    }

    pub fn is_dir(&self) -> bool {
        self.attr & ATTR_DIRECTORY != 0
    }

    /// Whether this short name is what `component` turns into as 8.3.
    pub fn short_name_matches(&self, component: &str) -> bool {
        match to_short_name(component) {
            Some(short) => short == self.name,
            None => false,
        }
    }
}

/// Upper-cased, space-padded 8.3 form, or None if it cannot be one.
fn to_short_name(component: &str) -> Option<[u8; 11]> {
    let (base, ext) = match component.rfind('.') {
        Some(0) => return None,
        Some(dot) => (&component[..dot], &component[dot + 1..]),
        None => (component, ""),
    };
    if base.is_empty() || base.len() > 8 || ext.len() > 3 || base.contains('.') {
        return None;
    }

    let mut short = [b' '; 11];
    for (dst, src) in short[..8].iter_mut().zip(base.bytes()) {
        *dst = src.to_ascii_uppercase();
    }
    for (dst, src) in short[8..].iter_mut().zip(ext.bytes()) {
        *dst = src.to_ascii_uppercase();
    }
    Some(short)
}

pub fn lfn_checksum(short_name: &[u8; 11]) -> u8 {
    short_name.iter().fold(0u8, |sum, &c| {
        ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(c)
    })
}

/// Collects long-name fragments that precede a short entry.
pub struct LfnCollector {
    units: [u16; LFN_CHARS * LFN_MAX_ENTRIES],
    checksum: u8,
    expected: u8,
    active: bool,
}

impl LfnCollector {
    pub fn new() -> Self {
        Self {
            units: [0xFFFF; LFN_CHARS * LFN_MAX_ENTRIES],
            checksum: 0,
            expected: 0,
            active: false,
        }
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.units = [0xFFFF; LFN_CHARS * LFN_MAX_ENTRIES];
    }

    pub fn push(&mut self, raw: &[u8]) {
        let seq = raw[0];
        let ordinal = seq & 0x1F;
        if ordinal == 0 || ordinal as usize > LFN_MAX_ENTRIES {
            self.reset();
            return;
        }

        if seq & LFN_LAST != 0 {
            self.reset();
            self.active = true;
            self.checksum = raw[13];
        } else if !self.active || ordinal != self.expected || raw[13] != self.checksum {
            // Out of order fragment: forget the long name
            self.reset();
            return;
        }
        self.expected = ordinal - 1;

        let base = (ordinal as usize - 1) * LFN_CHARS;
        for (i, off) in LFN_CHAR_OFFSETS.iter().enumerate() {
            self.units[base + i] = u16::from_le_bytes([raw[*off], raw[*off + 1]]);
        }
    }

    /// Long name belonging to `entry`, if a complete one was collected.
    pub fn take(&mut self, entry: &DirEntry) -> Option<String> {
        let complete = self.active && self.expected == 0;
        let valid = complete && self.checksum == lfn_checksum(&entry.name);
        let name = if valid {
            let len = self
                .units
                .iter()
                .position(|&u| u == 0x0000 || u == 0xFFFF)
                .unwrap_or(self.units.len());
            char::decode_utf16(self.units[..len].iter().copied())
                .collect::<Result<String, _>>()
                .ok()
        } else {
            None
        };
        self.reset();
        name
    }
}
