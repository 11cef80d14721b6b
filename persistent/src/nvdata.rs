//! The nvdata record: checksummed firmware version number and slot flags.

use crate::error::{Result, StateError};
use bitflags::bitflags;
use core::fmt;

pub const NVDATA_LEN: usize = 64;
pub const NVDATA_VERSION: u8 = 1;

const HDR_VER_MASK: u8 = 0x0f;
const HDR_SIZE_SHIFT: u8 = 4;
/// Smallest record that still covers `fw_vernum` and `flags`
const MIN_RECORD: usize = 12;
const PICK_SHIFT: u32 = 6;
const RESULT_SHIFT: u32 = 4;

pub const FWVER_KEY_SHIFT: u32 = 16;
pub const FWVER_FW_MASK: u32 = 0xffff;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct SlotFlags: u32 {
        const TRY_COUNT = 0x3;
        const TRY_B = 1 << 2;
        const RECOVERY = 1 << 3;
        const RESULT = 0x3 << RESULT_SHIFT;
        const PICK = 0x3 << PICK_SHIFT;
    }
}

impl SlotFlags {
    pub fn try_count(&self) -> u8 {
        (self.bits() & Self::TRY_COUNT.bits()) as u8
    }

    pub fn result(&self) -> u8 {
        ((self.bits() & Self::RESULT.bits()) >> RESULT_SHIFT) as u8
    }

    pub fn pick_bits(&self) -> u8 {
        ((self.bits() & Self::PICK.bits()) >> PICK_SHIFT) as u8
    }

    pub fn with_try_count(self, count: u8) -> Self {
        let bits = (self.bits() & !Self::TRY_COUNT.bits()) | (count as u32 & 0x3);
        Self::from_bits_retain(bits)
    }

    pub fn with_result(self, result: u8) -> Self {
        let bits = (self.bits() & !Self::RESULT.bits()) | ((result as u32 & 0x3) << RESULT_SHIFT);
        Self::from_bits_retain(bits)
    }

    pub fn with_pick(self, pick: Pick) -> Self {
        let bits = (self.bits() & !Self::PICK.bits()) | ((pick.bits() as u32) << PICK_SHIFT);
        Self::from_bits_retain(bits)
    }
}

/// Which slot to boot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pick {
    A,
    B,
    Recovery,
}

impl Pick {
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Pick::A),
            1 => Some(Pick::B),
            2 => Some(Pick::Recovery),
            _ => None,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            Pick::A => 0,
            Pick::B => 1,
            Pick::Recovery => 2,
        }
    }

    /// Name used for the slot's directory on the OS partition
    pub fn name(&self) -> &'static str {
        match self {
            Pick::A => "a",
            Pick::B => "b",
            Pick::Recovery => "recovery",
        }
    }
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// CRC-8, polynomial 0x07, initial value 0, no reflection.
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |mut crc, &byte| {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x07
            } else {
                crc << 1
            };
        }
        crc
    })
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NvData {
    pub fw_vernum: u32,
    pub flags: SlotFlags,
}

impl NvData {
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < MIN_RECORD {
            return Err(StateError::BadRecord);
        }
        let hdr = buf[1];
        if hdr & HDR_VER_MASK != NVDATA_VERSION {
            return Err(StateError::BadRecord);
        }
        let size = 1usize << (hdr >> HDR_SIZE_SHIFT);
        if size < MIN_RECORD || size > NVDATA_LEN || size > buf.len() {
            return Err(StateError::BadRecord);
        }
        if crc8(&buf[1..size]) != buf[0] {
            return Err(StateError::BadRecord);
        }

        Ok(Self {
            fw_vernum: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            flags: SlotFlags::from_bits_retain(u32::from_le_bytes([
                buf[8], buf[9], buf[10], buf[11],
            ])),
        })
    }

    pub fn encode(&self) -> [u8; NVDATA_LEN] {
        let mut buf = [0u8; NVDATA_LEN];
        buf[1] = NVDATA_VERSION | ((NVDATA_LEN.trailing_zeros() as u8) << HDR_SIZE_SHIFT);
        buf[4..8].copy_from_slice(&self.fw_vernum.to_le_bytes());
        buf[8..12].copy_from_slice(&self.flags.bits().to_le_bytes());
        buf[0] = crc8(&buf[1..]);
        buf
    }

    pub fn key_version(&self) -> u32 {
        self.fw_vernum >> FWVER_KEY_SHIFT
    }

    pub fn fw_version(&self) -> u32 {
        self.fw_vernum & FWVER_FW_MASK
    }
}
