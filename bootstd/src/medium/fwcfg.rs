// Firmware-config (QEMU fw_cfg) channel medium

use super::{Medium, MediumKind};
use crate::error::Result;

/// fw_cfg selectors used by the firmware-config boot method
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u16)]
pub enum FwCfgKey {
    KernelSize = 0x08,
    InitrdSize = 0x0b,
    KernelData = 0x11,
    InitrdData = 0x12,
    CmdlineSize = 0x14,
    CmdlineData = 0x15,
    SetupAddr = 0x16,
    SetupSize = 0x17,
    SetupData = 0x18,
}

impl FwCfgKey {
    pub fn selector(self) -> u16 {
        self as u16
    }
}

/// Transport for a firmware-config channel.
pub trait FwCfg {
    /// Copy the start of entry `key` into `dst`.
    fn read_entry(&mut self, key: FwCfgKey, dst: &mut [u8]) -> Result<()>;

    /// Transfer `size` bytes of entry `key` to physical address `addr`.
    fn load(&mut self, key: FwCfgKey, addr: u64, size: u64) -> Result<()>;

    fn read_u32(&mut self, key: FwCfgKey) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_entry(key, &mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }
}

pub struct FwCfgMedium<C: FwCfg> {
    chan: C,
}

impl<C: FwCfg> FwCfgMedium<C> {
    pub fn new(chan: C) -> Self {
        Self { chan }
    }
}

impl<C: FwCfg> Medium for FwCfgMedium<C> {
    fn kind(&self) -> MediumKind {
        MediumKind::FwCfg
    }

    fn fw_cfg(&mut self) -> Option<&mut dyn FwCfg> {
        Some(&mut self.chan)
    }
}
