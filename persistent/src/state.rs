// Reading and writing the slot state

use crate::error::{Result, StateError};
use crate::layout::AreaLayout;
use crate::nvdata::{NvData, Pick, SlotFlags, FWVER_FW_MASK, FWVER_KEY_SHIFT};
use crate::storage::StateStore;
use alloc::string::String;
use alloc::vec;
use core::fmt;
use log::{debug, warn};

/// Slot selection state as read from the medium
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotState {
    pub fw_version: String,
    pub fw_vernum: u32,
    pub try_count: u8,
    pub try_b: bool,
    pub recovery: bool,
    pub result: u8,
    pub pick: Pick,
    /// The stored record was unusable and the empty state was substituted
    pub fallback: bool,
}

impl SlotState {
    fn from_nvdata(fw_version: String, nv: &NvData, fallback: bool) -> Self {
        let pick = if fallback {
            Pick::Recovery
        } else {
            Pick::from_bits(nv.flags.pick_bits()).unwrap_or_else(|| {
                warn!("unknown slot pick {}, using recovery", nv.flags.pick_bits());
                Pick::Recovery
            })
        };

        Self {
            fw_version,
            fw_vernum: nv.fw_vernum,
            try_count: nv.flags.try_count(),
            try_b: nv.flags.contains(SlotFlags::TRY_B),
            recovery: nv.flags.contains(SlotFlags::RECOVERY),
            result: nv.flags.result(),
            pick,
            fallback,
        }
    }

    pub fn to_nvdata(&self) -> NvData {
        let mut flags = SlotFlags::empty()
            .with_try_count(self.try_count)
            .with_result(self.result)
            .with_pick(self.pick);
        flags.set(SlotFlags::TRY_B, self.try_b);
        flags.set(SlotFlags::RECOVERY, self.recovery);
        NvData {
            fw_vernum: self.fw_vernum,
            flags,
        }
    }

    pub fn key_version(&self) -> u32 {
        self.fw_vernum >> FWVER_KEY_SHIFT
    }

    pub fn fw_version_number(&self) -> u32 {
        self.fw_vernum & FWVER_FW_MASK
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Version: {}\nVernum: {:x}/{:x}",
            self.fw_version,
            self.key_version(),
            self.fw_version_number()
        )
    }
}

fn tolerated(err: StateError) -> bool {
    matches!(
        err,
        StateError::BadRecord | StateError::OutOfRange | StateError::Denied
    )
}

fn read_version(layout: &AreaLayout, store: &mut dyn StateStore) -> Result<String> {
    let mut buf = vec![0u8; layout.version_size as usize];
    store.read(layout.version_addr(), &mut buf)?;
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf.truncate(len);
    String::from_utf8(buf).map_err(|_| StateError::BadVersion)
}

fn read_nvdata(layout: &AreaLayout, store: &mut dyn StateStore) -> Result<NvData> {
    let mut buf = vec![0u8; layout.state_size as usize];
    store.read(layout.state_addr(), &mut buf)?;
    NvData::decode(&buf)
}

/// Read the slot state described by `layout`.
///
/// A missing or corrupt record is replaced by the empty record with the
/// recovery slot picked. Transfer errors are returned.
pub fn read_state(layout: &AreaLayout, store: &mut dyn StateStore) -> Result<SlotState> {
    layout.validate()?;

    let fw_version = match read_version(layout, store) {
        Ok(v) => v,
        Err(StateError::BadVersion) => {
            warn!("{}: version field is not a string", store.name());
            String::new()
        }
        Err(e) if tolerated(e) => {
            warn!("{}: cannot read version: {}", store.name(), e);
            String::new()
        }
        Err(e) => return Err(e),
    };

    let (nv, fallback) = match read_nvdata(layout, store) {
        Ok(nv) => (nv, false),
        Err(e) if tolerated(e) => {
            warn!("{}: {}; Starting with empty state", store.name(), e);
            (NvData::default(), true)
        }
        Err(e) => return Err(e),
    };

    let state = SlotState::from_nvdata(fw_version, &nv, fallback);
    debug!(
        "{}: pick {} try_count {} try_b {}",
        store.name(),
        state.pick,
        state.try_count,
        state.try_b
    );
    Ok(state)
}

/// Store `state` back into the state field.
pub fn write_state(layout: &AreaLayout, store: &mut dyn StateStore, state: &SlotState) -> Result<()> {
    layout.validate()?;
    let record = state.to_nvdata().encode();
    store.write(layout.state_addr(), &record)
}
