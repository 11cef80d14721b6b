// Declared byte range holding the slot state

use crate::error::{Result, StateError};
use crate::nvdata::NVDATA_LEN;

/// Longest version string the area may declare
pub const MAX_VERSION_LEN: u64 = 256;
/// Largest state field read in one go
pub const MAX_STATE_LEN: u64 = 512;

/// Offsets are relative to `area_start`, which is a byte offset on the
/// storage medium.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AreaLayout {
    pub area_start: u64,
    pub area_size: u64,
    pub version_offset: u64,
    pub version_size: u64,
    pub state_offset: u64,
    pub state_size: u64,
    /// Bytes of the area an image loader skips; recorded, not interpreted here
    pub skip_offset: u64,
}

fn field_end(offset: u64, size: u64, area_size: u64) -> Result<u64> {
    let end = offset
        .checked_add(size)
        .ok_or(StateError::InvalidLayout)?;
    if end > area_size {
        return Err(StateError::OutOfRange);
    }
    Ok(end)
}

impl AreaLayout {
    /// Check sizes, bounds and overlap before anything is read.
    pub fn validate(&self) -> Result<()> {
        if self.area_size == 0 || self.area_start.checked_add(self.area_size).is_none() {
            return Err(StateError::InvalidLayout);
        }
        if self.version_size == 0 || self.version_size > MAX_VERSION_LEN {
            return Err(StateError::InvalidLayout);
        }
        if self.state_size < NVDATA_LEN as u64 || self.state_size > MAX_STATE_LEN {
            return Err(StateError::InvalidLayout);
        }

        let version_end = field_end(self.version_offset, self.version_size, self.area_size)?;
        let state_end = field_end(self.state_offset, self.state_size, self.area_size)?;
        if self.version_offset < state_end && self.state_offset < version_end {
            return Err(StateError::InvalidLayout);
        }
        if self.skip_offset > self.area_size {
            return Err(StateError::OutOfRange);
        }
        Ok(())
    }

    /// Absolute medium offset of the version field
    pub fn version_addr(&self) -> u64 {
        self.area_start + self.version_offset
    }

    /// Absolute medium offset of the state field
    pub fn state_addr(&self) -> u64 {
        self.area_start + self.state_offset
    }
}
