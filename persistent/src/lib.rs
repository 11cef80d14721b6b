//! Persistent slot state
//!
//! A/B/recovery selection state lives in a small fixed-layout record
//! inside a declared byte range of a storage medium.
//!
//! # Layout
//!
//! The firmware configuration declares an area (start and size) and, inside
//! it, a version string field and a state field. The state field holds the
//! 64-byte nvdata record:
//!
//! ```text
//! 0x00  crc8        over bytes 1..size
//! 0x01  hdr         low nibble: version (1), high nibble: log2(size)
//! 0x02  spare
//! 0x04  fw_vernum   key version << 16 | firmware version
//! 0x08  flags       try count, try-B, recovery, result, pick
//! 0x0c  spare
//! ```
//!
//! Reading is tolerant: an unreadable or corrupt record becomes the
//! all-zero record with the recovery slot picked. Deciding when to
//! advance between slots is left to platform policy code, which writes
//! its decision back through [`write_state`].

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod error;
pub mod layout;
pub mod nvdata;
pub mod state;
pub mod storage;

pub use error::{Result, StateError};
pub use layout::AreaLayout;
pub use nvdata::{crc8, NvData, Pick, SlotFlags};
pub use state::{read_state, write_state, SlotState};
pub use storage::{block::BlockStateStore, StateStore};
