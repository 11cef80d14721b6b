//! bootstd core library
//!
//! Medium-side collaborators for the boot orchestrator: block device
//! access, GPT partition tables, a read-only FAT32 reader and the
//! firmware log sink. Designed to be no_std compatible.

#![cfg_attr(not(test), no_std)]
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod disk;
pub mod fs;
pub mod logger;
