//! bootstd: boot orchestration
//!
//! Finds out which of the attached media carry something bootable, in
//! which packaging convention, and hands it to the loader that knows how
//! to run it.
//!
//! - [`medium`]: boot media and their registry
//! - [`method`]: boot-method drivers (script, fwcfg, distro, efi, abrec)
//! - [`bootflow`]: one discovered candidate and its state machine
//! - [`iter`]: the lazy scan over methods x media x sequence numbers
//! - [`dispatch`]: booting a candidate, and the fallback chain
//! - [`cmd`]: the `list` / `select` / `info` / `bootflows` commands

#![cfg_attr(not(test), no_std)]
#![allow(clippy::new_without_default)]

extern crate alloc;

pub mod bootflow;
pub mod cmd;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod iter;
pub mod loader;
pub mod medium;
pub mod method;

pub use bootflow::{Bootflow, BootflowState, ImageKind, SubImage};
pub use cmd::CmdContext;
pub use config::{BootstdConfig, Env, Properties};
pub use context::Bootstd;
pub use dispatch::{Executor, Image, KernelArgs};
pub use error::{BootError, Discovery, Result};
pub use iter::{BootflowIter, ScanError, ScanFlags, ScanOptions};
pub use medium::{BlockMedium, FwCfg, FwCfgKey, FwCfgMedium, Medium, MediumKind, Registry};
pub use method::{BootMethod, MethodCtx, MethodFlags, MethodRegistry};
