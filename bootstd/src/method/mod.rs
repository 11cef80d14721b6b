//! Boot methods: one driver per boot-file packaging convention.
//!
//! Methods are registered once at startup and never change afterwards.
//! The iterator asks every method about every medium (or, for global
//! methods, once on its own) and never needs to know what a method does.

pub mod abrec;
pub mod distro;
pub mod efi;
pub mod fwcfg;
pub mod script;

pub use abrec::{AbrecConfig, AbrecMethod};
pub use distro::DistroMethod;
pub use efi::EfiMethod;
pub use fwcfg::FwCfgMethod;
pub use script::ScriptMethod;

use crate::bootflow::{Bootflow, ImageKind};
use crate::config::BootstdConfig;
use crate::dispatch::Executor;
use crate::error::{BootError, Result};
use crate::medium::{MediumHandle, Registry};
use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use bitflags::bitflags;
use bootstd_core::fs::Filesystem;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MethodFlags: u32 {
        /// Scanned once on its own instead of once per medium
        const GLOBAL = 1 << 0;
    }
}

/// What a method gets to see while it runs: the media, the medium it is
/// looking at (if any) and the configuration.
pub struct MethodCtx<'a> {
    media: &'a mut Registry,
    medium: Option<usize>,
    config: &'a BootstdConfig,
}

impl<'a> MethodCtx<'a> {
    pub fn new(media: &'a mut Registry, medium: Option<usize>, config: &'a BootstdConfig) -> Self {
        Self {
            media,
            medium,
            config,
        }
    }

    pub fn config(&self) -> &'a BootstdConfig {
        self.config
    }

    pub fn medium_seq(&self) -> Option<usize> {
        self.medium
    }

    /// The medium under scan. Global methods have none.
    pub fn medium(&mut self) -> Result<&mut MediumHandle> {
        let seq = self.medium.ok_or(BootError::NotFound)?;
        self.media.get_mut(seq).ok_or(BootError::NotFound)
    }

    pub fn media(&mut self) -> &mut Registry {
        &mut *self.media
    }

    pub fn mount(&mut self, part: u32) -> Result<Box<dyn Filesystem + '_>> {
        self.medium()?.mount(part)
    }
}

/// A boot method driver.
///
/// Only `name`, `description` and `read_bootflow` are required. The other
/// operations default to `Unsupported`, which callers treat as a no-op.
pub trait BootMethod {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn flags(&self) -> MethodFlags {
        MethodFlags::empty()
    }

    fn is_global(&self) -> bool {
        self.flags().contains(MethodFlags::GLOBAL)
    }

    /// Cheap test of whether this method can use the current medium.
    /// `Unsupported` skips the medium quietly.
    fn check(&self, _ctx: &mut MethodCtx<'_>) -> Result<()> {
        Ok(())
    }

    /// Advance `bflow` as far as possible. `bflow.part` is the sequence
    /// number being asked for.
    fn read_bootflow(&self, ctx: &mut MethodCtx<'_>, bflow: &mut Bootflow) -> Result<()>;

    /// Load an auxiliary file into `dst`, which is the memory at `addr`.
    fn read_file(
        &self,
        _ctx: &mut MethodCtx<'_>,
        _bflow: &mut Bootflow,
        _path: &str,
        _addr: u64,
        _kind: ImageKind,
        _dst: &mut [u8],
    ) -> Result<usize> {
        Err(BootError::Unsupported)
    }

    /// Hand control to the payload. `Ok` means the executor accepted it.
    fn boot(
        &self,
        _ctx: &mut MethodCtx<'_>,
        _bflow: &mut Bootflow,
        _exec: &mut dyn Executor,
    ) -> Result<()> {
        Err(BootError::Unsupported)
    }

    /// Human-readable description of any state the method keeps.
    fn state_desc(&self, _ctx: &mut MethodCtx<'_>) -> Result<String> {
        Err(BootError::Unsupported)
    }
}

/// Registered methods, in scan order.
#[derive(Default)]
pub struct MethodRegistry {
    methods: Vec<Box<dyn BootMethod>>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self {
            methods: Vec::new(),
        }
    }

    /// script, fwcfg, distro, efi and, when configured, abrec.
    pub fn standard(abrec: Option<AbrecConfig>) -> Self {
        let mut methods: Vec<Box<dyn BootMethod>> = alloc::vec![
            Box::new(ScriptMethod),
            Box::new(FwCfgMethod),
            Box::new(DistroMethod),
            Box::new(EfiMethod::new()),
        ];
        if let Some(config) = abrec {
            methods.push(Box::new(AbrecMethod::new(config)));
        }
        Self { methods }
    }

    /// Add a method; names must be unique. Returns its sequence number.
    pub fn register(&mut self, method: Box<dyn BootMethod>) -> Result<usize> {
        if self.find(method.name()).is_some() {
            return Err(BootError::Invalid);
        }
        self.methods.push(method);
        Ok(self.methods.len() - 1)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn get(&self, seq: usize) -> Option<&dyn BootMethod> {
        self.methods.get(seq).map(|m| m.as_ref())
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.methods.iter().position(|m| m.name() == name)
    }

    /// Look up by name, falling back to a hex sequence number.
    pub fn resolve(&self, id: &str) -> Option<usize> {
        self.find(id).or_else(|| {
            usize::from_str_radix(id, 16)
                .ok()
                .filter(|&seq| seq < self.methods.len())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn BootMethod> {
        self.methods.iter().map(|m| m.as_ref())
    }
}
