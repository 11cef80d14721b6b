// Top-level bootstd state: media, methods and configuration

use crate::bootflow::{Bootflow, ImageKind};
use crate::config::BootstdConfig;
use crate::dispatch::{self, Executor};
use crate::error::{BootError, Result};
use crate::iter::{BootflowIter, ScanOptions};
use crate::medium::{Medium, Registry};
use crate::method::{AbrecConfig, BootMethod, MethodCtx, MethodRegistry};
use alloc::boxed::Box;
use alloc::string::String;

/// Everything the scan and the dispatcher work on. The front end owns one.
pub struct Bootstd {
    pub media: Registry,
    pub methods: MethodRegistry,
    pub config: BootstdConfig,
}

impl Bootstd {
    /// Standard methods; abrec only when configured.
    pub fn new(config: BootstdConfig, abrec: Option<AbrecConfig>) -> Self {
        Self::with_methods(config, MethodRegistry::standard(abrec))
    }

    pub fn with_methods(config: BootstdConfig, methods: MethodRegistry) -> Self {
        Self {
            media: Registry::new(),
            methods,
            config,
        }
    }

    pub fn add_medium(
        &mut self,
        name: &str,
        driver: Box<dyn Medium>,
        parent: Option<usize>,
    ) -> Result<usize> {
        self.media.add(name, driver, parent)
    }

    pub fn add_method(&mut self, method: Box<dyn BootMethod>) -> Result<usize> {
        self.methods.register(method)
    }

    pub fn scan(&mut self, opts: ScanOptions) -> BootflowIter<'_> {
        BootflowIter::new(self, opts)
    }

    /// Load an auxiliary file for `bflow` through the method that found it.
    pub fn read_file(
        &mut self,
        bflow: &mut Bootflow,
        path: &str,
        addr: u64,
        kind: ImageKind,
        dst: &mut [u8],
    ) -> Result<usize> {
        let method = self.methods.get(bflow.method).ok_or(BootError::NotFound)?;
        let mut ctx = MethodCtx::new(&mut self.media, bflow.medium, &self.config);
        method.read_file(&mut ctx, bflow, path, addr, kind, dst)
    }

    pub fn state_desc(&mut self, method: usize) -> Result<String> {
        let method = self.methods.get(method).ok_or(BootError::NotFound)?;
        let mut ctx = MethodCtx::new(&mut self.media, None, &self.config);
        method.state_desc(&mut ctx)
    }

    pub fn boot(&mut self, bflow: &mut Bootflow, exec: &mut dyn Executor) -> Result<()> {
        dispatch::boot(self, bflow, exec)
    }

    pub fn boot_first(&mut self, opts: ScanOptions, exec: &mut dyn Executor) -> Result<()> {
        dispatch::boot_first(self, opts, exec)
    }
}
