//! Handing a ready bootflow to its method, and the fallback chain.
//!
//! Actually executing a payload (running a script, jumping to a kernel) is
//! platform code behind [`Executor`]. A call that returns `Ok` means the
//! executor accepted the payload; on real hardware it does not return.

use crate::bootflow::Bootflow;
use crate::config::Env;
use crate::context::Bootstd;
use crate::error::{BootError, Result};
use crate::iter::{Cursor, ScanFlags, ScanOptions};
use crate::method::MethodCtx;
use log::{debug, error, info};

/// A payload placed in memory
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Image {
    pub addr: u64,
    pub size: u64,
}

/// Everything a kernel boot command needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KernelArgs<'a> {
    pub kernel: Image,
    pub ramdisk: Option<Image>,
    /// x86 setup block, only for zboot
    pub setup: Option<Image>,
    pub fdt: Option<u64>,
    pub cmdline: Option<&'a str>,
}

/// Platform hooks that take over the machine.
///
/// Every hook defaults to `Unsupported` so a platform only implements what
/// it can run.
pub trait Executor {
    /// Run a boot script with `env` as its environment.
    fn run_script(&mut self, _script: &str, _env: &Env) -> Result<()> {
        Err(BootError::Unsupported)
    }

    /// Boot from an extlinux configuration. Paths in it are relative to
    /// `prefix`.
    fn extlinux(&mut self, _conf: &str, _prefix: &str, _env: &Env) -> Result<()> {
        Err(BootError::Unsupported)
    }

    /// ARM64 Image
    fn booti(&mut self, _args: &KernelArgs<'_>) -> Result<()> {
        Err(BootError::Unsupported)
    }

    /// ARM zImage
    fn bootz(&mut self, _args: &KernelArgs<'_>) -> Result<()> {
        Err(BootError::Unsupported)
    }

    /// x86 bzImage
    fn zboot(&mut self, _args: &KernelArgs<'_>) -> Result<()> {
        Err(BootError::Unsupported)
    }

    /// Start an EFI application already read into memory. `fdt` is the
    /// device tree to hand over, if any.
    fn bootefi(&mut self, _image: &[u8], _fdt: Option<u64>) -> Result<()> {
        Err(BootError::Unsupported)
    }
}

/// Boot one bootflow through the method that found it.
///
/// The bootflow must have reached `Ready` without a fault. Failures are
/// logged and returned; nothing is retried.
pub fn boot(std: &mut Bootstd, bflow: &mut Bootflow, exec: &mut dyn Executor) -> Result<()> {
    if !bflow.is_valid() {
        debug!(
            "{}: not bootable (state {}, err {:?})",
            bflow.name,
            bflow.state(),
            bflow.err()
        );
        return Err(BootError::NotReady);
    }

    let method = std.methods.get(bflow.method).ok_or(BootError::NotFound)?;
    let mut ctx = MethodCtx::new(&mut std.media, bflow.medium, &std.config);
    info!("{}: booting with {}", bflow.name, method.name());
    method.boot(&mut ctx, bflow, exec).map_err(|e| {
        error!("{}: boot failed: {}", bflow.name, e);
        e
    })
}

/// Scan and boot the first candidate that works.
///
/// A method that cannot boot what it found (`Unsupported`) passes over to
/// the next candidate. Any other failure ends the attempt. Returns
/// `NotFound` when the scan produced nothing bootable.
pub fn boot_first(std: &mut Bootstd, opts: ScanOptions, exec: &mut dyn Executor) -> Result<()> {
    let mut iter_opts = opts;
    iter_opts.flags.remove(ScanFlags::ALL);

    let mut cursor = Cursor::default();
    while let Some(item) = cursor.step(std, &iter_opts) {
        let mut bflow = match item {
            Ok(bflow) => bflow,
            Err(e) => {
                debug!("{}", e);
                continue;
            }
        };
        if !bflow.is_valid() {
            continue;
        }
        match boot(std, &mut bflow, exec) {
            Ok(()) => return Ok(()),
            Err(BootError::Unsupported) => {
                info!("{}: method cannot boot this, trying next", bflow.name);
            }
            Err(e) => return Err(e),
        }
    }
    Err(BootError::NotFound)
}
