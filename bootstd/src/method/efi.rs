// EFI application loader

use super::{BootMethod, MethodCtx};
use crate::bootflow::{Bootflow, ImageKind};
use crate::dispatch::Executor;
use crate::error::{BootError, Result};
use crate::loader::{self, MAX_EFI_SIZE};
use crate::medium::MediumKind;
use alloc::string::String;
use log::info;

pub const EFI_DIR: &str = "/efi/boot/";

/// Removable-media application name for the architecture we run on.
pub const fn default_basename() -> &'static str {
    if cfg!(target_arch = "aarch64") {
        "bootaa64.efi"
    } else if cfg!(target_arch = "arm") {
        "bootarm.efi"
    } else if cfg!(target_arch = "x86") {
        "bootia32.efi"
    } else if cfg!(target_arch = "riscv32") {
        "bootriscv32.efi"
    } else if cfg!(target_arch = "riscv64") {
        "bootriscv64.efi"
    } else {
        "bootx64.efi"
    }
}

/// Preloads `efi/boot/<arch>.efi` from a partition and starts it.
pub struct EfiMethod {
    basename: String,
}

impl EfiMethod {
    pub fn new() -> Self {
        Self::with_basename(default_basename())
    }

    /// Look for `basename` instead of the host default.
    pub fn with_basename(basename: &str) -> Self {
        Self {
            basename: String::from(basename),
        }
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }
}

impl Default for EfiMethod {
    fn default() -> Self {
        Self::new()
    }
}

impl BootMethod for EfiMethod {
    fn name(&self) -> &str {
        "efi"
    }

    fn description(&self) -> &str {
        "EFI boot from an .efi file"
    }

    fn check(&self, ctx: &mut MethodCtx<'_>) -> Result<()> {
        match ctx.medium()?.kind() {
            MediumKind::Block => Ok(()),
            _ => Err(BootError::Unsupported),
        }
    }

    fn read_bootflow(&self, ctx: &mut MethodCtx<'_>, bflow: &mut Bootflow) -> Result<()> {
        if bflow.part == 0 {
            return Err(BootError::NotFound);
        }

        let mut fs = ctx.mount(bflow.part)?;
        loader::try_file(fs.as_mut(), bflow, EFI_DIR, &self.basename)?;
        loader::alloc_file(fs.as_mut(), bflow, MAX_EFI_SIZE, false)?;

        let fname = bflow.fname.clone();
        bflow.add_image(&fname, ImageKind::Efi, 0, bflow.size, true);
        Ok(())
    }

    fn read_file(
        &self,
        ctx: &mut MethodCtx<'_>,
        bflow: &mut Bootflow,
        path: &str,
        addr: u64,
        kind: ImageKind,
        dst: &mut [u8],
    ) -> Result<usize> {
        loader::read_file_common(ctx, bflow, path, addr, kind, dst)
    }

    fn boot(
        &self,
        ctx: &mut MethodCtx<'_>,
        bflow: &mut Bootflow,
        exec: &mut dyn Executor,
    ) -> Result<()> {
        let image = bflow.content().ok_or(BootError::NotReady)?;
        // The running device tree, when the platform publishes one
        let fdt = ctx.config().env.get_hex("fdtcontroladdr");
        info!("{}: starting {} ({} bytes)", bflow.name, bflow.fname, image.len());
        exec.bootefi(image, fdt)
    }
}
