// extlinux.conf discovery on block partitions

use super::{BootMethod, MethodCtx};
use crate::bootflow::{Bootflow, ImageKind};
use crate::dispatch::Executor;
use crate::error::{BootError, Result};
use crate::loader::{self, MAX_CONF_SIZE};
use crate::medium::MediumKind;
use core::str;

pub const DISTRO_FNAME: &str = "extlinux/extlinux.conf";

/// Finds `extlinux/extlinux.conf` under each filename prefix and hands it
/// to the platform's extlinux processor.
pub struct DistroMethod;

impl BootMethod for DistroMethod {
    fn name(&self) -> &str {
        "distro"
    }

    fn description(&self) -> &str {
        "Distro boot from extlinux.conf"
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

        let prefixes = &ctx.config().prefixes;
        let mut fs = ctx.mount(bflow.part)?;
        loader::try_prefixes(fs.as_mut(), bflow, prefixes, &[DISTRO_FNAME])?;
        loader::alloc_file(fs.as_mut(), bflow, MAX_CONF_SIZE, true)?;

        let fname = bflow.fname.clone();
        bflow.add_image(&fname, ImageKind::Extlinux, 0, bflow.size, true);
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
        let conf = bflow.content().ok_or(BootError::NotReady)?;
        let conf = str::from_utf8(conf).map_err(|_| BootError::Invalid)?;
        log::info!("{}: processing {}", bflow.name, bflow.fname);
        exec.extlinux(conf, &bflow.subdir, &ctx.config().env)
    }
}
