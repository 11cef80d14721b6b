// QEMU firmware-config boot method
//
// The kernel, initrd and setup block are never read through a filesystem.
// Sizes and the command line come over the channel at scan time; the
// payload itself is transferred straight to its load address at boot.

use super::{BootMethod, MethodCtx};
use crate::bootflow::{Bootflow, BootflowState, ImageKind};
use crate::dispatch::{Executor, Image, KernelArgs};
use crate::error::{BootError, Result};
use crate::medium::{FwCfg, FwCfgKey, MediumKind};
use alloc::format;
use alloc::string::String;
use alloc::vec;
use log::{debug, info, warn};

/// Longest command line read from the channel
const MAX_CMDLINE: u32 = 0x1000;

fn channel<'c>(ctx: &'c mut MethodCtx<'_>) -> Result<&'c mut dyn FwCfg> {
    ctx.medium()?
        .driver_mut()
        .fw_cfg()
        .ok_or(BootError::Unsupported)
}

fn read_cmdline(chan: &mut dyn FwCfg) -> Result<Option<String>> {
    let size = chan.read_u32(FwCfgKey::CmdlineSize)?;
    if size == 0 {
        return Ok(None);
    }
    if size > MAX_CMDLINE {
        return Err(BootError::TooLarge);
    }

    let mut buf = vec![0u8; size as usize];
    chan.read_entry(FwCfgKey::CmdlineData, &mut buf)?;
    let len = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    buf.truncate(len);
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| BootError::Invalid)
}

fn data_key(kind: ImageKind) -> Option<FwCfgKey> {
    match kind {
        ImageKind::Kernel => Some(FwCfgKey::KernelData),
        ImageKind::Ramdisk => Some(FwCfgKey::InitrdData),
        ImageKind::Setup => Some(FwCfgKey::SetupData),
        _ => None,
    }
}

pub struct FwCfgMethod;

impl BootMethod for FwCfgMethod {
    fn name(&self) -> &str {
        "fwcfg"
    }

    fn description(&self) -> &str {
        "QEMU boot using firmware interface"
    }

    fn check(&self, ctx: &mut MethodCtx<'_>) -> Result<()> {
        match ctx.medium()?.kind() {
            MediumKind::FwCfg => Ok(()),
            _ => Err(BootError::Unsupported),
        }
    }

    fn read_bootflow(&self, ctx: &mut MethodCtx<'_>, bflow: &mut Bootflow) -> Result<()> {
        let medium_name = String::from(ctx.medium()?.name());
        let chan = channel(ctx)?;

        let kernel_size = chan.read_u32(FwCfgKey::KernelSize)?;
        if kernel_size == 0 {
            debug!("{}: no kernel", medium_name);
            return Err(BootError::NotFound);
        }
        let initrd_size = chan.read_u32(FwCfgKey::InitrdSize)?;
        let setup_size = chan.read_u32(FwCfgKey::SetupSize)?;
        let setup_addr = if setup_size != 0 {
            chan.read_u32(FwCfgKey::SetupAddr)?
        } else {
            0
        };
        let cmdline = read_cmdline(chan)?;

        bflow.name = format!("{}.fwcfg", medium_name);
        bflow.advance(BootflowState::Media);
        if setup_size != 0 {
            bflow.add_image(
                "setup",
                ImageKind::Setup,
                setup_addr as u64,
                setup_size as u64,
                false,
            );
        }
        bflow.add_image("kernel", ImageKind::Kernel, 0, kernel_size as u64, false);
        if initrd_size != 0 {
            bflow.add_image("initrd", ImageKind::Ramdisk, 0, initrd_size as u64, false);
        }
        bflow.cmdline = cmdline;
        bflow.size = kernel_size as u64;
        bflow.advance(BootflowState::Ready);
        Ok(())
    }

    fn boot(
        &self,
        ctx: &mut MethodCtx<'_>,
        bflow: &mut Bootflow,
        exec: &mut dyn Executor,
    ) -> Result<()> {
        let env = &ctx.config().env;
        let kernel_addr = env.get_hex("kernel_addr_r").ok_or_else(|| {
            warn!("{}: kernel_addr_r not set", bflow.name);
            BootError::Invalid
        })?;
        let ramdisk_addr = if bflow.image(ImageKind::Ramdisk).is_some() {
            env.get_hex("ramdisk_addr_r").ok_or_else(|| {
                warn!("{}: ramdisk_addr_r not set", bflow.name);
                BootError::Invalid
            })?
        } else {
            0
        };

        let chan = channel(ctx)?;
        for img in bflow.images.iter_mut().filter(|img| !img.loaded) {
            let addr = match img.kind {
                ImageKind::Kernel => kernel_addr,
                ImageKind::Ramdisk => ramdisk_addr,
                _ => img.addr,
            };
            let key = data_key(img.kind).ok_or(BootError::Invalid)?;
            chan.load(key, addr, img.size)?;
            img.addr = addr;
            img.loaded = true;
        }
        bflow.advance(BootflowState::Loaded);

        let as_image = |kind| {
            bflow.image(kind).map(|img| Image {
                addr: img.addr,
                size: img.size,
            })
        };
        let args = KernelArgs {
            kernel: as_image(ImageKind::Kernel).ok_or(BootError::NotReady)?,
            ramdisk: as_image(ImageKind::Ramdisk),
            setup: as_image(ImageKind::Setup),
            fdt: None,
            cmdline: bflow.cmdline.as_deref(),
        };

        // Try each kernel format in turn; the executor rejects the ones
        // that do not match the image.
        match exec.booti(&args) {
            Ok(()) => return Ok(()),
            Err(e) => debug!("{}: booti: {}", bflow.name, e),
        }
        match exec.bootz(&args) {
            Ok(()) => return Ok(()),
            Err(e) => debug!("{}: bootz: {}", bflow.name, e),
        }
        if args.setup.is_some() {
            match exec.zboot(&args) {
                Ok(()) => return Ok(()),
                Err(e) => debug!("{}: zboot: {}", bflow.name, e),
            }
        }

        info!("{}: no boot format accepted the kernel", bflow.name);
        Err(BootError::IoFault)
    }
}
