// Distro boot script method

use super::{BootMethod, MethodCtx};
use crate::bootflow::{Bootflow, ImageKind};
use crate::dispatch::Executor;
use crate::error::{BootError, Result};
use crate::loader::{self, MAX_SCRIPT_SIZE};
use crate::medium::MediumKind;
use alloc::format;

pub const SCRIPT_FNAME1: &str = "boot.scr.uimg";
pub const SCRIPT_FNAME2: &str = "boot.scr";

const IH_MAGIC: u32 = 0x2705_1956;
const IH_TYPE_SCRIPT: u8 = 6;
const IH_HEADER_LEN: usize = 64;

fn be32(buf: &[u8], off: usize) -> Option<u32> {
    let bytes = buf.get(off..off + 4)?;
    Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Script text from a loaded file: either plain text or a legacy image
/// of type "script" whose payload starts with a zero-terminated length table.
pub fn script_text(content: &[u8]) -> Result<&str> {
    let text = if be32(content, 0) == Some(IH_MAGIC) {
        let header = content.get(..IH_HEADER_LEN).ok_or(BootError::Invalid)?;
        if header[30] != IH_TYPE_SCRIPT {
            return Err(BootError::Invalid);
        }
        let data_len = be32(header, 12).ok_or(BootError::Invalid)? as usize;
        let data = content
            .get(IH_HEADER_LEN..IH_HEADER_LEN.saturating_add(data_len))
            .ok_or(BootError::Invalid)?;

        let script_len = be32(data, 0).ok_or(BootError::Invalid)? as usize;
        let mut off = 0;
        while be32(data, off).ok_or(BootError::Invalid)? != 0 {
            off += 4;
        }
        off += 4;
        data.get(off..off.saturating_add(script_len))
            .ok_or(BootError::Invalid)?
    } else {
        content
    };

    let len = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    core::str::from_utf8(&text[..len]).map_err(|_| BootError::Invalid)
}

/// Runs `boot.scr.uimg` / `boot.scr` found on a partition of a block device.
pub struct ScriptMethod;

impl BootMethod for ScriptMethod {
    fn name(&self) -> &str {
        "script"
    }

    fn description(&self) -> &str {
        "Script boot from a block device"
    }

    fn check(&self, ctx: &mut MethodCtx<'_>) -> Result<()> {
        match ctx.medium()?.kind() {
            MediumKind::Block => Ok(()),
            _ => Err(BootError::Unsupported),
        }
    }

    fn read_bootflow(&self, ctx: &mut MethodCtx<'_>, bflow: &mut Bootflow) -> Result<()> {
        // Scripts live in a filesystem, never on the raw disk
        if bflow.part == 0 {
            return Err(BootError::NotFound);
        }

        let prefixes = &ctx.config().prefixes;
        let mut fs = ctx.mount(bflow.part)?;
        loader::try_prefixes(fs.as_mut(), bflow, prefixes, &[SCRIPT_FNAME1, SCRIPT_FNAME2])?;
        loader::alloc_file(fs.as_mut(), bflow, MAX_SCRIPT_SIZE, true)?;

        let fname = bflow.fname.clone();
        bflow.add_image(&fname, ImageKind::Script, 0, bflow.size, true);
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
        let script = script_text(bflow.content().ok_or(BootError::NotReady)?)?;

        let mut env = ctx.config().env.clone();
        let medium = ctx.medium()?;
        let script_name = bflow
            .fname
            .rsplit('/')
            .next()
            .unwrap_or(bflow.fname.as_str());
        env.set("devtype", medium.uclass());
        env.set("devnum", &format!("{}", medium.seq()));
        env.set("distro_bootpart", &format!("{:x}", bflow.part));
        env.set("prefix", &bflow.subdir);
        env.set("script", script_name);

        log::info!("{}: running {}", bflow.name, bflow.fname);
        exec.run_script(script, &env)
    }
}
