//! Shared helpers for loading bootflow content.
//!
//! Two shapes are supported: a whole file found by name and copied into a
//! buffer the bootflow owns (64 KiB cap for scripts and configuration,
//! 32 MiB for EFI applications), and sub-images whose data the firmware
//! has already placed in memory (see the firmware-config method).

use crate::bootflow::{Bootflow, BootflowState, ImageKind};
use crate::error::{BootError, Result};
use crate::method::MethodCtx;
use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use bootstd_core::fs::Filesystem;

/// Largest boot script accepted
pub const MAX_SCRIPT_SIZE: u64 = 0x10000;
/// Largest text configuration (extlinux.conf) accepted
pub const MAX_CONF_SIZE: u64 = 0x10000;
/// Largest EFI application preloaded
pub const MAX_EFI_SIZE: u64 = 0x200_0000;

/// Look for `dir` + `fname`; on success record it and move to `File`.
pub fn try_file(
    fs: &mut dyn Filesystem,
    bflow: &mut Bootflow,
    dir: &str,
    fname: &str,
) -> Result<()> {
    let path = format!("{}{}", dir, fname);
    let size = fs.size(&path)?;

    bflow.subdir = dir.to_string();
    bflow.fname = path;
    bflow.size = size;
    bflow.advance(BootflowState::File);
    log::debug!("{}: found {} ({} bytes)", bflow.name, bflow.fname, size);
    Ok(())
}

/// Try each directory in turn and, inside it, each name; first match wins.
///
/// A missing file moves on to the next candidate name; any other failure
/// stops the search.
pub fn try_prefixes(
    fs: &mut dyn Filesystem,
    bflow: &mut Bootflow,
    prefixes: &[String],
    names: &[&str],
) -> Result<()> {
    for prefix in prefixes {
        for name in names {
            match try_file(fs, bflow, prefix, name) {
                Ok(()) => return Ok(()),
                Err(BootError::NotFound) => continue,
                Err(e) => return Err(e),
            }
        }
    }
    Err(BootError::NotFound)
}

/// Copy the file found by [`try_file`] into a buffer owned by the bootflow.
///
/// Content above `cap` is rejected before anything is allocated. With
/// `terminate` a NUL is appended for text consumers.
pub fn alloc_file(
    fs: &mut dyn Filesystem,
    bflow: &mut Bootflow,
    cap: u64,
    terminate: bool,
) -> Result<()> {
    if bflow.state() != BootflowState::File {
        return Err(BootError::NotReady);
    }
    if bflow.size > cap {
        return Err(BootError::TooLarge);
    }

    let size = bflow.size as usize;
    let len = size + usize::from(terminate);
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| BootError::TooLarge)?;
    buf.resize(len, 0);

    let read = fs.read(&bflow.fname, 0, &mut buf[..size])?;
    if read != size {
        return Err(BootError::IoFault);
    }

    bflow.buf = Some(buf);
    bflow.advance(BootflowState::Loaded);
    Ok(())
}

/// Read `path` from the bootflow's partition into `dst` and record it as
/// a sub-image at `addr`.
pub fn read_file_common(
    ctx: &mut MethodCtx<'_>,
    bflow: &mut Bootflow,
    path: &str,
    addr: u64,
    kind: ImageKind,
    dst: &mut [u8],
) -> Result<usize> {
    let mut fs = ctx.mount(bflow.part)?;
    let size = fs.size(path)?;
    if size > dst.len() as u64 {
        return Err(BootError::NoSpace);
    }

    let size = size as usize;
    let read = fs.read(path, 0, &mut dst[..size])?;
    if read != size {
        return Err(BootError::IoFault);
    }
    bflow.add_image(path, kind, addr, size as u64, true);
    Ok(size)
}
