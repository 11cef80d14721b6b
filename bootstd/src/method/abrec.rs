// A/B/recovery boot method
//
// A global method: it is not tied to the medium under scan but reads the
// slot state from a configured storage device and then boots the
// extlinux configuration of the picked slot from that device's OS
// partition.

use super::{BootMethod, MethodCtx, MethodFlags};
use crate::bootflow::{Bootflow, BootflowState, ImageKind};
use crate::config::Properties;
use crate::dispatch::Executor;
use crate::error::{BootError, Result};
use crate::loader::{self, MAX_CONF_SIZE};
use alloc::format;
use alloc::string::{String, ToString};
use bootstd_persistent::{read_state, AreaLayout, BlockStateStore, SlotState};
use core::str;
use log::{debug, info};

/// Partition holding the per-slot OS directories unless configured
pub const DEFAULT_OS_PART: u32 = 2;
pub const EXTLINUX_CONF: &str = "extlinux/extlinux.conf";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AbrecConfig {
    /// Name of the medium holding both the state area and the OS partition
    pub storage: String,
    pub layout: AreaLayout,
    pub os_part: u32,
}

impl AbrecConfig {
    /// Parse the method's property node. Sizes and offsets accept `0x`
    /// prefixed hex or decimal.
    pub fn from_properties(node: &Properties) -> Result<Self> {
        let required = |key: &str| {
            node.get_u64(key).ok_or_else(|| {
                debug!("abrec: missing property {}", key);
                BootError::Invalid
            })
        };
        let storage = node.get("storage").ok_or(BootError::Invalid)?.to_string();

        let layout = AreaLayout {
            area_start: required("area-start")?,
            area_size: required("area-size")?,
            version_offset: required("version-offset")?,
            version_size: required("version-size")?,
            state_offset: required("state-offset")?,
            state_size: required("state-size")?,
            skip_offset: node.get_u64("skip-offset").unwrap_or(0),
        };
        let os_part = match node.get_u64("os-part") {
            Some(part) => u32::try_from(part).map_err(|_| BootError::Invalid)?,
            None => DEFAULT_OS_PART,
        };

        Ok(Self {
            storage,
            layout,
            os_part,
        })
    }
}

pub struct AbrecMethod {
    config: AbrecConfig,
}

impl AbrecMethod {
    pub fn new(config: AbrecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AbrecConfig {
        &self.config
    }

    fn storage_seq(&self, ctx: &mut MethodCtx<'_>) -> Result<usize> {
        ctx.media().find(&self.config.storage).ok_or_else(|| {
            debug!("abrec: storage '{}' not found", self.config.storage);
            BootError::NotFound
        })
    }

    fn read_slot_state(&self, ctx: &mut MethodCtx<'_>, seq: usize) -> Result<SlotState> {
        let medium = ctx.media().get_mut(seq).ok_or(BootError::NotFound)?;
        medium.probe()?;
        let io = medium
            .driver_mut()
            .block_io()
            .ok_or(BootError::Unsupported)?;
        let mut store = BlockStateStore::new(&self.config.storage, io);
        Ok(read_state(&self.config.layout, &mut store)?)
    }
}

impl BootMethod for AbrecMethod {
    fn name(&self) -> &str {
        "abrec"
    }

    fn description(&self) -> &str {
        "VBE A/B/recovery"
    }

    fn flags(&self) -> MethodFlags {
        MethodFlags::GLOBAL
    }

    fn read_bootflow(&self, ctx: &mut MethodCtx<'_>, bflow: &mut Bootflow) -> Result<()> {
        let seq = self.storage_seq(ctx)?;
        let state = self.read_slot_state(ctx, seq)?;
        if state.fallback {
            info!("abrec: no usable state on {}, using recovery", self.config.storage);
        }

        bflow.medium = Some(seq);
        bflow.part = self.config.os_part;
        bflow.name = format!("{}.abrec.{}", self.config.storage, state.pick);
        bflow.advance(BootflowState::Media);

        let medium = ctx.media().get_mut(seq).ok_or(BootError::NotFound)?;
        let kind = medium
            .driver_mut()
            .partitions()?
            .get(self.config.os_part)
            .map(|p| p.kind)
            .ok_or(BootError::NotFound)?;
        bflow.advance(BootflowState::Part);
        if !kind.may_hold_filesystem() {
            return Err(BootError::Invalid);
        }
        bflow.advance(BootflowState::PartType);

        let mut fs = medium.mount(self.config.os_part)?;
        bflow.advance(BootflowState::Fs);

        let subdir = format!("/{}/", state.pick);
        loader::try_file(fs.as_mut(), bflow, &subdir, EXTLINUX_CONF)?;
        loader::alloc_file(fs.as_mut(), bflow, MAX_CONF_SIZE, true)?;
        bflow.slot = Some(state);
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
        info!("{}: booting {}", bflow.name, bflow.fname);
        exec.extlinux(conf, &bflow.subdir, &ctx.config().env)
    }

    fn state_desc(&self, ctx: &mut MethodCtx<'_>) -> Result<String> {
        let seq = self.storage_seq(ctx)?;
        let state = self.read_slot_state(ctx, seq)?;
        Ok(format!("{}", state))
    }
}
