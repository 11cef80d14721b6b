//! Boot media and the registry that owns them.
//!
//! A medium is anything a boot payload can come from: a partitioned block
//! device, a network interface, a firmware-config channel. Drivers
//! implement [`Medium`]; the [`Registry`] hands out stable sequence numbers
//! in registration order and caches probe results.

pub mod block;
pub mod fwcfg;

pub use block::BlockMedium;
pub use fwcfg::{FwCfg, FwCfgKey, FwCfgMedium};

use crate::error::{BootError, Result};
use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use bootstd_core::disk::{DynBlockIo, PartitionTable};
use bootstd_core::fs::Filesystem;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediumKind {
    Block,
    Network,
    FwCfg,
}

impl MediumKind {
    pub fn uclass(&self) -> &'static str {
        match self {
            MediumKind::Block => "blk",
            MediumKind::Network => "eth",
            MediumKind::FwCfg => "qfw",
        }
    }
}

/// Driver side of a boot medium.
pub trait Medium {
    fn kind(&self) -> MediumKind;

    fn uclass(&self) -> &str {
        self.kind().uclass()
    }

    fn is_removable(&self) -> bool {
        false
    }

    /// Bring the medium up. Must be idempotent.
    fn probe(&mut self) -> Result<()> {
        Ok(())
    }

    fn partitions(&mut self) -> Result<&PartitionTable> {
        Err(BootError::Unsupported)
    }

    /// Number of bootflow sequence numbers worth asking about, or `None`
    /// when only the method can tell. Media without partitions offer just
    /// sequence 0.
    fn seq_limit(&mut self) -> Result<Option<u32>> {
        Ok(Some(1))
    }

    /// Mount partition `part`, or the whole medium for 0.
    fn mount(&mut self, _part: u32) -> Result<Box<dyn Filesystem + '_>> {
        Err(BootError::Unsupported)
    }

    fn block_io(&mut self) -> Option<&mut DynBlockIo<'_>> {
        None
    }

    fn fw_cfg(&mut self) -> Option<&mut dyn FwCfg> {
        None
    }
}

pub struct MediumHandle {
    seq: usize,
    name: String,
    parent: Option<usize>,
    driver: Box<dyn Medium>,
    probed: bool,
    last_error: Option<BootError>,
}

impl MediumHandle {
    pub fn seq(&self) -> usize {
        self.seq
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn kind(&self) -> MediumKind {
        self.driver.kind()
    }

    pub fn uclass(&self) -> &str {
        self.driver.uclass()
    }

    pub fn is_removable(&self) -> bool {
        self.driver.is_removable()
    }

    pub fn is_probed(&self) -> bool {
        self.probed
    }

    /// Error from the most recent failed probe
    pub fn last_error(&self) -> Option<BootError> {
        self.last_error
    }

    /// Probe once; later calls return the cached success. Failures are
    /// retried on the next call.
    pub fn probe(&mut self) -> Result<()> {
        if self.probed {
            return Ok(());
        }
        match self.driver.probe() {
            Ok(()) => {
                self.probed = true;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                log::debug!("{}: probe failed: {}", self.name, e);
                self.last_error = Some(e);
                Err(e)
            }
        }
    }

    pub fn driver_mut(&mut self) -> &mut dyn Medium {
        self.driver.as_mut()
    }

    /// Probe, then mount partition `part`.
    pub fn mount(&mut self, part: u32) -> Result<Box<dyn Filesystem + '_>> {
        self.probe()?;
        self.driver.mount(part)
    }
}

#[derive(Default)]
pub struct Registry {
    media: Vec<MediumHandle>,
}

impl Registry {
    pub fn new() -> Self {
        Self { media: Vec::new() }
    }

    /// Register a medium; returns its sequence number.
    pub fn add(
        &mut self,
        name: &str,
        driver: Box<dyn Medium>,
        parent: Option<usize>,
    ) -> Result<usize> {
        if self.find(name).is_some() {
            return Err(BootError::Invalid);
        }
        if let Some(p) = parent {
            if p >= self.media.len() {
                return Err(BootError::NotFound);
            }
        }
        let seq = self.media.len();
        self.media.push(MediumHandle {
            seq,
            name: name.to_string(),
            parent,
            driver,
            probed: false,
            last_error: None,
        });
        Ok(seq)
    }

    pub fn len(&self) -> usize {
        self.media.len()
    }

    pub fn is_empty(&self) -> bool {
        self.media.is_empty()
    }

    pub fn get(&self, seq: usize) -> Option<&MediumHandle> {
        self.media.get(seq)
    }

    pub fn get_mut(&mut self, seq: usize) -> Option<&mut MediumHandle> {
        self.media.get_mut(seq)
    }

    /// Probe medium `seq`; see [`MediumHandle::probe`].
    pub fn probe(&mut self, seq: usize) -> Result<()> {
        self.get_mut(seq).ok_or(BootError::NotFound)?.probe()
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.media.iter().position(|m| m.name == name)
    }

    /// Look up by name, falling back to a hex sequence number.
    pub fn resolve(&self, id: &str) -> Option<usize> {
        self.find(id).or_else(|| {
            usize::from_str_radix(id, 16)
                .ok()
                .filter(|&seq| seq < self.media.len())
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &MediumHandle> {
        self.media.iter()
    }
}
