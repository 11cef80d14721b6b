//! Lazy enumeration of bootflow candidates.
//!
//! The scan walks methods in registration order and, for each method,
//! every medium in registration order, asking for sequence numbers
//! 0, 1, 2, ... until the pair reports end of medium. Global methods are
//! asked once, with no medium, before the next method starts.
//!
//! [`Cursor`] holds the position without borrowing the context, so callers
//! that need the context between candidates (the dispatcher) can call
//! [`Cursor::step`] themselves. [`BootflowIter`] wraps it as an ordinary
//! [`Iterator`].

use crate::bootflow::{Bootflow, BootflowState};
use crate::context::Bootstd;
use crate::error::{BootError, Discovery, Result};
use crate::medium::MediumKind;
use crate::method::MethodCtx;
use alloc::format;
use alloc::string::String;
use bitflags::bitflags;
use core::fmt;
use log::{debug, info, warn};

/// Sequence numbers asked of one (method, medium) pair before giving up
pub const MAX_BOOTFLOWS_PER_MEDIUM: u32 = 100;
/// Highest partition number scanned on a block medium
pub const MAX_PART_PER_MEDIUM: u32 = 30;

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ScanFlags: u32 {
        /// Log each candidate as it is found
        const SHOW = 1 << 0;
        /// Also yield candidates that failed discovery
        const ALL = 1 << 1;
        /// Skip removable media
        const FIXED = 1 << 2;
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanOptions {
    pub flags: ScanFlags,
    /// Only scan this medium
    pub medium: Option<usize>,
    /// Only scan with this method
    pub method: Option<usize>,
}

impl ScanOptions {
    pub fn new(flags: ScanFlags) -> Self {
        Self {
            flags,
            ..Self::default()
        }
    }
}

/// A candidate that did not make it, or a pair that hit the cap.
#[derive(Clone, Debug)]
pub struct ScanError {
    pub kind: BootError,
    pub method: String,
    pub medium: Option<String>,
    pub seq: u32,
    /// The partly discovered bootflow, when there was one
    pub bootflow: Option<Bootflow>,
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.medium {
            Some(medium) => write!(f, "{}/{}", medium, self.method)?,
            None => write!(f, "{}", self.method)?,
        }
        write!(f, " seq {}: {}", self.seq, self.kind)
    }
}

/// Probe `medium` and ask `method` whether it can use it.
pub fn check_pair(std: &mut Bootstd, method: usize, medium: usize) -> Result<()> {
    std.media.probe(medium)?;
    let driver = std.methods.get(method).ok_or(BootError::NotFound)?;
    let mut ctx = MethodCtx::new(&mut std.media, Some(medium), &std.config);
    driver.check(&mut ctx)
}

fn candidate_name(std: &Bootstd, medium: usize, seq: u32) -> String {
    match std.media.get(medium) {
        Some(m) if m.kind() == MediumKind::Block && seq == 0 => format!("{}.whole", m.name()),
        Some(m) if m.kind() == MediumKind::Block => format!("{}.part_{:x}", m.name(), seq),
        Some(m) => String::from(m.name()),
        None => String::new(),
    }
}

/// Walk a block partition through the generic states up to `Fs`.
fn prepare_partition(std: &mut Bootstd, medium: usize, bflow: &mut Bootflow) -> Result<()> {
    let handle = std.media.get_mut(medium).ok_or(BootError::NotFound)?;
    let kind = handle
        .driver_mut()
        .partitions()?
        .get(bflow.part)
        .map(|p| p.kind)
        .ok_or(BootError::NotFound)?;
    bflow.advance(BootflowState::Part);

    if !kind.may_hold_filesystem() {
        return Err(BootError::Invalid);
    }
    bflow.advance(BootflowState::PartType);

    handle.mount(bflow.part)?;
    bflow.advance(BootflowState::Fs);
    Ok(())
}

/// Ask `method` for the candidate at `seq` on `medium` (`None` for a
/// global method). A faulted candidate comes back with its fault recorded.
pub fn read_candidate(
    std: &mut Bootstd,
    method: usize,
    medium: Option<usize>,
    seq: u32,
) -> (Bootflow, Discovery) {
    let part = if medium.is_some() { seq } else { 0 };
    let mut bflow = Bootflow::new(method, medium, part);

    let res = match medium {
        None if seq > 0 => return (bflow, Discovery::EndOfMedium),
        None => discover(std, None, &mut bflow),
        Some(m) => {
            let limit = match std.media.get_mut(m) {
                Some(handle) => handle.probe().and_then(|_| handle.driver_mut().seq_limit()),
                None => Err(BootError::NotFound),
            };
            match limit {
                Ok(Some(limit)) if seq >= limit => return (bflow, Discovery::EndOfMedium),
                Ok(_) => {
                    bflow.name = candidate_name(std, m, seq);
                    bflow.advance(BootflowState::Media);
                    discover(std, Some(m), &mut bflow)
                }
                Err(e) => Err(e),
            }
        }
    };

    let found = Discovery::from(res);
    if let Discovery::Fault(e) = found {
        debug!("{} seq {}: {}", bflow.name, seq, e);
        bflow.fail(e);
    }
    (bflow, found)
}

fn discover(std: &mut Bootstd, medium: Option<usize>, bflow: &mut Bootflow) -> Result<()> {
    if let Some(m) = medium {
        let is_block = std.media.get(m).map(|h| h.kind()) == Some(MediumKind::Block);
        if is_block && bflow.part > 0 {
            prepare_partition(std, m, bflow)?;
        }
    }

    let driver = std.methods.get(bflow.method).ok_or(BootError::NotFound)?;
    let mut ctx = MethodCtx::new(&mut std.media, medium, &std.config);
    driver.read_bootflow(&mut ctx, bflow)
}

/// Scan position, independent of any borrow of the context.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursor {
    method: usize,
    medium: usize,
    seq: u32,
    checked: bool,
}

impl Cursor {
    fn next_method(&mut self) {
        self.method += 1;
        self.medium = 0;
        self.seq = 0;
        self.checked = false;
    }

    fn next_medium(&mut self) {
        self.medium += 1;
        self.seq = 0;
        self.checked = false;
    }

    fn error(
        &self,
        std: &Bootstd,
        kind: BootError,
        medium: Option<usize>,
        bootflow: Option<Bootflow>,
    ) -> ScanError {
        ScanError {
            kind,
            method: std
                .methods
                .get(self.method)
                .map(|m| String::from(m.name()))
                .unwrap_or_default(),
            medium: bootflow
                .as_ref()
                .and_then(|b| b.medium)
                .or(medium)
                .and_then(|m| std.media.get(m))
                .map(|m| String::from(m.name())),
            seq: self.seq,
            bootflow,
        }
    }

    /// Pick the medium for the current method. `Err(None)` moves on
    /// quietly; `Err(Some(_))` carries a medium that faulted while probing.
    fn select_medium(
        &mut self,
        std: &mut Bootstd,
        opts: &ScanOptions,
        global: bool,
    ) -> core::result::Result<Option<usize>, Option<ScanError>> {
        if global {
            let pinned = opts.method == Some(self.method);
            if self.medium > 0 || (opts.medium.is_some() && !pinned) {
                self.next_method();
                return Err(None);
            }
            return Ok(None);
        }

        let Some(handle) = std.media.get(self.medium) else {
            self.next_method();
            return Err(None);
        };
        let filtered = opts.medium.map_or(false, |m| m != self.medium)
            || (opts.flags.contains(ScanFlags::FIXED) && handle.is_removable());
        if filtered {
            self.next_medium();
            return Err(None);
        }

        if !self.checked {
            match check_pair(std, self.method, self.medium) {
                Ok(()) => self.checked = true,
                Err(BootError::Unsupported) => {
                    self.next_medium();
                    return Err(None);
                }
                Err(e) => {
                    let err = self.error(std, e, Some(self.medium), None);
                    debug!("{}", err);
                    self.next_medium();
                    return Err(Some(err).filter(|_| opts.flags.contains(ScanFlags::ALL)));
                }
            }
        }
        Ok(Some(self.medium))
    }

    /// Next candidate, or `None` once every pair is exhausted.
    pub fn step(
        &mut self,
        std: &mut Bootstd,
        opts: &ScanOptions,
    ) -> Option<core::result::Result<Bootflow, ScanError>> {
        loop {
            let global = std.methods.get(self.method)?.is_global();
            if opts.method.map_or(false, |m| m != self.method) {
                self.next_method();
                continue;
            }
            let medium = match self.select_medium(std, opts, global) {
                Ok(medium) => medium,
                Err(Some(err)) => return Some(Err(err)),
                Err(None) => continue,
            };

            if self.seq >= MAX_BOOTFLOWS_PER_MEDIUM {
                let err = self.error(std, BootError::ResourceExhausted, medium, None);
                warn!("{}", err);
                self.next_medium();
                return Some(Err(err));
            }

            let (bflow, found) = read_candidate(std, self.method, medium, self.seq);
            match found {
                Discovery::Found => {
                    if opts.flags.contains(ScanFlags::SHOW) {
                        info!("{:3x}  {}  {}", self.seq, bflow.state(), bflow.name);
                    }
                    self.seq += 1;
                    return Some(Ok(bflow));
                }
                Discovery::EndOfMedium => self.next_medium(),
                Discovery::Fault(e) => {
                    let err = self.error(std, e, medium, Some(bflow));
                    self.seq += 1;
                    if opts.flags.contains(ScanFlags::ALL) {
                        return Some(Err(err));
                    }
                }
            }
        }
    }
}

/// Borrowing iterator over a scan.
pub struct BootflowIter<'a> {
    std: &'a mut Bootstd,
    opts: ScanOptions,
    cursor: Cursor,
}

impl<'a> BootflowIter<'a> {
    pub fn new(std: &'a mut Bootstd, opts: ScanOptions) -> Self {
        Self {
            std,
            opts,
            cursor: Cursor::default(),
        }
    }
}

impl Iterator for BootflowIter<'_> {
    type Item = core::result::Result<Bootflow, ScanError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.step(self.std, &self.opts)
    }
}
