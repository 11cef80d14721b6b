//! The bootflow record and its discovery state machine.

use crate::error::BootError;
use alloc::string::String;
use alloc::vec::Vec;
use bootstd_persistent::SlotState;
use core::fmt;

/// Discovery progress, in the order states are reached.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum BootflowState {
    Base,
    Media,
    Part,
    PartType,
    Fs,
    File,
    Ready,
    Loaded,
}

impl BootflowState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Media => "media",
            Self::Part => "part",
            Self::PartType => "parttype",
            Self::Fs => "fs",
            Self::File => "file",
            Self::Ready => "ready",
            Self::Loaded => "loaded",
        }
    }

    /// Ready and loaded are the two states a bootflow can boot from.
    pub fn is_bootable(&self) -> bool {
        matches!(self, Self::Ready | Self::Loaded)
    }
}

impl fmt::Display for BootflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
    Script,
    Extlinux,
    /// EFI application
    Efi,
    Kernel,
    Ramdisk,
    Fdt,
    Setup,
    Cmdline,
    Other,
}

/// A piece of the payload beyond the main file, such as a kernel or initrd.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubImage {
    pub name: String,
    pub kind: ImageKind,
    pub addr: u64,
    pub size: u64,
    /// Data is already at `addr`
    pub loaded: bool,
}

/// One discovered boot candidate.
#[derive(Clone, Debug)]
pub struct Bootflow {
    /// Medium sequence number; None for global methods that pick their own
    pub medium: Option<usize>,
    /// Method sequence number
    pub method: usize,
    /// Partition number, 0 for the whole medium
    pub part: u32,
    pub name: String,
    /// Directory prefix the file was found under
    pub subdir: String,
    /// Path of the main file within the filesystem
    pub fname: String,
    pub size: u64,
    state: BootflowState,
    /// Owned content once loaded
    pub buf: Option<Vec<u8>>,
    pub images: Vec<SubImage>,
    pub cmdline: Option<String>,
    err: Option<BootError>,
    pub slot: Option<SlotState>,
}

impl Bootflow {
    pub fn new(method: usize, medium: Option<usize>, part: u32) -> Self {
        Self {
            medium,
            method,
            part,
            name: String::new(),
            subdir: String::new(),
            fname: String::new(),
            size: 0,
            state: BootflowState::Base,
            buf: None,
            images: Vec::new(),
            cmdline: None,
            err: None,
            slot: None,
        }
    }

    pub fn state(&self) -> BootflowState {
        self.state
    }

    pub fn err(&self) -> Option<BootError> {
        self.err
    }

    pub fn is_valid(&self) -> bool {
        self.err.is_none() && self.state.is_bootable()
    }

    /// Move forward to `state`. Going backwards, or moving at all after a
    /// failure, leaves the bootflow unchanged.
    pub fn advance(&mut self, state: BootflowState) {
        if self.err.is_some() || state < self.state {
            log::debug!(
                "{}: refusing {} -> {}",
                self.name,
                self.state.name(),
                state.name()
            );
            return;
        }
        self.state = state;
    }

    /// Record a failure. The first fault wins and the state is kept.
    pub fn fail(&mut self, err: BootError) {
        if self.err.is_none() {
            self.err = Some(err);
        }
    }

    pub fn add_image(&mut self, name: &str, kind: ImageKind, addr: u64, size: u64, loaded: bool) {
        self.images.push(SubImage {
            name: String::from(name),
            kind,
            addr,
            size,
            loaded,
        });
    }

    pub fn image(&self, kind: ImageKind) -> Option<&SubImage> {
        self.images.iter().find(|img| img.kind == kind)
    }

    pub fn image_mut(&mut self, kind: ImageKind) -> Option<&mut SubImage> {
        self.images.iter_mut().find(|img| img.kind == kind)
    }

    /// Loaded content without any terminating NUL.
    pub fn content(&self) -> Option<&[u8]> {
        let buf = self.buf.as_deref()?;
        let len = (self.size as usize).min(buf.len());
        Some(&buf[..len])
    }
}
