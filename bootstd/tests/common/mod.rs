//! Common test utilities: disks, mock media, mock methods and a recording executor

#![allow(dead_code)]

#[path = "../../../core/tests/common/builder.rs"]
pub mod builder;
pub use builder::Fat32Builder;

use bootstd::bootflow::{Bootflow, BootflowState};
use bootstd::config::Env;
use bootstd::dispatch::{Executor, Image, KernelArgs};
use bootstd::error::{BootError, Result};
use bootstd::medium::{FwCfg, FwCfgKey, Medium, MediumKind};
use bootstd::method::{BootMethod, MethodCtx};
use bootstd_core::disk::{write_gpt, BlockRef, DeviceAdapter, PartitionKind, PartitionSpec};
use gpt_disk_io::BlockIo;
use gpt_disk_types::{BlockSize, Lba};
use std::cell::RefCell;
use std::io;
use std::rc::Rc;

pub const SECTOR: usize = 512;
/// Every test partition is this many sectors, laid out back to back
pub const PART_SECTORS: u64 = 2048;

/// In-memory block device for testing
#[derive(Debug, Clone)]
pub struct MemoryBlockDevice {
    pub data: Vec<u8>,
}

impl MemoryBlockDevice {
    pub fn zeroed(blocks: usize) -> Self {
        Self {
            data: vec![0u8; blocks * SECTOR],
        }
    }

    pub fn place(&mut self, start_lba: u64, image: &[u8]) {
        let offset = start_lba as usize * SECTOR;
        self.data[offset..offset + image.len()].copy_from_slice(image);
    }
}

impl BlockIo for MemoryBlockDevice {
    type Error = io::Error;

    fn block_size(&self) -> BlockSize {
        BlockSize::BS_512
    }

    fn num_blocks(&mut self) -> std::result::Result<u64, Self::Error> {
        Ok((self.data.len() / SECTOR) as u64)
    }

    fn read_blocks(&mut self, start_lba: Lba, dst: &mut [u8]) -> std::result::Result<(), Self::Error> {
        let offset = start_lba.0 as usize * SECTOR;
        let src = self.data.get(offset..offset + dst.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::UnexpectedEof, "read beyond end of device")
        })?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn write_blocks(&mut self, start_lba: Lba, src: &[u8]) -> std::result::Result<(), Self::Error> {
        let offset = start_lba.0 as usize * SECTOR;
        let dst = self.data.get_mut(offset..offset + src.len()).ok_or_else(|| {
            io::Error::new(io::ErrorKind::WriteZero, "write beyond end of device")
        })?;
        dst.copy_from_slice(src);
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), Self::Error> {
        Ok(())
    }
}

/// FAT32 image sized for one test partition, holding `files`.
pub fn fat_image(files: &[(&str, &[u8])]) -> Vec<u8> {
    let mut builder = Fat32Builder::new(PART_SECTORS as u32);
    for (path, data) in files {
        builder.add_file(path, data);
    }
    builder.build()
}

/// First LBA of partition `index` (1-based).
pub fn part_start(index: u32) -> u64 {
    PART_SECTORS * index as u64
}

/// GPT disk with one partition per entry; `Some(image)` is copied in.
pub fn gpt_disk(parts: &[(PartitionKind, Option<Vec<u8>>)]) -> MemoryBlockDevice {
    let blocks = PART_SECTORS as usize * (parts.len() + 2);
    let specs: Vec<PartitionSpec> = parts
        .iter()
        .enumerate()
        .map(|(i, (kind, _))| PartitionSpec {
            kind: *kind,
            start_lba: part_start(i as u32 + 1),
            end_lba: part_start(i as u32 + 2) - 1,
        })
        .collect();

    let mut disk = DeviceAdapter::new(MemoryBlockDevice::zeroed(blocks));
    write_gpt(BlockRef::new(&mut disk), &specs).expect("write gpt");
    let mut dev = disk.into_inner();
    for (i, (_, image)) in parts.iter().enumerate() {
        if let Some(image) = image {
            dev.place(part_start(i as u32 + 1), image);
        }
    }
    dev
}

/// Loads performed through [`MockFwCfg`]: (key, addr, size)
pub type LoadLog = Rc<RefCell<Vec<(FwCfgKey, u64, u64)>>>;

/// Firmware-config channel with fixed entry sizes
#[derive(Clone, Default)]
pub struct MockFwCfg {
    pub kernel_size: u32,
    pub initrd_size: u32,
    pub setup_size: u32,
    pub setup_addr: u32,
    pub cmdline: Vec<u8>,
    pub loads: LoadLog,
}

impl FwCfg for MockFwCfg {
    fn read_entry(&mut self, key: FwCfgKey, dst: &mut [u8]) -> Result<()> {
        let value = match key {
            FwCfgKey::KernelSize => self.kernel_size,
            FwCfgKey::InitrdSize => self.initrd_size,
            FwCfgKey::SetupSize => self.setup_size,
            FwCfgKey::SetupAddr => self.setup_addr,
            FwCfgKey::CmdlineSize => self.cmdline.len() as u32,
            FwCfgKey::CmdlineData => {
                let n = dst.len().min(self.cmdline.len());
                dst[..n].copy_from_slice(&self.cmdline[..n]);
                return Ok(());
            }
            _ => return Err(BootError::Unsupported),
        };
        let bytes = value.to_le_bytes();
        let n = dst.len().min(4);
        dst[..n].copy_from_slice(&bytes[..n]);
        Ok(())
    }

    fn load(&mut self, key: FwCfgKey, addr: u64, size: u64) -> Result<()> {
        self.loads.borrow_mut().push((key, addr, size));
        Ok(())
    }
}

/// Medium that offers `limit` sequence numbers (`None` for no limit)
pub struct SeqMedium {
    pub limit: Option<u32>,
    pub removable: bool,
}

impl SeqMedium {
    pub fn boxed(limit: Option<u32>) -> Box<dyn Medium> {
        Box::new(Self {
            limit,
            removable: false,
        })
    }
}

impl Medium for SeqMedium {
    fn kind(&self) -> MediumKind {
        MediumKind::Network
    }

    fn is_removable(&self) -> bool {
        self.removable
    }

    fn seq_limit(&mut self) -> Result<Option<u32>> {
        Ok(self.limit)
    }
}

/// Method whose outcome per sequence number is fixed by a function
pub struct StubMethod {
    pub name: &'static str,
    pub outcome: fn(u32) -> Result<()>,
    /// Error returned by `boot`; `None` boots
    pub boot_error: Option<BootError>,
}

impl StubMethod {
    pub fn always_ok(name: &'static str) -> Self {
        Self {
            name,
            outcome: |_| Ok(()),
            boot_error: None,
        }
    }

    pub fn always(name: &'static str, err: BootError) -> Self {
        let outcome: fn(u32) -> Result<()> = match err {
            BootError::Invalid => |_| Err(BootError::Invalid),
            BootError::NotFound => |_| Err(BootError::NotFound),
            _ => |_| Err(BootError::IoFault),
        };
        Self {
            name,
            outcome,
            boot_error: None,
        }
    }
}

impl BootMethod for StubMethod {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "stub"
    }

    fn read_bootflow(&self, _ctx: &mut MethodCtx<'_>, bflow: &mut Bootflow) -> Result<()> {
        bflow.advance(BootflowState::File);
        (self.outcome)(bflow.part)?;
        bflow.fname = format!("stub{}", bflow.part);
        bflow.advance(BootflowState::Ready);
        Ok(())
    }

    fn boot(
        &self,
        _ctx: &mut MethodCtx<'_>,
        bflow: &mut Bootflow,
        exec: &mut dyn Executor,
    ) -> Result<()> {
        match self.boot_error {
            Some(e) => Err(e),
            None => exec.run_script(&bflow.name, &Env::new()),
        }
    }
}

/// Executor that records what it was asked to do
#[derive(Default)]
pub struct RecordingExecutor {
    pub calls: Vec<&'static str>,
    /// Conventions that reject the payload
    pub reject: Vec<&'static str>,
    pub scripts: Vec<(String, Env)>,
    pub extlinux: Vec<(String, String)>,
    pub kernel: Option<(Image, Option<Image>, Option<Image>, Option<String>)>,
    /// EFI application bytes and device tree address
    pub efi: Option<(Vec<u8>, Option<u64>)>,
}

impl RecordingExecutor {
    pub fn rejecting(reject: &[&'static str]) -> Self {
        Self {
            reject: reject.to_vec(),
            ..Self::default()
        }
    }

    fn call(&mut self, name: &'static str) -> Result<()> {
        self.calls.push(name);
        if self.reject.contains(&name) {
            return Err(BootError::Invalid);
        }
        Ok(())
    }

    fn kernel_call(&mut self, name: &'static str, args: &KernelArgs<'_>) -> Result<()> {
        self.call(name)?;
        self.kernel = Some((
            args.kernel,
            args.ramdisk,
            args.setup,
            args.cmdline.map(String::from),
        ));
        Ok(())
    }
}

impl Executor for RecordingExecutor {
    fn run_script(&mut self, script: &str, env: &Env) -> Result<()> {
        self.call("script")?;
        self.scripts.push((script.to_string(), env.clone()));
        Ok(())
    }

    fn extlinux(&mut self, conf: &str, prefix: &str, _env: &Env) -> Result<()> {
        self.call("extlinux")?;
        self.extlinux.push((conf.to_string(), prefix.to_string()));
        Ok(())
    }

    fn booti(&mut self, args: &KernelArgs<'_>) -> Result<()> {
        self.kernel_call("booti", args)
    }

    fn bootz(&mut self, args: &KernelArgs<'_>) -> Result<()> {
        self.kernel_call("bootz", args)
    }

    fn zboot(&mut self, args: &KernelArgs<'_>) -> Result<()> {
        self.kernel_call("zboot", args)
    }

    fn bootefi(&mut self, image: &[u8], fdt: Option<u64>) -> Result<()> {
        self.call("bootefi")?;
        self.efi = Some((image.to_vec(), fdt));
        Ok(())
    }
}
