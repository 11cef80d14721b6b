//! Minimal FAT32 image builder for tests
//!
//! One sector per cluster, two FATs, root directory at cluster 2. Every
//! directory gets a fixed run of clusters so entries never need moving.

use std::collections::BTreeMap;

const SECTOR: usize = 512;
const RESERVED: u32 = 32;
const NUM_FATS: u32 = 2;
const DIR_CLUSTERS: u32 = 4;
const EOC: u32 = 0x0FFF_FFFF;

pub struct Fat32Builder {
    total_sectors: u32,
    fat_size: u32,
    fat: Vec<u32>,
    data: Vec<u8>,
    next_cluster: u32,
    /// Directory path ("" for root) to (first cluster, raw entries)
    dirs: BTreeMap<String, (u32, Vec<[u8; 32]>)>,
    alias_counter: u32,
}

impl Fat32Builder {
    pub fn new(total_sectors: u32) -> Self {
        let fat_size = ((total_sectors as usize * 4).div_ceil(SECTOR)) as u32;
        let data_start = RESERVED + NUM_FATS * fat_size;
        let clusters = total_sectors - data_start;
        let mut builder = Self {
            total_sectors,
            fat_size,
            fat: vec![0; clusters as usize + 2],
            data: vec![0; clusters as usize * SECTOR],
            next_cluster: 2,
            dirs: BTreeMap::new(),
            alias_counter: 0,
        };
        builder.fat[0] = 0x0FFF_FFF8;
        builder.fat[1] = EOC;
        let root = builder.alloc_chain(DIR_CLUSTERS);
        builder.dirs.insert(String::new(), (root, Vec::new()));
        builder
    }

    fn alloc_chain(&mut self, count: u32) -> u32 {
        let first = self.next_cluster;
        for i in 0..count {
            let cluster = first + i;
            self.fat[cluster as usize] = if i + 1 == count { EOC } else { cluster + 1 };
        }
        self.next_cluster += count;
        first
    }

    fn short_name(&mut self, name: &str) -> ([u8; 11], bool) {
        let mut short = [b' '; 11];
        let (base, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot + 1..]),
            _ => (name, ""),
        };
        let fits = base.len() <= 8 && ext.len() <= 3 && !base.contains('.');
        if fits && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_') {
            for (d, s) in short[..8].iter_mut().zip(base.bytes()) {
                *d = s.to_ascii_uppercase();
            }
            for (d, s) in short[8..].iter_mut().zip(ext.bytes()) {
                *d = s.to_ascii_uppercase();
            }
            return (short, false);
        }

        self.alias_counter += 1;
        let stem: Vec<u8> = base
            .bytes()
            .filter(|b| b.is_ascii_alphanumeric())
            .take(6)
            .map(|b| b.to_ascii_uppercase())
            .collect();
        short[..stem.len()].copy_from_slice(&stem);
        short[stem.len()] = b'~';
        short[stem.len() + 1] = b'0' + (self.alias_counter % 10) as u8;
        for (d, s) in short[8..].iter_mut().zip(ext.bytes()) {
            *d = s.to_ascii_uppercase();
        }
        (short, true)
    }

    fn checksum(short: &[u8; 11]) -> u8 {
        short
            .iter()
            .fold(0u8, |sum, &c| ((sum & 1) << 7).wrapping_add(sum >> 1).wrapping_add(c))
    }

    fn lfn_entries(name: &str, short: &[u8; 11]) -> Vec<[u8; 32]> {
        const OFFSETS: [usize; 13] = [1, 3, 5, 7, 9, 14, 16, 18, 20, 22, 24, 28, 30];
        let units: Vec<u16> = name.encode_utf16().collect();
        let count = units.len().div_ceil(13);
        let sum = Self::checksum(short);

        let mut out = Vec::new();
        for ordinal in (1..=count).rev() {
            let mut raw = [0u8; 32];
            raw[0] = ordinal as u8 | if ordinal == count { 0x40 } else { 0 };
            raw[11] = 0x0F;
            raw[13] = sum;
            for (i, off) in OFFSETS.iter().enumerate() {
                let idx = (ordinal - 1) * 13 + i;
                let unit = match idx.cmp(&units.len()) {
                    std::cmp::Ordering::Less => units[idx],
                    std::cmp::Ordering::Equal => 0x0000,
                    std::cmp::Ordering::Greater => 0xFFFF,
                };
                raw[*off..*off + 2].copy_from_slice(&unit.to_le_bytes());
            }
            out.push(raw);
        }
        out
    }

    fn add_entry(&mut self, dir: &str, name: &str, attr: u8, cluster: u32, size: u32) {
        let (short, needs_lfn) = self.short_name(name);
        let mut raw = [0u8; 32];
        raw[..11].copy_from_slice(&short);
        raw[11] = attr;
        raw[20..22].copy_from_slice(&((cluster >> 16) as u16).to_le_bytes());
        raw[26..28].copy_from_slice(&(cluster as u16).to_le_bytes());
        raw[28..32].copy_from_slice(&size.to_le_bytes());

        let entries = &mut self.dirs.get_mut(dir).expect("parent directory").1;
        if needs_lfn {
            entries.extend(Self::lfn_entries(name, &short));
        }
        entries.push(raw);
    }

    fn ensure_dir(&mut self, path: &str) {
        if self.dirs.contains_key(path) {
            return;
        }
        let (parent, name) = match path.rfind('/') {
            Some(slash) => (&path[..slash], &path[slash + 1..]),
            None => ("", path),
        };
        let parent = parent.to_string();
        let name = name.to_string();
        self.ensure_dir(&parent);
        let cluster = self.alloc_chain(DIR_CLUSTERS);
        self.add_entry(&parent, &name, 0x10, cluster, 0);
        self.dirs.insert(path.to_string(), (cluster, Vec::new()));
    }

    /// Add a file; missing parent directories are created.
    pub fn add_file(&mut self, path: &str, contents: &[u8]) -> &mut Self {
        let path = path.trim_start_matches('/');
        let (dir, name) = match path.rfind('/') {
            Some(slash) => (&path[..slash], &path[slash + 1..]),
            None => ("", path),
        };
        let dir = dir.to_string();
        self.ensure_dir(&dir);

        let clusters = contents.len().div_ceil(SECTOR) as u32;
        let first = if clusters == 0 { 0 } else { self.alloc_chain(clusters) };
        if clusters > 0 {
            let offset = (first as usize - 2) * SECTOR;
            self.data[offset..offset + contents.len()].copy_from_slice(contents);
        }
        self.add_entry(&dir, name, 0x20, first, contents.len() as u32);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut image = vec![0u8; self.total_sectors as usize * SECTOR];

        let bs = &mut image[..SECTOR];
        bs[..3].copy_from_slice(&[0xEB, 0x58, 0x90]);
        bs[3..11].copy_from_slice(b"MSWIN4.1");
        bs[0x0B..0x0D].copy_from_slice(&(SECTOR as u16).to_le_bytes());
        bs[0x0D] = 1;
        bs[0x0E..0x10].copy_from_slice(&(RESERVED as u16).to_le_bytes());
        bs[0x10] = NUM_FATS as u8;
        bs[0x15] = 0xF8;
        bs[0x20..0x24].copy_from_slice(&self.total_sectors.to_le_bytes());
        bs[0x24..0x28].copy_from_slice(&self.fat_size.to_le_bytes());
        bs[0x2C..0x30].copy_from_slice(&2u32.to_le_bytes());
        bs[0x52..0x5A].copy_from_slice(b"FAT32   ");
        bs[510] = 0x55;
        bs[511] = 0xAA;

        for copy in 0..NUM_FATS {
            let start = (RESERVED + copy * self.fat_size) as usize * SECTOR;
            for (i, entry) in self.fat.iter().enumerate() {
                let off = start + i * 4;
                image[off..off + 4].copy_from_slice(&entry.to_le_bytes());
            }
        }

        let data_start = (RESERVED + NUM_FATS * self.fat_size) as usize * SECTOR;
        image[data_start..data_start + self.data.len()].copy_from_slice(&self.data);

        for (cluster, entries) in self.dirs.values() {
            assert!(entries.len() * 32 <= DIR_CLUSTERS as usize * SECTOR);
            let base = data_start + (*cluster as usize - 2) * SECTOR;
            for (i, raw) in entries.iter().enumerate() {
                image[base + i * 32..base + i * 32 + 32].copy_from_slice(raw);
            }
        }
        image
    }
}
