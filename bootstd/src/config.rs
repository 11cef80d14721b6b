//! Configuration: firmware properties, the environment and bootstd settings.

use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Ordered string key/value store.
///
/// Used for firmware-provided properties (a device-tree node's worth of
/// settings) and for the environment exported to boot scripts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    entries: Vec<(String, String)>,
}

/// Environment variables shared with scripts and loaders
pub type Env = Properties;

fn parse_u64(value: &str) -> Option<u64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl Properties {
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Parse `key=value` lines. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Self {
        let mut props = Self::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                props.set(key.trim(), value.trim());
            }
        }
        props
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Decimal, or hex with a `0x` prefix.
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(parse_u64)
    }

    /// Hex with or without `0x`, the way addresses are kept in the environment.
    pub fn get_hex(&self, key: &str) -> Option<u64> {
        let value = self.get(key)?.trim();
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);
        u64::from_str_radix(digits, 16).ok()
    }

    pub fn set(&mut self, key: &str, value: &str) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.entries.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Directories searched for boot files, in order
pub const DEFAULT_PREFIXES: [&str; 2] = ["/", "/boot/"];

#[derive(Clone, Debug)]
pub struct BootstdConfig {
    pub prefixes: Vec<String>,
    pub env: Env,
}

impl Default for BootstdConfig {
    fn default() -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES.iter().map(|p| p.to_string()).collect(),
            env: Env::new(),
        }
    }
}

impl BootstdConfig {
    /// Build from the bootstd property node; `filename-prefixes` is a
    /// space separated list.
    pub fn from_properties(node: &Properties, env: Env) -> Self {
        let mut config = Self {
            env,
            ..Self::default()
        };
        if let Some(list) = node.get("filename-prefixes") {
            let prefixes: Vec<String> = list.split_whitespace().map(|p| p.to_string()).collect();
            if !prefixes.is_empty() {
                config.prefixes = prefixes;
            }
        }
        config
    }
}
