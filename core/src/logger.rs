// Global logging sink for bootstd
//
// Records go through the `log` facade and the newest MAX_LOG_ENTRIES are
// kept in memory so a firmware console can dump them after the fact.

use alloc::collections::VecDeque;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use spin::Mutex;

pub const MAX_LOG_ENTRIES: usize = 64;

pub struct RingLogger {
    entries: Mutex<VecDeque<String>>,
}

impl RingLogger {
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, line: String) {
        let mut entries = self.entries.lock();
        if entries.len() == MAX_LOG_ENTRIES {
            entries.pop_front();
        }
        entries.push_back(line);
    }
}

impl Log for RingLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        self.push(format!(
            "[{} {}] {}",
            record.level(),
            record.target(),
            record.args()
        ));
    }

    fn flush(&self) {}
}

static LOGGER: RingLogger = RingLogger::new();

/// Install the ring sink as the global logger.
///
/// Fails if another logger was installed first; the level is applied
/// either way.
pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_max_level(level);
    log::set_logger(&LOGGER)
}

pub fn get_logs() -> Vec<String> {
    LOGGER.entries.lock().iter().cloned().collect()
}

pub fn log_count() -> usize {
    LOGGER.entries.lock().len()
}

pub fn clear() {
    LOGGER.entries.lock().clear();
}
