//! Process-wide configuration, built once from CLI arguments.

use std::path::PathBuf;
use std::time::Duration;

/// The artificial per-seat/per-event access delay (spec §4.2), plus the
/// pool sizes that bound the two concurrency levels.
#[derive(Debug, Clone)]
pub struct Config {
    pub dir_path: PathBuf,
    pub max_proc: usize,
    pub max_threads: usize,
    pub access_delay: Duration,
}

/// Default access delay when none is given on the command line, matching
/// the original's `STATE_ACCESS_DELAY_MS`.
pub const DEFAULT_ACCESS_DELAY_MS: u64 = 0;

impl Config {
    pub fn new(dir_path: PathBuf, max_proc: usize, max_threads: usize, delay_ms: Option<u64>) -> Self {
        Config {
            dir_path,
            max_proc: max_proc.max(1),
            max_threads: max_threads.max(1),
            access_delay: Duration::from_millis(delay_ms.unwrap_or(DEFAULT_ACCESS_DELAY_MS)),
        }
    }
}
