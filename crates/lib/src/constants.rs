//! Default values for [`ProgressConfig`](crate::config::ProgressConfig).

use std::time::Duration;

/// Medium key the position mapping is stored under.
pub const DEFAULT_STORAGE_KEY: &str = "readingProgressData";

/// Quiet time after the last scroll before the offset is sampled.
pub const DEFAULT_THROTTLE_DELAY: Duration = Duration::from_millis(300);

/// Quiet time after a sample before it is written.
pub const DEFAULT_SAVE_DEBOUNCE_DELAY: Duration = Duration::from_millis(1000);

/// Maximum number of remembered pages.
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Records older than this are removed by the sweep.
pub const DEFAULT_PURGE_THRESHOLD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Period of the expiry sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
