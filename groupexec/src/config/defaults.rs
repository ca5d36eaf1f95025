//! Default values and limits for group configuration.

use std::time::Duration;

/// Pool size used for a group without its own configuration.
pub const DEFAULT_POOL_SIZE: usize = 1;

/// Lowest accepted thread priority.
pub const MIN_PRIORITY: i32 = 1;

/// Normal thread priority; worker threads run unchanged at this level.
pub const NORM_PRIORITY: i32 = 5;

/// Highest accepted thread priority.
pub const MAX_PRIORITY: i32 = 10;

/// Default worker thread priority.
pub const DEFAULT_PRIORITY: i32 = NORM_PRIORITY;

/// Default idle time before a worker thread exits.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 60;

pub fn default_keep_alive() -> Duration {
    Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS)
}

/// Name of the config directory under the user's home.
pub const CONFIG_DIR_NAME: &str = ".groupexec";

/// Name of the group configuration file.
pub const CONFIG_FILE_NAME: &str = "groups.ini";
