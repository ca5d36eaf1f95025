//! Per-group execution settings.

use super::defaults::*;
use super::file::ConfigError;
use crate::executor::GroupPath;
use std::collections::HashMap;
use std::time::Duration;

/// Settings for the worker pool and admission node of one group path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupConfiguration {
    /// Maximum concurrent jobs whose group is exactly this path.
    pub pool_size: usize,
    /// Worker thread priority, `MIN_PRIORITY..=MAX_PRIORITY`.
    pub priority: i32,
    /// Idle time after which a worker thread exits.
    pub keep_alive: Duration,
}

impl Default for GroupConfiguration {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            priority: DEFAULT_PRIORITY,
            keep_alive: default_keep_alive(),
        }
    }
}

impl GroupConfiguration {
    /// Default settings with the given pool size.
    pub fn with_pool_size(pool_size: usize) -> Self {
        Self {
            pool_size,
            ..Self::default()
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    /// Checks the settings before a pool is built from them.
    pub fn validate(&self, path: &GroupPath) -> Result<(), ConfigError> {
        if self.pool_size == 0 {
            return Err(ConfigError::InvalidGroup {
                path: path.to_string(),
                reason: "pool_size must be at least 1".to_string(),
            });
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(ConfigError::InvalidGroup {
                path: path.to_string(),
                reason: format!(
                    "priority {} outside {}..={}",
                    self.priority, MIN_PRIORITY, MAX_PRIORITY
                ),
            });
        }
        Ok(())
    }
}

/// Defaults plus exact-path overrides, as read from a configuration file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupConfigFile {
    /// Settings for any path without its own entry.
    pub defaults: GroupConfiguration,
    /// Per-path overrides.
    pub groups: HashMap<GroupPath, GroupConfiguration>,
}

impl GroupConfigFile {
    /// Returns the settings for `path`: its own entry, else the defaults.
    ///
    /// Resolution is exact; a path does not inherit its parent's entry.
    pub fn resolve(&self, path: &GroupPath) -> GroupConfiguration {
        self.groups.get(path).copied().unwrap_or(self.defaults)
    }
}
