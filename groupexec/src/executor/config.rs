//! Executor configuration.
//!
//! Per-group pool settings come from a
//! [`GroupConfigurationSource`](crate::config::GroupConfigurationSource);
//! [`ExecutorConfig`] only covers the standalone pool.

use crate::config::{default_keep_alive, DEFAULT_PRIORITY};
use std::time::Duration;

/// Configuration for the job executor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Idle time after which a standalone worker thread exits.
    pub standalone_keep_alive: Duration,

    /// Priority of standalone worker threads, 1..=10.
    pub standalone_priority: i32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            standalone_keep_alive: default_keep_alive(),
            standalone_priority: DEFAULT_PRIORITY,
        }
    }
}

impl ExecutorConfig {
    pub fn with_standalone_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.standalone_keep_alive = keep_alive;
        self
    }

    pub fn with_standalone_priority(mut self, priority: i32) -> Self {
        self.standalone_priority = priority;
        self
    }
}
