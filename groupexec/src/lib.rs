//! groupexec - hierarchical grouped job execution
//!
//! Runs blocking jobs on OS threads with per-group concurrency quotas. Groups
//! form a tree of paths; a job holding its group excludes all activity in
//! the groups below it.
//!
//! - [`executor`]: the [`JobExecutor`](executor::JobExecutor), pools and
//!   admission control
//! - [`config`]: per-group pool settings, static or loaded from INI
//! - [`logging`]: tracing subscriber setup for embedding applications

pub mod config;
pub mod executor;
pub mod logging;

/// Version of the groupexec library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
