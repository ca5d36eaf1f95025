//! Lookup of group settings by path.
//!
//! The executor asks a [`GroupConfigurationSource`] for a path's settings the
//! first time it sees that path, when building the path's worker pool and
//! admission node. Sources may change their answers at runtime; only paths
//! seen after the change pick up the new values.

use super::file::ConfigError;
use super::settings::{GroupConfigFile, GroupConfiguration};
use crate::executor::GroupPath;
use parking_lot::RwLock;

/// Resolves the settings for a group path.
pub trait GroupConfigurationSource: Send + Sync {
    /// Returns validated settings for `path`.
    fn configuration(&self, path: &GroupPath) -> Result<GroupConfiguration, ConfigError>;
}

/// In-memory group settings that can be changed while the executor runs.
///
/// # Example
///
/// ```
/// use groupexec::config::{GroupConfiguration, GroupConfigurationSource, StaticGroupConfigurations};
/// use groupexec::executor::GroupPath;
///
/// let site = GroupPath::new(["site-A"]);
/// let configurations = StaticGroupConfigurations::new()
///     .with_group(site.clone(), GroupConfiguration::with_pool_size(4));
///
/// assert_eq!(configurations.configuration(&site).unwrap().pool_size, 4);
/// ```
#[derive(Debug, Default)]
pub struct StaticGroupConfigurations {
    file: RwLock<GroupConfigFile>,
}

impl StaticGroupConfigurations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps settings read elsewhere.
    pub fn from_file(file: GroupConfigFile) -> Self {
        Self {
            file: RwLock::new(file),
        }
    }

    /// Replaces the settings used for paths without their own entry.
    pub fn with_defaults(self, defaults: GroupConfiguration) -> Self {
        self.file.write().defaults = defaults;
        self
    }

    pub fn with_group(self, path: GroupPath, configuration: GroupConfiguration) -> Self {
        self.set_group(path, configuration);
        self
    }

    /// Adds or replaces the entry for `path`.
    pub fn set_group(&self, path: GroupPath, configuration: GroupConfiguration) {
        self.file.write().groups.insert(path, configuration);
    }

    /// Removes the entry for `path`, returning it to the defaults.
    pub fn remove_group(&self, path: &GroupPath) -> Option<GroupConfiguration> {
        self.file.write().groups.remove(path)
    }
}

impl GroupConfigurationSource for StaticGroupConfigurations {
    fn configuration(&self, path: &GroupPath) -> Result<GroupConfiguration, ConfigError> {
        let configuration = self.file.read().resolve(path);
        configuration.validate(path)?;
        Ok(configuration)
    }
}
