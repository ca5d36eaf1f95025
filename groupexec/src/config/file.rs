//! Group configuration file handling for ~/.groupexec/groups.ini.
//!
//! Settings structs live in [`super::settings`], constants in
//! [`super::defaults`] and parsing in [`super::parser`].

use ini::Ini;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::defaults::{CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use super::settings::{GroupConfigFile, GroupConfiguration};
use super::source::GroupConfigurationSource;
use crate::executor::GroupPath;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Config text is not valid INI
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] ini::ParseError),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Settings resolved for a group cannot be used
    #[error("Invalid configuration for group {path}: {reason}")]
    InvalidGroup { path: String, reason: String },
}

impl GroupConfigFile {
    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        super::parser::parse_ini(&ini)
    }

    /// Parse configuration from INI text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        super::parser::parse_ini(&ini)
    }
}

/// Group settings backed by an INI file that can be re-read at runtime.
///
/// [`reload`](Self::reload) swaps in the new settings atomically. Pools and
/// admission nodes that already exist keep the sizes they were built with;
/// only paths first seen after the reload use the new values.
#[derive(Debug)]
pub struct IniGroupConfigurations {
    path: PathBuf,
    file: RwLock<GroupConfigFile>,
}

impl IniGroupConfigurations {
    /// Load from the default path (~/.groupexec/groups.ini).
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let file = GroupConfigFile::load_from(path)?;
        tracing::info!(
            path = %path.display(),
            groups = file.groups.len(),
            "Loaded group configuration"
        );
        Ok(Self {
            path: path.to_path_buf(),
            file: RwLock::new(file),
        })
    }

    /// Re-reads the file. On error the previous settings stay in effect.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let file = GroupConfigFile::load_from(&self.path)?;
        tracing::info!(
            path = %self.path.display(),
            groups = file.groups.len(),
            "Reloaded group configuration"
        );
        *self.file.write() = file;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the current settings.
    pub fn snapshot(&self) -> GroupConfigFile {
        self.file.read().clone()
    }
}

impl GroupConfigurationSource for IniGroupConfigurations {
    fn configuration(&self, path: &GroupPath) -> Result<GroupConfiguration, ConfigError> {
        let configuration = self.file.read().resolve(path);
        configuration.validate(path)?;
        Ok(configuration)
    }
}

/// Get the path to the config directory (~/.groupexec).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR_NAME)
}

/// Get the path to the config file (~/.groupexec/groups.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join(CONFIG_FILE_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults::DEFAULT_POOL_SIZE;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.ini");

        let configurations = IniGroupConfigurations::load_from(&config_path).unwrap();
        assert_eq!(configurations.snapshot(), GroupConfigFile::default());
        assert_eq!(configurations.path(), config_path.as_path());
    }

    #[test]
    fn test_load_and_resolve() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("groups.ini");
        std::fs::write(&config_path, "[group:a/b]\npool_size = 2\n").unwrap();

        let configurations = IniGroupConfigurations::load_from(&config_path).unwrap();
        let config = configurations
            .configuration(&GroupPath::new(["a", "b"]))
            .unwrap();
        assert_eq!(config.pool_size, 2);
    }

    #[test]
    fn test_reload_picks_up_changes() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("groups.ini");
        std::fs::write(&config_path, "[group:a]\npool_size = 2\n").unwrap();

        let configurations = IniGroupConfigurations::load_from(&config_path).unwrap();
        let a = GroupPath::new(["a"]);
        assert_eq!(configurations.configuration(&a).unwrap().pool_size, 2);

        std::fs::write(&config_path, "[group:a]\npool_size = 6\n").unwrap();
        configurations.reload().unwrap();
        assert_eq!(configurations.configuration(&a).unwrap().pool_size, 6);
    }

    #[test]
    fn test_failed_reload_keeps_previous_settings() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let config_path = temp_dir.path().join("groups.ini");
        std::fs::write(&config_path, "[group:a]\npool_size = 2\n").unwrap();

        let configurations = IniGroupConfigurations::load_from(&config_path).unwrap();
        std::fs::write(&config_path, "[group:a]\npool_size = zero\n").unwrap();

        assert!(configurations.reload().is_err());
        let a = GroupPath::new(["a"]);
        assert_eq!(configurations.configuration(&a).unwrap().pool_size, 2);
    }

    #[test]
    fn test_parse_text() {
        let file = GroupConfigFile::parse("[defaults]\npool_size = 4\n").unwrap();
        assert_eq!(file.defaults.pool_size, 4);
        assert_ne!(file.defaults.pool_size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_config_file_path_layout() {
        let path = config_file_path();
        assert!(path.ends_with(".groupexec/groups.ini"));
    }
}
