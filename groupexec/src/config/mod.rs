//! Group configuration for the executor.
//!
//! Every group path resolves to a [`GroupConfiguration`] (pool size, thread
//! priority, idle keep-alive) through a [`GroupConfigurationSource`]. Two
//! sources are provided:
//!
//! - [`StaticGroupConfigurations`]: built in code, mutable at runtime
//! - [`IniGroupConfigurations`]: read from an INI file, re-readable with `reload()`
//!
//! # Example
//!
//! ```
//! use groupexec::config::{GroupConfigFile, GroupConfigurationSource, StaticGroupConfigurations};
//! use groupexec::executor::GroupPath;
//!
//! let file = GroupConfigFile::parse("[group:site-A/indexing]\npool_size = 2\n").unwrap();
//! let configurations = StaticGroupConfigurations::from_file(file);
//!
//! let path = GroupPath::new(["site-A", "indexing"]);
//! assert_eq!(configurations.configuration(&path).unwrap().pool_size, 2);
//! ```

mod defaults;
mod duration;
mod file;
mod parser;
mod settings;
mod source;

pub use defaults::{
    default_keep_alive, CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_KEEP_ALIVE_SECS,
    DEFAULT_POOL_SIZE, DEFAULT_PRIORITY, MAX_PRIORITY, MIN_PRIORITY, NORM_PRIORITY,
};
pub use duration::{format_duration, parse_duration, DurationParseError};
pub use file::{config_directory, config_file_path, ConfigError, IniGroupConfigurations};
pub use parser::{DEFAULTS_SECTION, GROUP_SECTION_PREFIX};
pub use settings::{GroupConfigFile, GroupConfiguration};
pub use source::{GroupConfigurationSource, StaticGroupConfigurations};
