//! INI parsing logic for converting `Ini` → `GroupConfigFile`.
//!
//! Layout:
//!
//! ```ini
//! [defaults]
//! pool_size = 1
//! priority = 5
//! keep_alive = 60s
//!
//! [group:site-A/indexing]
//! pool_size = 2
//! ```
//!
//! Keys missing from a `[group:...]` section are taken from `[defaults]`.

use ini::{Ini, Properties};

use super::duration::parse_duration;
use super::file::ConfigError;
use super::settings::{GroupConfigFile, GroupConfiguration};
use crate::executor::GroupPath;

/// Name of the section holding defaults.
pub const DEFAULTS_SECTION: &str = "defaults";

/// Prefix of per-group section names, followed by the slash-separated path.
pub const GROUP_SECTION_PREFIX: &str = "group:";

/// Parse an `Ini` object into a `GroupConfigFile`.
///
/// Starts from `GroupConfigFile::default()` and overlays any values found in the INI.
pub(super) fn parse_ini(ini: &Ini) -> Result<GroupConfigFile, ConfigError> {
    let mut config = GroupConfigFile::default();

    if let Some(section) = ini.section(Some(DEFAULTS_SECTION)) {
        config.defaults = parse_group_section(DEFAULTS_SECTION, section, config.defaults)?;
    }

    for (name, section) in ini.iter() {
        let Some(name) = name else { continue };
        if name == DEFAULTS_SECTION {
            continue;
        }
        let Some(raw_path) = name.strip_prefix(GROUP_SECTION_PREFIX) else {
            tracing::warn!(section = name, "Ignoring unknown configuration section");
            continue;
        };
        let path: GroupPath = match raw_path.parse() {
            Ok(path) => path,
            Err(never) => match never {},
        };
        let group = parse_group_section(name, section, config.defaults)?;
        group.validate(&path)?;
        config.groups.insert(path, group);
    }

    Ok(config)
}

fn parse_group_section(
    section_name: &str,
    section: &Properties,
    base: GroupConfiguration,
) -> Result<GroupConfiguration, ConfigError> {
    let mut group = base;

    for (key, value) in section.iter() {
        match key {
            "pool_size" => {
                group.pool_size = value.trim().parse().map_err(|_| {
                    invalid(section_name, key, value, "must be a positive integer")
                })?;
                if group.pool_size == 0 {
                    return Err(invalid(section_name, key, value, "must be at least 1"));
                }
            }
            "priority" => {
                group.priority = value.trim().parse().map_err(|_| {
                    invalid(section_name, key, value, "must be an integer from 1 to 10")
                })?;
            }
            "keep_alive" => {
                group.keep_alive = parse_duration(value).map_err(|_| {
                    invalid(
                        section_name,
                        key,
                        value,
                        "expected format like '500ms', '30s', '5m' or '1h'",
                    )
                })?;
            }
            other => {
                tracing::warn!(
                    section = section_name,
                    key = other,
                    "Ignoring unknown configuration key"
                );
            }
        }
    }

    Ok(group)
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
