//! Human-readable duration parsing (e.g., "30s", "5m", "500ms").

use std::time::Duration;
use thiserror::Error;

/// Error parsing a duration string.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid duration '{input}' - expected format like '500ms', '30s', '5m' or '1h'")]
pub struct DurationParseError {
    input: String,
}

impl DurationParseError {
    fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Parse a human-readable duration string.
///
/// Supports:
/// - Bare numbers (treated as seconds)
/// - `ms` suffix (milliseconds)
/// - `s` suffix (seconds)
/// - `m` suffix (minutes)
/// - `h` suffix (hours)
/// - Case-insensitive, whitespace tolerant
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use groupexec::config::parse_duration;
///
/// assert_eq!(parse_duration("60").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// assert_eq!(parse_duration("5 m").unwrap(), Duration::from_secs(300));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, DurationParseError> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(DurationParseError::new(s));
    }
    let lower = trimmed.to_lowercase();

    // "ms" must be checked before "m" and "s"
    let (num_str, millis_per_unit) = if let Some(num) = lower.strip_suffix("ms") {
        (num, 1_u64)
    } else if let Some(num) = lower.strip_suffix('s') {
        (num, 1_000)
    } else if let Some(num) = lower.strip_suffix('m') {
        (num, 60_000)
    } else if let Some(num) = lower.strip_suffix('h') {
        (num, 3_600_000)
    } else {
        (lower.as_str(), 1_000)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| DurationParseError::new(s))?;

    num.checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| DurationParseError::new(s))
}

/// Format a duration using the largest unit that divides it evenly.
///
/// ```
/// use std::time::Duration;
/// use groupexec::config::format_duration;
///
/// assert_eq!(format_duration(Duration::from_secs(120)), "2m");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1500ms");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis == 0 {
        return "0s".to_string();
    }
    if millis % 3_600_000 == 0 {
        format!("{}h", millis / 3_600_000)
    } else if millis % 60_000 == 0 {
        format!("{}m", millis / 60_000)
    } else if millis % 1_000 == 0 {
        format!("{}s", millis / 1_000)
    } else {
        format!("{}ms", millis)
    }
}
