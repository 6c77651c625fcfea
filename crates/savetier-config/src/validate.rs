//! Validation helpers for configuration documents.

use crate::defaults::MAX_LONG_PRESS_MS;
use crate::error::{ConfigError, ConfigResult};
use crate::model::SaveConfig;

/// Validate a fully layered configuration document.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] for the first field that fails.
pub fn validate(config: &SaveConfig) -> ConfigResult<()> {
    validate_relative_dir("save", "default_dir", &config.default_dir)?;
    validate_file_name("save", "selection_file_name", &config.selection_file_name)?;
    if config.share_title.trim().is_empty() {
        return Err(ConfigError::invalid(
            "save",
            "share_title",
            Some(config.share_title.clone()),
            "empty",
        ));
    }
    validate_long_press(config.long_press_ms)?;
    validate_log_format(config.telemetry.log_format.as_deref())?;
    if config.local.root.as_os_str().is_empty() {
        return Err(ConfigError::invalid("local", "root", None, "empty"));
    }
    Ok(())
}

/// Require a slash-separated relative directory without traversal segments.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty, absolute, or
/// contains empty, `.` or `..` segments.
pub fn validate_relative_dir(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> ConfigResult<()> {
    let fail = |reason| ConfigError::invalid(section, field, Some(value.to_string()), reason);
    if value.is_empty() {
        return Err(fail("empty"));
    }
    if value.starts_with('/') {
        return Err(fail("absolute"));
    }
    if value
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..")
    {
        return Err(fail("invalid segment"));
    }
    Ok(())
}

/// Require a single path segment.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidField`] when the value is empty, contains a
/// separator, or is a relative directory marker.
pub fn validate_file_name(
    section: &'static str,
    field: &'static str,
    value: &str,
) -> ConfigResult<()> {
    let reason = if value.trim().is_empty() {
        Some("empty")
    } else if value.contains('/') {
        Some("contains separator")
    } else if value == "." || value == ".." {
        Some("invalid segment")
    } else {
        None
    };
    reason.map_or(Ok(()), |reason| {
        Err(ConfigError::invalid(
            section,
            field,
            Some(value.to_string()),
            reason,
        ))
    })
}

fn validate_long_press(value: u64) -> ConfigResult<()> {
    if (1..=MAX_LONG_PRESS_MS).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::invalid(
            "save",
            "long_press_ms",
            Some(value.to_string()),
            "out of range",
        ))
    }
}

fn validate_log_format(value: Option<&str>) -> ConfigResult<()> {
    match value {
        None | Some("json" | "pretty") => Ok(()),
        Some(other) => Err(ConfigError::invalid(
            "telemetry",
            "log_format",
            Some(other.to_string()),
            "unknown format",
        )),
    }
}
