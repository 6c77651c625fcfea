//! Typed configuration models.
//!
//! # Design
//! - Pure data carriers; IO lives in `loader.rs`.
//! - Every field has a default so partial documents deserialize.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::defaults::{
    DEFAULT_DIR, LOCAL_ROOT, LOG_LEVEL, LONG_PRESS_MS, SELECTION_FILE_NAME, SHARE_TITLE,
};
use crate::error::ConfigError;

/// Coarse classification of the storage environment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PlatformClass {
    /// Sandboxed mobile platform; public storage needs an explicit grant and
    /// user-mediated share delegation is available.
    RestrictedMobile,
    /// Desktop or web style platform without a share sheet.
    Open,
}

impl PlatformClass {
    /// Render the class as its `snake_case` label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RestrictedMobile => "restricted_mobile",
            Self::Open => "open",
        }
    }
}

impl fmt::Display for PlatformClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformClass {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "restricted_mobile" => Ok(Self::RestrictedMobile),
            "open" => Ok(Self::Open),
            other => Err(ConfigError::invalid(
                "local",
                "platform",
                Some(other.to_string()),
                "unknown platform class",
            )),
        }
    }
}

/// Top-level configuration document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SaveConfig {
    /// Always-writable directory for the permission-denied fallback.
    pub default_dir: String,
    /// Title handed to the share surface.
    pub share_title: String,
    /// File name used when staging a selection.
    pub selection_file_name: String,
    /// Hold duration in milliseconds before a press resolves as long.
    pub long_press_ms: u64,
    /// Logging settings.
    pub telemetry: TelemetryConfig,
    /// Settings for the local filesystem capability adapters.
    pub local: LocalEnvironmentConfig,
}

impl SaveConfig {
    /// Hold duration as a [`Duration`].
    #[must_use]
    pub const fn long_press(&self) -> Duration {
        Duration::from_millis(self.long_press_ms)
    }
}

impl Default for SaveConfig {
    fn default() -> Self {
        Self {
            default_dir: DEFAULT_DIR.to_string(),
            share_title: SHARE_TITLE.to_string(),
            selection_file_name: SELECTION_FILE_NAME.to_string(),
            long_press_ms: LONG_PRESS_MS,
            telemetry: TelemetryConfig::default(),
            local: LocalEnvironmentConfig::default(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Log level used when `RUST_LOG` is unset.
    pub log_level: String,
    /// `json` or `pretty`; inferred from the build profile when absent.
    pub log_format: Option<String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: LOG_LEVEL.to_string(),
            log_format: None,
        }
    }
}

/// Settings for the local filesystem capability adapters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LocalEnvironmentConfig {
    /// Root directory all storage areas live under.
    pub root: PathBuf,
    /// Platform class reported to the save chain.
    pub platform: PlatformClass,
    /// Whether public storage permission is already granted.
    pub storage_permission: bool,
    /// Whether the environment may prompt for permission.
    pub can_prompt: bool,
    /// Whether a prompt results in a grant.
    pub grant_on_prompt: bool,
}

impl Default for LocalEnvironmentConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(LOCAL_ROOT),
            platform: PlatformClass::Open,
            storage_permission: true,
            can_prompt: false,
            grant_on_prompt: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_documents_fill_defaults() -> Result<(), serde_json::Error> {
        let config: SaveConfig = serde_json::from_value(json!({
            "long_press_ms": 500,
            "local": { "platform": "restricted_mobile" }
        }))?;
        assert_eq!(config.long_press(), Duration::from_millis(500));
        assert_eq!(config.default_dir, "Documents");
        assert_eq!(config.local.platform, PlatformClass::RestrictedMobile);
        assert!(config.local.storage_permission);
        Ok(())
    }

    #[test]
    fn platform_class_parses_and_formats() {
        assert_eq!(
            "restricted_mobile".parse::<PlatformClass>().ok(),
            Some(PlatformClass::RestrictedMobile)
        );
        assert_eq!("open".parse::<PlatformClass>().ok(), Some(PlatformClass::Open));
        assert!("android".parse::<PlatformClass>().is_err());
        assert_eq!(PlatformClass::RestrictedMobile.to_string(), "restricted_mobile");
    }
}
