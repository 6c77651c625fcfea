//! Layered configuration loading.
//!
//! # Design
//! - Layers apply in order: defaults, optional JSON file, `SAVETIER_*` environment.
//! - The environment is passed in explicitly so tests never touch process state.
//! - Validation runs once on the fully layered document.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::model::SaveConfig;
use crate::validate::validate;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "SAVETIER_";

/// Environment variable naming the configuration file; consumed by the CLI,
/// not treated as an override.
pub const CONFIG_PATH_ENV: &str = "SAVETIER_CONFIG";

/// Builder that layers configuration sources.
#[derive(Debug, Default, Clone)]
pub struct ConfigLoader {
    file: Option<PathBuf>,
    env: Vec<(String, String)>,
}

impl ConfigLoader {
    /// Start from built-in defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer a JSON configuration file on top of the defaults.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Layer environment overrides; only `SAVETIER_*` keys are considered.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env.extend(
            vars.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .filter(|(key, _)| key.starts_with(ENV_PREFIX) && key != CONFIG_PATH_ENV),
        );
        self
    }

    /// Layer the current process environment.
    #[must_use]
    pub fn with_process_env(self) -> Self {
        self.with_env(std::env::vars())
    }

    /// Resolve every layer and validate the result.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, an override is
    /// unknown or malformed, or the final document fails validation.
    pub fn load(&self) -> ConfigResult<SaveConfig> {
        let mut config = match &self.file {
            Some(path) => read_file(path)?,
            None => SaveConfig::default(),
        };
        for (key, value) in &self.env {
            apply_override(&mut config, key, value)?;
            debug!(key = %key, "applied configuration override");
        }
        validate(&config)?;
        info!(
            default_dir = %config.default_dir,
            long_press_ms = config.long_press_ms,
            platform = %config.local.platform,
            "configuration loaded"
        );
        Ok(config)
    }
}

fn read_file(path: &Path) -> ConfigResult<SaveConfig> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        operation: "config.read",
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn apply_override(config: &mut SaveConfig, key: &str, value: &str) -> ConfigResult<()> {
    let field = key.trim_start_matches(ENV_PREFIX);
    match field {
        "DEFAULT_DIR" => config.default_dir = value.to_string(),
        "SHARE_TITLE" => config.share_title = value.to_string(),
        "SELECTION_FILE_NAME" => config.selection_file_name = value.to_string(),
        "LONG_PRESS_MS" => {
            config.long_press_ms = value.parse().map_err(|_| {
                ConfigError::invalid(
                    "save",
                    "long_press_ms",
                    Some(value.to_string()),
                    "not an integer",
                )
            })?;
        }
        "LOG_LEVEL" => config.telemetry.log_level = value.to_string(),
        "LOG_FORMAT" => config.telemetry.log_format = Some(value.to_string()),
        "LOCAL_ROOT" => config.local.root = PathBuf::from(value),
        "PLATFORM" => config.local.platform = value.parse()?,
        "STORAGE_PERMISSION" => {
            config.local.storage_permission = parse_flag("storage_permission", value)?;
        }
        "CAN_PROMPT" => config.local.can_prompt = parse_flag("can_prompt", value)?,
        "GRANT_ON_PROMPT" => {
            config.local.grant_on_prompt = parse_flag("grant_on_prompt", value)?;
        }
        _ => {
            return Err(ConfigError::UnknownOverride {
                key: key.to_string(),
            });
        }
    }
    Ok(())
}

fn parse_flag(field: &'static str, value: &str) -> ConfigResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(
            "local",
            field,
            Some(value.to_string()),
            "not a boolean",
        )),
    }
}
