//! Operator settings.
//!
//! `secrets/configuration-user.toml` holds the team passphrase and the edit
//! mode switch for one checkout. A missing file is bootstrapped from the
//! embedded template and the run stops so the operator can fill it in.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::cipher::Passphrase;
use crate::core::constants;
use crate::error::{ConfigError, Result};

const TEMPLATE: &str = include_str!("../../templates/configuration-user.toml");

const MIN_PASSPHRASE_LEN: usize = 20;

#[derive(Debug, Serialize, Deserialize)]
struct SettingsFile {
    settings: SettingsSection,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    #[serde(default)]
    passphrase: String,
    #[serde(default)]
    edit: bool,
    #[serde(default = "default_timeout")]
    provider_timeout_secs: u64,
}

fn default_timeout() -> u64 {
    constants::PROVIDER_TIMEOUT_SECS
}

/// Validated operator settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub passphrase: Passphrase,
    /// Whether human edits to the configuration plaintext are re-encrypted.
    pub edit: bool,
    pub provider_timeout: Duration,
}

impl Settings {
    /// Load settings, honouring the `CATAPULT_PASSPHRASE` override.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SettingsMissing` after writing the template when
    /// the file does not exist, or `ConfigError::InvalidSetting` when a value
    /// is out of policy.
    pub fn load(path: &Path) -> Result<Self> {
        let env = std::env::var(constants::PASSPHRASE_ENV)
            .ok()
            .filter(|v| !v.is_empty());
        Self::load_with(path, env)
    }

    /// Load settings with an explicit passphrase override.
    pub fn load_with(path: &Path, passphrase_override: Option<String>) -> Result<Self> {
        debug!(path = %path.display(), "loading settings");

        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, TEMPLATE)?;
            info!(path = %path.display(), "bootstrapped operator settings");
            return Err(ConfigError::SettingsMissing(path.to_path_buf()).into());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SettingsFile = toml::from_str(&contents).map_err(ConfigError::Parse)?;
        let section = file.settings;

        let passphrase = match passphrase_override {
            Some(value) => {
                debug!("passphrase taken from {}", constants::PASSPHRASE_ENV);
                value
            }
            None => section.passphrase,
        };
        validate_passphrase(&passphrase)?;

        if section.provider_timeout_secs == 0
            || section.provider_timeout_secs > constants::PROVIDER_TIMEOUT_SECS
        {
            return Err(ConfigError::InvalidSetting {
                field: "provider_timeout_secs",
                reason: format!(
                    "must be between 1 and {}",
                    constants::PROVIDER_TIMEOUT_SECS
                ),
            }
            .into());
        }

        Ok(Self {
            passphrase: Passphrase::new(passphrase),
            edit: section.edit,
            provider_timeout: Duration::from_secs(section.provider_timeout_secs),
        })
    }
}

fn validate_passphrase(passphrase: &str) -> Result<()> {
    if passphrase.is_empty() {
        return Err(ConfigError::InvalidSetting {
            field: "passphrase",
            reason: "is empty".to_string(),
        }
        .into());
    }
    if passphrase.chars().any(char::is_whitespace) {
        return Err(ConfigError::InvalidSetting {
            field: "passphrase",
            reason: "must not contain whitespace".to_string(),
        }
        .into());
    }
    if passphrase.chars().count() < MIN_PASSPHRASE_LEN {
        return Err(ConfigError::InvalidSetting {
            field: "passphrase",
            reason: format!("must be at least {} characters", MIN_PASSPHRASE_LEN),
        }
        .into());
    }
    Ok(())
}
