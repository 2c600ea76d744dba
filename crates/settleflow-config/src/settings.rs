//! User settings (`~/.config/settleflow/settings.yaml`)
//!
//! ```yaml
//! arm:
//!   endpoint: https://management.azure.com
//! settle:
//!   interval_secs: 60
//!   debounce: 2
//! ```
//!
//! Environment variables win over the file: `SETTLE_ARM_ENDPOINT` replaces
//! `arm.endpoint`. The bearer token is only ever read from `SETTLE_ARM_TOKEN`.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_ARM_ENDPOINT: &str = "https://management.azure.com";

const SETTINGS_FILE: &str = "settings.yaml";
const ENDPOINT_ENV: &str = "SETTLE_ARM_ENDPOINT";
const TOKEN_ENV: &str = "SETTLE_ARM_TOKEN";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub arm: ArmSettings,
    pub settle: SettleSettings,
}

/// Management API connection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArmSettings {
    pub endpoint: String,
}

impl Default for ArmSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ARM_ENDPOINT.to_string(),
        }
    }
}

/// Overrides for the settle poller timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleSettings {
    pub interval_secs: u64,
    pub debounce: u32,
}

impl Default for SettleSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            debounce: 2,
        }
    }
}

impl SettleSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Settings {
    /// Load from the user config directory, falling back to defaults
    pub fn load() -> Result<Self> {
        let settings = match dirs::config_dir() {
            Some(dir) => {
                let path = dir.join(crate::CONFIG_DIR_NAME).join(SETTINGS_FILE);
                if path.exists() {
                    Self::load_from(&path)?
                } else {
                    Self::default()
                }
            }
            None => Self::default(),
        };
        Ok(settings.with_env_overrides())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::InvalidSettings {
                path: path.display().to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(endpoint) = std::env::var(ENDPOINT_ENV)
            && !endpoint.is_empty()
        {
            self.arm.endpoint = endpoint;
        }
        self
    }

    /// Bearer token for the management API
    pub fn token() -> Result<String> {
        std::env::var(TOKEN_ENV)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(TOKEN_ENV.to_string()))
    }
}
