use crate::drive::DriveLetter;
use crate::error::{GoldDriveError, Result};
use crate::orchestrator::DEFAULT_TRANSPORT_TIMEOUT;
use crate::policy::LetterPolicy;
use crate::settings::SettingsStore;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_CONFIG: &str = "GOLDDRIVE_CONFIG";
pub const ENV_TIMEOUT: &str = "GOLDDRIVE_TIMEOUT_SECS";
pub const ENV_RESERVED: &str = "GOLDDRIVE_RESERVED";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GoldDriveConfig {
    /// Settings document; `None` means the per-user default location.
    pub settings_path: Option<PathBuf>,
    pub transport_timeout_secs: u64,
    /// Reserved on top of the system policy.
    pub reserved_letters: Vec<DriveLetter>,
}

impl Default for GoldDriveConfig {
    fn default() -> Self {
        Self {
            settings_path: None,
            transport_timeout_secs: DEFAULT_TRANSPORT_TIMEOUT.as_secs(),
            reserved_letters: Vec::new(),
        }
    }
}

impl GoldDriveConfig {
    /// Defaults overridden by `GOLDDRIVE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            config.settings_path = Some(PathBuf::from(path));
        }

        if let Some(secs) = lookup(ENV_TIMEOUT) {
            config.transport_timeout_secs = secs
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| {
                    GoldDriveError::Configuration(format!("{} must be a positive integer, got '{}'", ENV_TIMEOUT, secs))
                })?;
        }

        if let Some(letters) = lookup(ENV_RESERVED) {
            config.reserved_letters = letters
                .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
                .filter(|part| !part.is_empty())
                .map(|part| {
                    part.parse::<DriveLetter>().map_err(|_| {
                        GoldDriveError::Configuration(format!("{}: '{}' is not a drive letter", ENV_RESERVED, part))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
        }

        Ok(config)
    }

    pub fn transport_timeout(&self) -> Duration {
        Duration::from_secs(self.transport_timeout_secs)
    }

    pub fn letter_policy(&self) -> LetterPolicy {
        LetterPolicy::system().with_reserved(self.reserved_letters.iter().copied())
    }

    pub fn settings_store(&self) -> Result<SettingsStore> {
        let path = match &self.settings_path {
            Some(path) => path.clone(),
            None => SettingsStore::default_location()?,
        };
        Ok(SettingsStore::new(path))
    }
}
