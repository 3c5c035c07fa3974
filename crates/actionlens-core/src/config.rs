use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Runtime settings, loaded from `actionlens.toml`. Every field has a default
/// so a missing file or an empty table is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// GitHub token; falls back to `GITHUB_TOKEN` when unset.
    pub github_token: Option<String>,
    /// Retry attempts for network-class API failures.
    pub api_max_retries: u32,
    /// Fixed delay between retries, in seconds.
    pub api_retry_delay_secs: u64,
    /// Pause for the rate window to reset once remaining calls drop below this.
    pub rate_limit_threshold: u64,
    /// Tag/branch metadata store (JSON), if pre-fetched.
    pub actions_data: Option<PathBuf>,
    /// Marketplace listing store (JSON), if pre-fetched.
    pub marketplace_data: Option<PathBuf>,
    /// First-party owner list (JSON).
    pub firstparty_data: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            github_token: None,
            api_max_retries: 3,
            api_retry_delay_secs: 10,
            rate_limit_threshold: 16,
            actions_data: None,
            marketplace_data: None,
            firstparty_data: None,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read settings file '{}': {}", path.display(), e))?;
        let settings: Settings = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse settings file '{}': {}", path.display(), e))?;
        Ok(settings)
    }

    /// Load from a path if given, otherwise defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Settings::default()),
        }
    }

    pub fn token(&self) -> Option<String> {
        self.github_token
            .clone()
            .or_else(|| std::env::var("GITHUB_TOKEN").ok())
    }
}
