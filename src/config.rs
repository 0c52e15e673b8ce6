use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::reencode::SizePolicy;

/// Top-level configuration for geotag-squeeze.
///
/// Controls the size ceiling and quality range of the re-encode, and where
/// output goes.
///
/// # Loading
///
/// ```rust,no_run
/// use geotag_squeeze::config::Config;
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.policy.max_size_bytes = 1024 * 1024;
/// config.output.suffix = "_small".into();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Size ceiling and quality descent.
    pub policy: SizePolicy,
    /// Output naming and write behavior.
    pub output: OutputConfig,
}

/// Output and behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the input's file stem when no output path is given.
    pub suffix: String,
    /// If `true`, process the image but do not write anything.
    pub dry_run: bool,
    /// If `true`, create a `.bak` backup before overwriting the input in place.
    pub backup_originals: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            suffix: "_geotagged".to_string(),
            dry_run: false,
            backup_originals: true,
        }
    }
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::warn!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        config
            .policy
            .validate()
            .with_context(|| format!("Invalid policy in {}", config_path.display()))?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
