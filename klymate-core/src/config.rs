use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};

use crate::model::Coordinates;

pub const DEFAULT_BASE_URL: &str = "https://kly-mate.onrender.com";
/// Generous enough to cover a cold start of an idle backend.
pub const DEFAULT_TIMEOUT_SECS: u64 = 45;
/// Bengaluru.
pub const DEFAULT_COORDINATES: Coordinates = Coordinates { latitude: 12.9716, longitude: 77.5946 };

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// base_url = "https://kly-mate.onrender.com"
/// timeout_secs = 45
/// default_latitude = 12.9716
/// default_longitude = 77.5946
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub timeout_secs: u64,
    pub default_latitude: f64,
    pub default_longitude: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            default_latitude: DEFAULT_COORDINATES.latitude,
            default_longitude: DEFAULT_COORDINATES.longitude,
        }
    }
}

impl Config {
    /// The backend location as a validated absolute http(s) URL.
    pub fn base_url(&self) -> Result<Url> {
        parse_base_url(&self.base_url)
    }

    /// Validate and store a new backend location.
    pub fn set_base_url(&mut self, raw: &str) -> Result<()> {
        let url = parse_base_url(raw)?;
        self.base_url = url.as_str().trim_end_matches('/').to_string();
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn set_timeout_secs(&mut self, secs: u64) -> Result<()> {
        if secs == 0 {
            bail!("Timeout must be at least one second");
        }
        self.timeout_secs = secs;
        Ok(())
    }

    pub fn default_coordinates(&self) -> Coordinates {
        Coordinates::new(self.default_latitude, self.default_longitude)
    }

    pub fn set_default_coordinates(&mut self, coords: Coordinates) {
        self.default_latitude = coords.latitude;
        self.default_longitude = coords.longitude;
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            // First run: no config file, use defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "klymate", "klymate-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    fn from_toml(contents: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(contents)?;
        cfg.base_url()?;
        if cfg.timeout_secs == 0 {
            bail!("timeout_secs must be at least 1");
        }
        Ok(cfg)
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).with_context(|| format!("Invalid base URL '{raw}'"))?;

    if !matches!(url.scheme(), "http" | "https") {
        bail!("Unsupported scheme '{}' in base URL '{raw}'. Expected http or https.", url.scheme());
    }
    if url.query().is_some() || url.fragment().is_some() {
        bail!("Base URL '{raw}' must not carry a query string or fragment");
    }

    Ok(url)
}
