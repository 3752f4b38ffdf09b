//! Configuration for the scanner.
//!
//! Loaded from config.json next to the executable at startup. The result is an
//! immutable snapshot shared with the scanner thread.

use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::detection::ClassificationRule;

/// Complete scanner configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Seconds between foreground checks while no game is focused
    #[serde(default = "default_poll_interval_idle_secs")]
    pub poll_interval_idle_secs: u64,
    /// Seconds between screenshots while a game is focused
    #[serde(default = "default_capture_interval_secs")]
    pub capture_interval_secs: u64,
    /// JPEG quality, 1-100
    #[serde(default = "default_image_quality")]
    pub image_quality: u8,
    /// Screenshot root. Relative paths are resolved against the executable directory.
    #[serde(default = "default_output_root")]
    pub output_root: PathBuf,
    /// One of off, error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(flatten)]
    pub rules: ClassificationRule,
}

fn default_poll_interval_idle_secs() -> u64 {
    10
}

fn default_capture_interval_secs() -> u64 {
    300
}

fn default_image_quality() -> u8 {
    80
}

fn default_output_root() -> PathBuf {
    PathBuf::from("Screenshots")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_idle_secs: default_poll_interval_idle_secs(),
            capture_interval_secs: default_capture_interval_secs(),
            image_quality: default_image_quality(),
            output_root: default_output_root(),
            log_level: default_log_level(),
            rules: ClassificationRule::default(),
        }
    }
}

impl Config {
    pub fn poll_interval_idle(&self) -> Duration {
        Duration::from_secs(self.poll_interval_idle_secs)
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }

    pub fn log_level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level)
            .map_err(|_| anyhow!("Invalid log_level {:?}", self.log_level))
    }

    /// Checks every field. The scanner assumes a validated config.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_idle_secs == 0 {
            return Err(anyhow!("poll_interval_idle_secs must be greater than 0"));
        }
        if self.capture_interval_secs == 0 {
            return Err(anyhow!("capture_interval_secs must be greater than 0"));
        }
        if !(1..=100).contains(&self.image_quality) {
            return Err(anyhow!(
                "image_quality must be between 1 and 100, got {}",
                self.image_quality
            ));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(anyhow!("output_root must not be empty"));
        }
        self.log_level_filter()?;
        self.rules.compile()?;
        Ok(())
    }

    /// Returns a copy with `output_root` made absolute against `base`.
    pub fn resolved(mut self, base: &Path) -> Self {
        self.output_root = crate::paths::resolve_against(base, &self.output_root);
        self
    }
}

/// Loads and validates the config at `path`.
///
/// A missing file yields the defaults and writes them out as a template.
/// A file that exists but cannot be read, parsed or validated is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let config = Config::default();
        if let Err(e) = save_config(path, &config) {
            log::warn!("Could not write default config to {}: {:#}", path.display(), e);
        } else {
            log::info!("Wrote default config to {}", path.display());
        }
        return Ok(config);
    }

    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: Config = serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("Invalid configuration in {}", path.display()))?;
    Ok(config)
}

/// Writes `config` as pretty-printed JSON.
pub fn save_config(path: &Path, config: &Config) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}
