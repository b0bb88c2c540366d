//! System configuration
//!
//! Stored at `<config_dir>/cloner/config.toml`. A missing file means
//! defaults; every field is optional in the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the configuration directory")]
    NoConfigDir,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("{key} = {value} is out of range ({range})")]
    OutOfRange {
        key: &'static str,
        value: String,
        range: &'static str,
    },

    #[error("invalid in-progress suffix {0:?}: must be '.' followed by plain extension characters")]
    InvalidSuffix(String),
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Download watcher timings and filters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period after the last modification before a file is checked
    pub debounce_ms: u64,

    /// Wait between two size samples
    pub poll_interval_ms: u64,

    /// Number of waits in one stability check
    pub stability_rounds: u32,

    /// Give up after this long without a placed file (0 = never)
    pub timeout_secs: u64,

    /// File name suffixes of downloads still in progress
    pub in_progress_suffixes: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 3000,
            poll_interval_ms: 1500,
            stability_rounds: 5,
            timeout_secs: 3600,
            in_progress_suffixes: vec![".crdownload".into(), ".part".into(), ".tmp".into()],
        }
    }
}

impl WatchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Config {
    /// Check every value against its allowed range
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.watch;

        check_range("watch.debounce_ms", w.debounce_ms, 10, 60_000, "10-60000")?;
        check_range("watch.poll_interval_ms", w.poll_interval_ms, 10, 60_000, "10-60000")?;
        check_range("watch.stability_rounds", w.stability_rounds.into(), 1, 100, "1-100")?;
        check_range("watch.timeout_secs", w.timeout_secs, 0, 86_400, "0-86400")?;

        for suffix in &w.in_progress_suffixes {
            if !is_plain_suffix(suffix) {
                return Err(ConfigError::InvalidSuffix(suffix.clone()));
            }
        }

        Ok(())
    }

    /// Read configuration from an explicit path, defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write configuration to an explicit path, creating parent directories
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let data = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, data).map_err(write_err)
    }
}

/// A `.` followed by characters that are neither glob syntax nor separators
fn is_plain_suffix(suffix: &str) -> bool {
    const RESERVED: &[char] = &['*', '?', '[', ']', '{', '}', '!', '/', '\\'];

    match suffix.strip_prefix('.') {
        Some(ext) => !ext.is_empty() && !ext.contains(RESERVED) && !ext.contains(char::is_whitespace),
        None => false,
    }
}

fn check_range(key: &'static str, value: u64, min: u64, max: u64, range: &'static str) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::OutOfRange {
            key,
            value: value.to_string(),
            range,
        });
    }
    Ok(())
}

/// Location of the system configuration file
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    let dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
    Ok(dir.join("cloner").join("config.toml"))
}

/// Load the system configuration
pub fn load() -> Result<Config, ConfigError> {
    let path = config_file_path()?;
    let config = Config::load_from(&path)?;
    tracing::debug!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Save the system configuration
pub fn save(config: &Config) -> Result<(), ConfigError> {
    config.save_to(&config_file_path()?)
}

/// Write the default configuration if no file exists yet
pub fn init_if_missing() -> Result<PathBuf, ConfigError> {
    let path = config_file_path()?;
    if !path.exists() {
        Config::default().save_to(&path)?;
        tracing::info!("Created default config at {}", path.display());
    }
    Ok(path)
}

/// Annotated example configuration
pub fn example_config() -> &'static str {
    r#"# Cloner configuration
# Location: <config dir>/cloner/config.toml

[watch]
# Quiet period after the last write before a download is checked (10-60000)
debounce_ms = 3000

# Wait between two size samples (10-60000)
poll_interval_ms = 1500

# Size samples must match across this many waits (1-100)
stability_rounds = 5

# Stop waiting after this many seconds without a placed file (0 = never)
timeout_secs = 3600

# Browser temporary-download extensions that are never placed
in_progress_suffixes = [".crdownload", ".part", ".tmp"]
"#
}
