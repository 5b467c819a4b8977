//! Application configuration loaded from a JSON file.
//!
//! Every field has a default so DriveStash works without a config file.
//! Call [`Config::load`] to read one from disk.

use crate::error::ConfigError;
use crate::walker::WalkOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "DRIVESTASH_CONFIG";

/// Highest deflate level accepted.
pub const MAX_COMPRESSION_LEVEL: i64 = 9;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub archive: ArchiveConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub walk: WalkConfig,
}

impl Config {
    /// Loads and validates configuration from a JSON file at `path`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Read`] if the file cannot be read.
    /// - [`ConfigError::Parse`] if the JSON is malformed.
    /// - [`ConfigError::Invalid`] if a value is out of range.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        tracing::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from `explicit`, else from `$DRIVESTASH_CONFIG`, else defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) if !path.is_empty() => Self::load(Path::new(&path)),
            _ => Ok(Self::default()),
        }
    }

    /// Reject values that parse but cannot be honoured.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0..=MAX_COMPRESSION_LEVEL).contains(&self.archive.compression_level) {
            return Err(ConfigError::Invalid(format!(
                "archive.compression_level must be between 0 and {MAX_COMPRESSION_LEVEL}, got {}",
                self.archive.compression_level
            )));
        }
        if self.archive.progress_capacity == 0 {
            return Err(ConfigError::Invalid(
                "archive.progress_capacity must be greater than 0".to_string(),
            ));
        }
        if self.archive.file_prefix.trim().is_empty()
            || self.archive.file_prefix.contains(['/', '\\'])
        {
            return Err(ConfigError::Invalid(format!(
                "archive.file_prefix must be a plain file name, got {:?}",
                self.archive.file_prefix
            )));
        }
        Ok(())
    }
}

/// Archive builder settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Deflate level, 0 (store-like) to 9 (smallest output).
    #[serde(default = "default_compression_level")]
    pub compression_level: i64,
    /// File name prefix for produced archives.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    /// Bound of the progress channel. Updates beyond it are dropped.
    #[serde(default = "default_progress_capacity")]
    pub progress_capacity: usize,
    /// Delete the partial container when a job fails.
    #[serde(default = "default_true")]
    pub remove_partial_on_failure: bool,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            compression_level: default_compression_level(),
            file_prefix: default_file_prefix(),
            progress_capacity: default_progress_capacity(),
            remove_partial_on_failure: true,
        }
    }
}

/// External probe command settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Seconds before a hung probe command is killed. `0` waits forever.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Deep-walk settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkConfig {
    /// Walker threads; `0` means one per logical CPU.
    #[serde(default)]
    pub threads: usize,
}

impl WalkConfig {
    pub fn options(&self) -> WalkOptions {
        WalkOptions {
            threads: self.threads,
        }
    }
}

fn default_compression_level() -> i64 {
    MAX_COMPRESSION_LEVEL
}

fn default_file_prefix() -> String {
    "archive".to_string()
}

fn default_progress_capacity() -> usize {
    64
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(json.as_bytes()).unwrap();
        f
    }

    #[test]
    fn defaults_use_maximum_compression() {
        let config = Config::default();
        assert_eq!(config.archive.compression_level, 9);
        assert_eq!(config.archive.file_prefix, "archive");
        assert!(config.archive.remove_partial_on_failure);
        assert_eq!(config.probe.timeout(), Some(Duration::from_secs(10)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_object_is_all_defaults() {
        let f = write_config("{}");
        assert_eq!(Config::load(f.path()).unwrap(), Config::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let f = write_config(r#"{ "archive": { "compression_level": 3 }, "walk": { "threads": 2 } }"#);
        let config = Config::load(f.path()).unwrap();
        assert_eq!(config.archive.compression_level, 3);
        assert_eq!(config.archive.progress_capacity, 64);
        assert_eq!(config.walk.options().threads, 2);
    }

    #[test]
    fn out_of_range_level_is_invalid() {
        let f = write_config(r#"{ "archive": { "compression_level": 12 } }"#);
        assert!(matches!(
            Config::load(f.path()).unwrap_err(),
            ConfigError::Invalid(_)
        ));
    }

    #[test]
    fn zero_capacity_is_invalid() {
        let mut config = Config::default();
        config.archive.progress_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn prefix_with_separator_is_invalid() {
        let mut config = Config::default();
        config.archive.file_prefix = "../escape".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let f = write_config("{ not json");
        assert!(matches!(
            Config::load(f.path()).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = Config::load(Path::new("/definitely/not/a/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn zero_timeout_disables_it() {
        let probe = ProbeConfig { timeout_secs: 0 };
        assert_eq!(probe.timeout(), None);
    }
}
