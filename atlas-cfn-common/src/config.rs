//! Handler configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://cloud.mongodb.com";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("HOME is not set and no config path was given")]
    NoHome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    pub log_level: String,
    pub log_json: bool,
    pub profiles_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 30,
            user_agent: format!("atlas-cfn-resources/{}", env!("CARGO_PKG_VERSION")),
            log_level: "info".to_string(),
            log_json: false,
            profiles_path: None,
        }
    }
}

impl Settings {
    /// Load settings from `$ATLAS_CFN_CONFIG` or the per-user config file, then apply env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let path = match std::env::var_os("ATLAS_CFN_CONFIG") {
            Some(p) => PathBuf::from(p),
            None => config_dir()?.join("config.toml"),
        };

        let mut settings = Self::load_from(&path)?;
        settings.apply_env();
        Ok(settings)
    }

    /// Load settings from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MONGODB_ATLAS_BASE_URL") {
            if !url.is_empty() {
                self.base_url = url;
            }
        }
        if let Ok(level) = std::env::var("ATLAS_CFN_LOG_LEVEL") {
            if !level.is_empty() {
                self.log_level = level;
            }
        }
    }

    /// Where profiles are read from when no explicit path is configured
    pub fn profiles_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.profiles_path {
            Some(p) => Ok(p.clone()),
            None => Ok(config_dir()?.join("profiles.toml")),
        }
    }
}

fn config_dir() -> Result<PathBuf, ConfigError> {
    let home = std::env::var("HOME").map_err(|_| ConfigError::NoHome)?;
    Ok(PathBuf::from(home).join(".config/atlas-cfn"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://localhost:9000\"\nlog_json = true\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.base_url, "http://localhost:9000");
        assert!(settings.log_json);
        assert_eq!(settings.request_timeout_secs, 30);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "request_timeout_secs = \"soon\"").unwrap();

        assert!(matches!(Settings::load_from(&path), Err(ConfigError::Parse { .. })));
    }
}
