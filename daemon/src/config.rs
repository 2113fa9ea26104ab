//! Configuration management (TOML)

use crate::error::ConfigError;
use crate::sampler::TargetMatcher;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Image name of the download manager watched by default.
pub const DEFAULT_PROCESS_NAME: &str = "IDMan.exe";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub process_name: String,
    pub case_insensitive: bool,
    pub log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub welcome: bool,
    pub on_close: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            process_name: DEFAULT_PROCESS_NAME.to_string(),
            case_insensitive: false,
            log_level: "info".to_string(),
            install_path: None,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            welcome: true,
            on_close: false,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], but a missing file is `Ok(None)`.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, ConfigError> {
        if path.exists() {
            Self::load(path).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("", "", "autocloser")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("config.toml"))
    }

    pub fn target(&self) -> TargetMatcher {
        if self.general.case_insensitive {
            TargetMatcher::case_insensitive(&self.general.process_name)
        } else {
            TargetMatcher::exact(&self.general.process_name)
        }
    }
}
