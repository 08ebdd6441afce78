use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Error as SerdeError;
use tracing::warn;

use crate::domain::options::DEFAULT_PAGE_SIZE;
use crate::infra::tms::{DEFAULT_BASE_URL, DEFAULT_TTL};

const APP_QUALIFIER: &str = "com";
const APP_ORG: &str = "LaneRateScanner";
const APP_NAME: &str = "LaneRateScanner";

pub const ENV_API_URL: &str = "TMS_API_URL";
pub const ENV_CACHE_TTL: &str = "TMS_CACHE_TTL_SECS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub api_base_url: String,
    pub cache_ttl_secs: u64,
    pub default_page_size: usize,
    pub default_mode_of_transport: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            default_page_size: DEFAULT_PAGE_SIZE,
            default_mode_of_transport: None,
        }
    }
}

impl Settings {
    /// Environment values win over the file; unparsable ones are ignored.
    pub fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_CACHE_TTL) {
            match raw.trim().parse() {
                Ok(secs) => self.cache_ttl_secs = secs,
                Err(_) => warn!(value = %raw, "ignoring invalid {ENV_CACHE_TTL}"),
            }
        }
        self
    }
}

pub fn settings_file() -> Option<PathBuf> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORG, APP_NAME)
        .map(|dirs| dirs.config_dir().join("settings.json"))
}

/// Defaults when the file is missing or unreadable.
pub fn load_settings_from(path: &Path) -> Settings {
    let Ok(data) = fs::read_to_string(path) else {
        return Settings::default();
    };
    serde_json::from_str(&data).unwrap_or_else(|error| {
        warn!(%error, path = %path.display(), "settings file unreadable, using defaults");
        Settings::default()
    })
}

pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    fs::write(path, json)?;
    Ok(())
}

/// File settings overlaid with the process environment.
pub fn load_settings() -> Settings {
    settings_file()
        .map(|path| load_settings_from(&path))
        .unwrap_or_default()
        .apply_env(|key| std::env::var(key).ok())
}

pub fn save_settings(settings: &Settings) -> Result<(), SettingsError> {
    let path = settings_file().ok_or(SettingsError::StorageUnavailable)?;
    save_settings_to(&path, settings)
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("storage directory unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serde(#[from] SerdeError),
}
