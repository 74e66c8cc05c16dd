//! Settings model and persistence.
//!
//! Settings live in a single JSON file under the user's configuration
//! directory. A missing file reads as all-empty settings, and writes go
//! through a temp file plus rename so a crash never leaves a torn file.
//! Environment variables override persisted values at startup.

use refract_compose::ComposeConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment override for the composer base URL.
pub const ENV_BASE_URL: &str = "REFRACT_COMPOSE_BASE_URL";
/// Accepted alias for [`ENV_BASE_URL`].
pub const ENV_BASE_URL_ALIAS: &str = "REFRACT_COMPOSE_ENDPOINT";
/// Environment override for the model identifier.
pub const ENV_MODEL: &str = "REFRACT_COMPOSE_MODEL";
/// Environment override for the API key.
pub const ENV_API_KEY: &str = "REFRACT_COMPOSE_API_KEY";
/// Environment override for the default-compose preference (`1`/`true`).
pub const ENV_PREFER_COMPOSED: &str = "REFRACT_PREFER_COMPOSED";

/// Errors produced while loading or persisting settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    /// The platform configuration directory could not be determined.
    #[error("could not determine the settings directory")]
    NoConfigDir,

    /// Reading or writing the settings file failed.
    #[error("settings file access: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file contents were not valid JSON.
    #[error("settings encoding: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Persisted configuration options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Composer endpoint base; empty disables composition.
    #[serde(default)]
    pub base_url: String,
    /// Model identifier sent to the composer endpoint.
    #[serde(default)]
    pub model: String,
    /// Bearer credential for the composer endpoint.
    #[serde(default)]
    pub api_key: String,
    /// Whether plain navigations default to composed rendering.
    #[serde(default)]
    pub prefer_composed: bool,
}

impl Settings {
    /// Copy with every string field trimmed.
    #[must_use]
    pub fn trimmed(&self) -> Self {
        Self {
            base_url: self.base_url.trim().to_string(),
            model: self.model.trim().to_string(),
            api_key: self.api_key.trim().to_string(),
            prefer_composed: self.prefer_composed,
        }
    }

    /// Overlay process environment overrides; non-empty values win.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.overlay(|key| std::env::var(key).ok())
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(base) = non_empty(ENV_BASE_URL).or_else(|| non_empty(ENV_BASE_URL_ALIAS)) {
            self.base_url = base;
        }
        if let Some(model) = non_empty(ENV_MODEL) {
            self.model = model;
        }
        if let Some(key) = non_empty(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(flag) = non_empty(ENV_PREFER_COMPOSED) {
            self.prefer_composed = parse_boolish(&flag);
        }

        self
    }

    /// Composer configuration derived from these settings.
    #[must_use]
    pub fn to_compose_config(&self, timeout: Duration) -> ComposeConfig {
        ComposeConfig {
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            api_key: self.api_key.clone(),
            timeout,
        }
    }
}

fn parse_boolish(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed == "1" || trimmed.eq_ignore_ascii_case("true")
}

/// Persistence capability for [`Settings`].
pub trait SettingsStore: Send + Sync {
    /// Load persisted settings. A missing store reads as default
    /// (all-empty) settings, not an error.
    fn load(&self) -> Result<Settings, SettingsError>;

    /// Persist `settings`.
    fn save(&self, settings: &Settings) -> Result<(), SettingsError>;
}

/// JSON-file settings store.
pub struct JsonSettingsStore {
    path: PathBuf,
}

impl JsonSettingsStore {
    /// Store reading and writing `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Store at the default per-user location
    /// (`<config dir>/refract/settings.json`).
    pub fn default_location() -> Result<Self, SettingsError> {
        let dir = dirs::config_dir().ok_or(SettingsError::NoConfigDir)?;
        Ok(Self::new(dir.join("refract").join("settings.json")))
    }

    /// The file this store reads and writes.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonSettingsStore {
    fn load(&self) -> Result<Settings, SettingsError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = ?self.path, "no settings file, using defaults");
                Ok(Settings::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let encoded = serde_json::to_vec_pretty(settings)?;

        // Temp file plus rename keeps the settings file whole on crash.
        let mut tmp = self.path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, encoded)?;
        fs::rename(&tmp, &self.path)?;

        tracing::info!(path = ?self.path, "settings saved");
        Ok(())
    }
}
