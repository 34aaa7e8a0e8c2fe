//! Configuration management
//!
//! Settings live in `settings.json` inside the data directory:
//! ```json
//! {
//!   "app": { "defaultHubName": "My Move", "signupPromptThreshold": 5, "storageMode": null }
//! }
//! ```
//! Keys this crate does not know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ports::StorageMode;

pub const SETTINGS_FILENAME: &str = "settings.json";
pub const GUEST_STORE_FILENAME: &str = "guest-store.json";
pub const DATABASE_FILENAME: &str = "moveplan.duckdb";
pub const AUTH_FILENAME: &str = "auth.json";

/// Overrides `app.storageMode` when set
pub const STORAGE_MODE_ENV: &str = "MOVEPLAN_STORAGE_MODE";

pub const DEFAULT_HUB_NAME: &str = "My Move";
pub const DEFAULT_SIGNUP_PROMPT_THRESHOLD: u64 = 5;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_hub_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signup_prompt_threshold: Option<u64>,
    #[serde(default)]
    storage_mode: Option<StorageMode>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Moveplan configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub default_hub_name: String,
    pub signup_prompt_threshold: u64,
    /// Forced storage mode; `None` follows the auth state
    pub storage_mode: Option<StorageMode>,
    // Keep the raw settings for preservation when saving
    _raw_settings: SettingsFile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_hub_name: DEFAULT_HUB_NAME.to_string(),
            signup_prompt_threshold: DEFAULT_SIGNUP_PROMPT_THRESHOLD,
            storage_mode: None,
            _raw_settings: SettingsFile::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// The storage mode can be forced via:
    /// 1. Settings file (`app.storageMode`)
    /// 2. Environment variable MOVEPLAN_STORAGE_MODE (wins over the file)
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(&data_dir.join(SETTINGS_FILENAME))?;
        Self::resolve(raw, std::env::var(STORAGE_MODE_ENV).ok().as_deref())
    }

    fn resolve(raw: SettingsFile, env_mode: Option<&str>) -> Result<Self> {
        let storage_mode = match env_mode.map(str::trim).filter(|s| !s.is_empty()) {
            Some(value) => Some(
                value
                    .parse::<StorageMode>()
                    .with_context(|| format!("Invalid {}", STORAGE_MODE_ENV))?,
            ),
            None => raw.app.storage_mode,
        };

        let default_hub_name = raw
            .app
            .default_hub_name
            .clone()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_HUB_NAME.to_string());

        Ok(Self {
            default_hub_name,
            signup_prompt_threshold: raw
                .app
                .signup_prompt_threshold
                .unwrap_or(DEFAULT_SIGNUP_PROMPT_THRESHOLD),
            storage_mode,
            _raw_settings: raw,
        })
    }

    /// Save config to the data directory
    /// Preserves other settings that moveplan doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join(SETTINGS_FILENAME);

        // Load existing settings to preserve fields we don't manage
        let mut settings = read_settings(&settings_path)?;

        settings.app.default_hub_name = Some(self.default_hub_name.clone());
        settings.app.signup_prompt_threshold = Some(self.signup_prompt_threshold);
        settings.app.storage_mode = self.storage_mode;

        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create {}", data_dir.display()))?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

/// A missing file means defaults; an unparseable one is ignored the same way
fn read_settings(path: &Path) -> Result<SettingsFile> {
    if !path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable settings");
        SettingsFile::default()
    }))
}
