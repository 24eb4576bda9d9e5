use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::{ImportError, Result};
use crate::normalize::DateOrder;

pub const ENV_API_URL: &str = "STMT_IMPORT_API_URL";
pub const ENV_API_TOKEN: &str = "STMT_IMPORT_API_TOKEN";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub api_base_url: String,
    #[serde(default = "default_import_path")]
    pub import_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,
    #[serde(default)]
    pub date_order: DateOrder,
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_error_display_limit")]
    pub error_display_limit: usize,
    #[serde(default = "default_true")]
    pub use_system_proxy: bool,
}

fn default_import_path() -> String {
    "/api/v1/card-statements/import".to_string()
}

fn default_recent_limit() -> usize {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_error_display_limit() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: String::new(),
            import_path: default_import_path(),
            api_token: None,
            date_order: DateOrder::default(),
            recent_limit: default_recent_limit(),
            timeout_secs: default_timeout_secs(),
            error_display_limit: default_error_display_limit(),
            use_system_proxy: true,
        }
    }
}

pub const KEYS: &[&str] = &[
    "api_base_url",
    "import_path",
    "api_token",
    "date_order",
    "recent_limit",
    "timeout_secs",
    "error_display_limit",
    "use_system_proxy",
];

impl Settings {
    /// Environment variables win over the settings file.
    pub fn api_base_url(&self) -> String {
        std::env::var(ENV_API_URL)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    pub fn api_token(&self) -> Option<Zeroizing<String>> {
        std::env::var(ENV_API_TOKEN)
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| self.api_token.clone())
            .map(Zeroizing::new)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Update one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let bad = |what: &str| ImportError::Settings(format!("{key}: expected {what}, got {value:?}"));
        match key {
            "api_base_url" => self.api_base_url = value.trim().to_string(),
            "import_path" => self.import_path = value.trim().to_string(),
            "api_token" => {
                self.api_token = (!value.is_empty()).then(|| value.to_string());
            }
            "date_order" => {
                self.date_order = match value.trim().replace('-', "_").as_str() {
                    "day_first" => DateOrder::DayFirst,
                    "month_first" => DateOrder::MonthFirst,
                    _ => return Err(bad("day-first or month-first")),
                }
            }
            "recent_limit" => self.recent_limit = value.trim().parse().map_err(|_| bad("a number"))?,
            "timeout_secs" => self.timeout_secs = value.trim().parse().map_err(|_| bad("a number"))?,
            "error_display_limit" => {
                self.error_display_limit = value.trim().parse().map_err(|_| bad("a number"))?
            }
            "use_system_proxy" => self.use_system_proxy = value.trim().parse().map_err(|_| bad("true or false"))?,
            _ => {
                return Err(ImportError::Settings(format!(
                    "unknown key {key:?} (expected one of: {})",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("stmt-import")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn recent_path() -> PathBuf {
    config_dir().join("recent.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

fn load_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    let content = std::fs::read_to_string(path).unwrap_or_default();
    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "settings file unreadable, using defaults");
        Settings::default()
    })
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| ImportError::Settings(e.to_string()))?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}
