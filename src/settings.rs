use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AllowanceError, Result};
use crate::money::Cents;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_data_file")]
    pub data_file: String,
    /// Allowance per cycle, in dollars.
    #[serde(default = "default_budget")]
    pub budget: f64,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_file() -> String {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("allowance")
        .join("toys.csv")
        .to_string_lossy()
        .to_string()
}

fn default_budget() -> f64 {
    25.0
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            budget: default_budget(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    pub fn budget_cents(&self) -> Cents {
        Cents::from_dollars(self.budget)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.budget.is_finite() || self.budget < 0.0 {
            return Err(AllowanceError::Settings(format!(
                "budget must be a non-negative amount, got {}",
                self.budget
            )));
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("allowance")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    load_settings_from(&settings_path())
}

/// Missing, unreadable or malformed files all fall back to defaults.
pub fn load_settings_from(path: &Path) -> Settings {
    if path.exists() {
        let content = std::fs::read_to_string(path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    save_settings_to(settings, &settings_path())
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<()> {
    settings.validate()?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}
