//! Configuration module
//!
//! Settings are read once at startup from a JSON file and a handful of
//! environment overrides. Nothing is reloaded while the process runs.

use crate::error::{AppError, AppResult};
use crate::models::{parse_prayer_time, RawTimes, TimeRules};
use crate::provider::{validate_source_url, DEFAULT_SOURCE_URL};
use log::info;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_PATH_ENV: &str = "PRAYERCHIME_CONFIG";
pub const TOKEN_ENV: &str = "PRAYERCHIME_TOKEN";
pub const OFFSET_ENV: &str = "PRAYERCHIME_OFFSET";
pub const SOURCE_URL_ENV: &str = "PRAYERCHIME_SOURCE_URL";
pub const DRY_RUN_ENV: &str = "PRAYERCHIME_DRY_RUN";

fn default_offset() -> u32 {
    15
}
fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}
fn default_poll_interval() -> u64 {
    2
}
fn default_delivery_attempts() -> u32 {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Minutes before each prayer that the reminder fires. Must stay below 60.
    #[serde(default = "default_offset")]
    pub offset_minutes: u32,
    #[serde(default)]
    pub pushbullet_token: Option<String>,
    #[serde(default = "default_source_url")]
    pub source_url: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Hours added to the local clock before matching windows.
    #[serde(default)]
    pub hour_shift: u32,
    #[serde(default)]
    pub time_rules: TimeRules,
    /// Serve these five times every day instead of scraping the website.
    #[serde(default)]
    pub fixed_times: Option<RawTimes>,
    /// Log reminders instead of pushing them.
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default = "default_delivery_attempts")]
    pub delivery_attempts: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            offset_minutes: default_offset(),
            pushbullet_token: None,
            source_url: default_source_url(),
            poll_interval_secs: default_poll_interval(),
            hour_shift: 0,
            time_rules: TimeRules::default(),
            fixed_times: None,
            dry_run: false,
            delivery_attempts: default_delivery_attempts(),
        }
    }
}

impl Config {
    /// `$PRAYERCHIME_CONFIG`, else `<config dir>/prayerchime/config.json`.
    pub fn config_path() -> AppResult<PathBuf> {
        if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }
        dirs::config_dir()
            .map(|dir| dir.join("prayerchime").join("config.json"))
            .ok_or_else(|| AppError::config("Could not determine the config directory"))
    }

    /// Loads the config file (defaults when absent) and applies env overrides.
    pub fn load() -> AppResult<Self> {
        let path = Self::config_path()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            info!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|e| AppError::config(format!("Parsing {}: {}", path.display(), e)))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> AppResult<()> {
        if let Ok(token) = env::var(TOKEN_ENV) {
            self.pushbullet_token = Some(token);
        }
        if let Ok(offset) = env::var(OFFSET_ENV) {
            self.offset_minutes = offset
                .trim()
                .parse()
                .map_err(|_| AppError::config(format!("{} must be a whole number of minutes", OFFSET_ENV)))?;
        }
        if let Ok(url) = env::var(SOURCE_URL_ENV) {
            self.source_url = url;
        }
        if let Ok(flag) = env::var(DRY_RUN_ENV) {
            self.dry_run = matches!(flag.trim().to_lowercase().as_str(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.offset_minutes >= 60 {
            return Err(AppError::config(format!(
                "offset_minutes must be below 60, got {}",
                self.offset_minutes
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(AppError::config("poll_interval_secs must be at least 1"));
        }
        if self.delivery_attempts == 0 {
            return Err(AppError::config("delivery_attempts must be at least 1"));
        }

        match &self.fixed_times {
            Some(times) => {
                for raw in times {
                    parse_prayer_time(raw, self.time_rules)
                        .map_err(|e| AppError::config(format!("fixed_times: {}", e)))?;
                }
            }
            None => {
                validate_source_url(&self.source_url)?;
            }
        }

        if !self.dry_run && self.token().is_none() {
            return Err(AppError::config(format!(
                "No Pushbullet token configured; set pushbullet_token or {} (or enable dry_run)",
                TOKEN_ENV
            )));
        }

        if self.hour_shift >= 24 {
            return Err(AppError::config(format!(
                "hour_shift must be below 24, got {}",
                self.hour_shift
            )));
        }

        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.pushbullet_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Config {
        Config {
            pushbullet_token: Some("o.test-token".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.offset_minutes, 15);
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.time_rules, TimeRules::Literal);
        assert_eq!(config.hour_shift, 0);
        assert!(!config.dry_run);
    }

    #[test]
    fn test_validation_passes() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_offset_must_stay_below_an_hour() {
        let config = Config { offset_minutes: 60, ..valid() };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_token_required_unless_dry_run() {
        let config = Config { pushbullet_token: Some("   ".to_string()), ..valid() };
        assert!(config.validate().is_err());

        let config = Config { dry_run: true, ..config };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_source_url_must_be_https() {
        let config = Config { source_url: "http://masjid.example/".to_string(), ..valid() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fixed_times_are_checked() {
        let good = ["5:12am", "1:03pm", "4:30pm", "7:15pm", "8:45pm"].map(String::from);
        let config = Config {
            fixed_times: Some(good),
            source_url: String::new(),
            ..valid()
        };
        assert!(config.validate().is_ok());

        let bad = ["5:12am", "1:03pm", "half four", "7:15pm", "8:45pm"].map(String::from);
        let config = Config { fixed_times: Some(bad), ..config };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config = serde_json::from_str(r#"{"offset_minutes": 10, "time_rules": "civil"}"#).unwrap();
        assert_eq!(config.offset_minutes, 10);
        assert_eq!(config.time_rules, TimeRules::Civil);
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.delivery_attempts, 3);
    }

    #[test]
    fn test_hour_shift_must_stay_below_a_day() {
        let config = Config { hour_shift: 23, ..valid() };
        assert!(config.validate().is_ok());

        let config = Config { hour_shift: 24, ..valid() };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config: Config =
            serde_json::from_str(r#"{"hour_shift": 4294967295, "dry_run": true}"#).unwrap();
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }
}
