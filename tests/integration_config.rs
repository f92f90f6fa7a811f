use prayerchime::app::{build_monitor, build_provider, build_sink};
use prayerchime::config::{Config, CONFIG_PATH_ENV, DRY_RUN_ENV, OFFSET_ENV, SOURCE_URL_ENV, TOKEN_ENV};
use prayerchime::{AppError, PrayerName, TimeRules};
use serial_test::serial;
use std::fs;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn clear_env() {
    for key in [CONFIG_PATH_ENV, TOKEN_ENV, OFFSET_ENV, SOURCE_URL_ENV, DRY_RUN_ENV] {
        std::env::remove_var(key);
    }
}

fn write_config(dir: &TempDir, json: &str) -> std::path::PathBuf {
    let path = dir.path().join("config.json");
    fs::write(&path, json).unwrap();
    path
}

#[test]
#[serial]
fn test_missing_file_gives_defaults() {
    clear_env();
    let dir = TempDir::new().unwrap();
    std::env::set_var(CONFIG_PATH_ENV, dir.path().join("absent.json"));

    let config = Config::load().unwrap();
    assert_eq!(config.offset_minutes, 15);
    assert!(config.pushbullet_token.is_none());
    clear_env();
}

#[test]
#[serial]
fn test_file_then_env_overrides() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"{"offset_minutes": 10, "pushbullet_token": "from-file", "hour_shift": 1, "time_rules": "civil"}"#,
    );
    std::env::set_var(CONFIG_PATH_ENV, &path);
    std::env::set_var(TOKEN_ENV, "from-env");
    std::env::set_var(OFFSET_ENV, "20");

    let config = Config::load().unwrap();
    assert_eq!(config.offset_minutes, 20);
    assert_eq!(config.token(), Some("from-env"));
    assert_eq!(config.hour_shift, 1);
    assert_eq!(config.time_rules, TimeRules::Civil);
    assert!(config.validate().is_ok());
    clear_env();
}

#[test]
#[serial]
fn test_bad_offset_env_is_a_config_error() {
    clear_env();
    let dir = TempDir::new().unwrap();
    std::env::set_var(CONFIG_PATH_ENV, dir.path().join("absent.json"));
    std::env::set_var(OFFSET_ENV, "a quarter hour");

    assert!(matches!(Config::load(), Err(AppError::Config(_))));
    clear_env();
}

#[test]
#[serial]
fn test_malformed_file_is_reported() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "{ not json");

    assert!(matches!(Config::load_from(&path), Err(AppError::Config(_))));
}

#[test]
fn test_dry_run_uses_log_sink() {
    let config = Config { dry_run: true, ..Config::default() };
    assert_eq!(build_sink(&config).unwrap().name(), "log");

    let config = Config { pushbullet_token: Some("o.token".to_string()), ..Config::default() };
    assert_eq!(build_sink(&config).unwrap().name(), "pushbullet");
}

#[test]
fn test_provider_choice_follows_fixed_times() {
    let config = Config::default();
    assert_eq!(build_provider(&config).unwrap().name(), "website");

    let config = Config {
        fixed_times: Some(["5:12am", "1:03pm", "4:30pm", "7:15pm", "8:45pm"].map(String::from)),
        ..Config::default()
    };
    assert_eq!(build_provider(&config).unwrap().name(), "fixed");
}

#[tokio::test]
async fn test_build_monitor_from_config() {
    let config = Config {
        dry_run: true,
        fixed_times: Some(["5:12am", "1:03pm", "4:30pm", "7:15pm", "8:45pm"].map(String::from)),
        ..Config::default()
    };

    let mut monitor = build_monitor(&config, CancellationToken::new()).await.unwrap();
    assert_eq!(monitor.dispatcher().sink_name(), "log");
    assert!(monitor.start().await.unwrap());
    assert!(monitor.schedule().prayer(PrayerName::Maghrib).time().is_some());
}

#[tokio::test]
async fn test_build_monitor_rejects_invalid_config() {
    let config = Config { offset_minutes: 75, dry_run: true, ..Config::default() };
    assert!(build_monitor(&config, CancellationToken::new()).await.is_err());
}
