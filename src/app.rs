//! Wiring from a validated [`Config`] to a ready-to-run [`PrayerMonitor`].

use crate::alerts::{MonitorSettings, PrayerMonitor, SystemClock};
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::http_config::HttpConfig;
use crate::notify::{Dispatcher, LogSink, NotificationSink, PushbulletSink};
use crate::provider::{FixedProvider, PrayerTimeProvider, WebsiteProvider};
use crate::schedule::DailySchedule;
use crate::utils::circuit_breaker::{get_circuit_breaker, PUSH_SERVICE};
use log::{info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub fn build_provider(config: &Config) -> AppResult<Box<dyn PrayerTimeProvider>> {
    match &config.fixed_times {
        Some(times) => {
            info!("Using fixed prayer times from config");
            Ok(Box::new(FixedProvider::new(times.clone())))
        }
        None => {
            info!("Scraping prayer times from {}", config.source_url);
            Ok(Box::new(WebsiteProvider::new(&config.source_url)?))
        }
    }
}

pub fn build_sink(config: &Config) -> AppResult<Arc<dyn NotificationSink>> {
    if config.dry_run {
        warn!("Dry run: reminders will only be logged");
        return Ok(Arc::new(LogSink));
    }

    let token = config
        .token()
        .ok_or_else(|| AppError::config("Pushbullet token is required outside dry run"))?;
    Ok(Arc::new(PushbulletSink::new(token)?))
}

pub async fn build_monitor(config: &Config, shutdown: CancellationToken) -> AppResult<PrayerMonitor> {
    config.validate()?;

    let schedule = DailySchedule::new(config.offset_minutes, config.time_rules, config.hour_shift);
    let retry = HttpConfig::push_api()
        .with_max_retries(config.delivery_attempts)
        .to_retry_config();
    let dispatcher = Dispatcher::new(build_sink(config)?, retry, get_circuit_breaker(PUSH_SERVICE).await);

    let settings = MonitorSettings {
        poll_interval: config.poll_interval(),
        ..MonitorSettings::default()
    };

    Ok(PrayerMonitor::new(
        schedule,
        build_provider(config)?,
        dispatcher,
        Box::new(SystemClock),
        settings,
        shutdown,
    ))
}
