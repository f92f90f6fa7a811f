use crate::error::AppResult;
use crate::models::{RawTimes, Reminder};
use crate::notify::{Delivery, Dispatcher};
use crate::provider::PrayerTimeProvider;
use crate::schedule::DailySchedule;
use crate::utils::logging::{log_reminder_fired, log_times_refreshed};
use crate::utils::circuit_breaker::get_all_circuit_breaker_stats;
use crate::utils::retry::{retry_until_success, RetryConfig};
use chrono::NaiveTime;
use log::{info, debug};
use tokio::sync::mpsc::Sender;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;

/// Wall-clock source polled once per tick.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

#[derive(Debug, Clone)]
pub enum MonitorEvent {
    TimesRefreshed(RawTimes),
    ReminderSent(Reminder),
    DeliveryFailed(Reminder, String),
}

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub poll_interval: Duration,
    /// Backoff for fetching prayer times; attempts are unbounded.
    pub fetch_retry: RetryConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            fetch_retry: RetryConfig {
                max_attempts: u32::MAX,
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
                backoff_multiplier: 2.0,
            },
        }
    }
}

/// Drives the daily schedule: one sequential tick at a time, never overlapping.
pub struct PrayerMonitor {
    schedule: DailySchedule,
    provider: Box<dyn PrayerTimeProvider>,
    dispatcher: Dispatcher,
    clock: Box<dyn Clock>,
    settings: MonitorSettings,
    shutdown: CancellationToken,
    sender: Option<Sender<MonitorEvent>>,
}

impl PrayerMonitor {
    pub fn new(
        schedule: DailySchedule,
        provider: Box<dyn PrayerTimeProvider>,
        dispatcher: Dispatcher,
        clock: Box<dyn Clock>,
        settings: MonitorSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            schedule,
            provider,
            dispatcher,
            clock,
            settings,
            shutdown,
            sender: None,
        }
    }

    pub fn with_events(mut self, sender: Sender<MonitorEvent>) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn schedule(&self) -> &DailySchedule {
        &self.schedule
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Fetches times until the provider succeeds. `None` means shutdown.
    async fn fetch_times(&self) -> Option<RawTimes> {
        let provider = &self.provider;
        debug!("Fetching prayer times from {} provider", provider.name());

        retry_until_success(&self.settings.fetch_retry, &self.shutdown, || async move {
            provider.fetch_raw_times().await.map_err(anyhow::Error::from)
        })
        .await
    }

    async fn emit(&self, event: MonitorEvent) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(event).await;
        }
    }

    /// Initial fetch and arming. Returns `Ok(false)` if shutdown came first.
    pub async fn start(&mut self) -> AppResult<bool> {
        let Some(raw) = self.fetch_times().await else {
            return Ok(false);
        };

        self.schedule.apply_times(&raw)?;
        log_times_refreshed(&raw);
        for prayer in self.schedule.prayers() {
            info!("{}", prayer);
        }
        self.emit(MonitorEvent::TimesRefreshed(raw)).await;
        Ok(true)
    }

    /// One poll of the clock: roll the day over if due, then deliver any
    /// reminders whose window has opened.
    pub async fn tick(&mut self) -> AppResult<()> {
        let now = self.clock.now();

        if self.schedule.is_rollover_due(now) {
            info!("New prayer day at {}, fetching fresh times", now.format("%H:%M"));
            let Some(raw) = self.fetch_times().await else {
                return Ok(());
            };
            self.schedule.rollover(&raw)?;
            log_times_refreshed(&raw);
            self.emit(MonitorEvent::TimesRefreshed(raw)).await;
        }

        for reminder in self.schedule.due_reminders(now) {
            log_reminder_fired(&reminder);
            let delivery = self.dispatcher.dispatch(&reminder).await;
            match delivery {
                Delivery::Sent => self.emit(MonitorEvent::ReminderSent(reminder)).await,
                Delivery::DeadLettered(reason) => {
                    self.emit(MonitorEvent::DeliveryFailed(reminder, reason)).await
                }
            }
        }

        Ok(())
    }

    /// Runs until the shutdown token is cancelled. A malformed prayer time
    /// is the only error that ends the loop.
    pub async fn run(mut self) -> AppResult<()> {
        info!(
            "Starting prayer monitor loop (offset {} minutes, sink {})",
            self.schedule.offset(),
            self.dispatcher.sink_name()
        );

        if !self.start().await? {
            info!("Shutdown requested before prayer times were fetched");
            return Ok(());
        }

        loop {
            tokio::select! {
                _ = sleep(self.settings.poll_interval) => {}
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown signal received, stopping monitor loop");
                    break;
                }
            }

            self.tick().await?;
        }

        for (service, stats) in get_all_circuit_breaker_stats().await {
            info!(
                "Circuit breaker '{}' at shutdown: {:?}, {} recent failures",
                service, stats.state, stats.failure_count
            );
        }
        info!("Prayer monitor loop stopped gracefully");
        Ok(())
    }
}
