use crate::error::AppResult;
use crate::models::Reminder;
use crate::utils::circuit_breaker::CircuitBreaker;
use crate::utils::logging::log_delivery_failure;
use crate::utils::retry::{retry_with_exponential_backoff, RetryConfig};
use crate::utils::BoxFuture;
use chrono::{DateTime, Local};
use log::info;
use std::collections::VecDeque;
use std::sync::Arc;

pub mod pushbullet;

pub use pushbullet::PushbulletSink;

/// Maximum number of undelivered reminders kept for inspection.
pub const DEAD_LETTER_CAPACITY: usize = 32;

/// Delivers a title/body pair to the user's device.
pub trait NotificationSink: Send + Sync {
    fn name(&self) -> &str;

    fn deliver<'a>(&'a self, title: &'a str, body: &'a str) -> BoxFuture<'a, AppResult<()>>;
}

/// Dry-run sink: writes notifications to the log instead of sending them.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn deliver<'a>(&'a self, title: &'a str, body: &'a str) -> BoxFuture<'a, AppResult<()>> {
        Box::pin(async move {
            info!("[Dry run] {}: {}", title, body);
            Ok(())
        })
    }
}

#[derive(Debug, Clone)]
pub struct DeadLetter {
    pub reminder: Reminder,
    pub reason: String,
    pub failed_at: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    DeadLettered(String),
}

/// Delivers fired reminders with bounded retries behind a circuit breaker.
/// A reminder that cannot be delivered is parked in the dead-letter queue
/// rather than blocking the tick loop.
pub struct Dispatcher {
    sink: Arc<dyn NotificationSink>,
    retry: RetryConfig,
    breaker: Arc<CircuitBreaker>,
    dead_letters: VecDeque<DeadLetter>,
}

impl Dispatcher {
    pub fn new(sink: Arc<dyn NotificationSink>, retry: RetryConfig, breaker: Arc<CircuitBreaker>) -> Self {
        Self {
            sink,
            retry,
            breaker,
            dead_letters: VecDeque::new(),
        }
    }

    pub fn sink_name(&self) -> &str {
        self.sink.name()
    }

    pub fn dead_letters(&self) -> impl Iterator<Item = &DeadLetter> {
        self.dead_letters.iter()
    }

    pub async fn dispatch(&mut self, reminder: &Reminder) -> Delivery {
        let title = reminder.title();
        let body = reminder.body();
        let body = body.as_str();
        let sink = &self.sink;
        let retry = &self.retry;

        let result = self
            .breaker
            .execute(|| retry_with_exponential_backoff(retry, || async move {
                sink.deliver(title, body).await.map_err(anyhow::Error::from)
            }))
            .await;

        match result {
            Ok(()) => {
                info!("Sent {} reminder via {}", reminder.prayer, self.sink.name());
                Delivery::Sent
            }
            Err(e) => {
                let reason = format!("{:#}", e);
                log_delivery_failure(reminder, &reason);
                self.park(reminder.clone(), reason.clone());
                Delivery::DeadLettered(reason)
            }
        }
    }

    fn park(&mut self, reminder: Reminder, reason: String) {
        if self.dead_letters.len() == DEAD_LETTER_CAPACITY {
            self.dead_letters.pop_front();
        }
        self.dead_letters.push_back(DeadLetter {
            reminder,
            reason,
            failed_at: Local::now(),
        });
    }
}
