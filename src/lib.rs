// PrayerChime Library
// Exposes the reminder scheduler and its collaborators for testing and reuse

pub mod alerts;
pub mod app;
pub mod config;
pub mod error;
pub mod http_config;
pub mod models;
pub mod notify;
pub mod provider;
pub mod schedule;
pub mod utils;

// Re-export commonly used types
pub use alerts::{Clock, MonitorEvent, MonitorSettings, PrayerMonitor, SystemClock};
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::*;
pub use notify::{Delivery, Dispatcher, LogSink, NotificationSink, PushbulletSink};
pub use provider::{FixedProvider, PrayerTimeProvider, WebsiteProvider};
pub use schedule::DailySchedule;
