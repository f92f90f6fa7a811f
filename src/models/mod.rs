// Declare modules
pub mod prayer;
pub mod time;

// Re-export so callers can use `crate::models::Prayer` etc.
pub use prayer::{Prayer, PrayerName, Reminder, ReminderState, REMINDER_TITLE};
pub use time::{parse_prayer_time, reminder_window, ClockTime, TimeRules};

/// The five raw provider strings, ordered Fajr to Isha.
pub type RawTimes = [String; 5];
