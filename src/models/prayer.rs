// file: src/prayer.rs
use super::time::{parse_prayer_time, reminder_window, ClockTime, TimeRules};
use crate::error::AppResult;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const REMINDER_TITLE: &str = "Prayer Reminder";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrayerName {
    Fajr,
    Zuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// The five daily prayers in the order the day runs through them.
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Zuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Zuhr => "Zuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderState {
    /// Today's reminder is still pending.
    Armed,
    /// Today's reminder went out; nothing fires until the next reset.
    Fired,
}

/// A reminder that has just fired and needs delivering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub prayer: PrayerName,
    pub time: ClockTime,
    pub offset: u32,
}

impl Reminder {
    pub fn title(&self) -> &'static str {
        REMINDER_TITLE
    }

    pub fn body(&self) -> String {
        format!(
            "{} at {}! Less than {} minutes!",
            self.prayer, self.time, self.offset
        )
    }
}

#[derive(Debug, Clone)]
pub struct Prayer {
    name: PrayerName,
    time: Option<ClockTime>,
    reminder: Option<ClockTime>,
    state: ReminderState,
}

impl Prayer {
    pub fn new(name: PrayerName) -> Self {
        Self {
            name,
            time: None,
            reminder: None,
            state: ReminderState::Armed,
        }
    }

    pub fn name(&self) -> PrayerName {
        self.name
    }

    pub fn time(&self) -> Option<ClockTime> {
        self.time
    }

    pub fn reminder_time(&self) -> Option<ClockTime> {
        self.reminder
    }

    pub fn state(&self) -> ReminderState {
        self.state
    }

    pub fn is_fired(&self) -> bool {
        self.state == ReminderState::Fired
    }

    /// Sets the prayer time from a raw provider string.
    pub fn update_time(&mut self, raw: &str, rules: TimeRules) -> AppResult<()> {
        let time = parse_prayer_time(raw, rules)?;
        self.time = Some(time);
        self.reminder = None;
        Ok(())
    }

    /// Sets an already parsed prayer time and its reminder window together.
    pub fn set_time(&mut self, time: ClockTime, offset: u32) {
        self.time = Some(time);
        self.update_reminder_time(offset);
    }

    /// Recomputes the reminder window start from the current prayer time.
    pub fn update_reminder_time(&mut self, offset: u32) {
        self.reminder = self.time.map(|time| reminder_window(time, offset));
    }

    /// Fires the reminder if the prayer is armed and `now` is inside its
    /// window. This is the only ARMED -> FIRED transition.
    pub fn check(&mut self, now: ClockTime, offset: u32, rules: TimeRules) -> Option<Reminder> {
        if self.state == ReminderState::Fired {
            return None;
        }

        let (time, reminder) = match (self.time, self.reminder) {
            (Some(time), Some(reminder)) => (time, reminder),
            _ => {
                debug!("{} has no time yet, skipping check", self.name);
                return None;
            }
        };

        if !rules.window_contains(reminder, time, now) {
            return None;
        }

        self.state = ReminderState::Fired;
        Some(Reminder {
            prayer: self.name,
            time,
            offset,
        })
    }

    /// Re-arms the prayer for a new day.
    pub fn reset(&mut self) {
        self.state = ReminderState::Armed;
    }
}

impl fmt::Display for Prayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.time, self.reminder) {
            (Some(time), Some(reminder)) => write!(f, "{} - {} - {}", self.name, time, reminder),
            (Some(time), None) => write!(f, "{} - {} - unset", self.name, time),
            _ => write!(f, "{} - unset", self.name),
        }
    }
}
