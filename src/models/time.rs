// file: src/time.rs
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hour and minute of a prayer or a clock reading.
///
/// Deliberately not a `chrono::NaiveTime`: under [`TimeRules::Literal`] a
/// "12:xxpm" prayer lands on hour 24, which `NaiveTime` cannot hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    pub fn minutes_of_day(&self) -> u32 {
        (self.hour % 24) * 60 + self.minute
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02}", self.hour, self.minute)
    }
}

/// How 12-hour strings, the clock hour shift and reminder windows are interpreted.
///
/// `Literal` reproduces the arithmetic of the deployed reminder as-is,
/// including its noon/midnight handling and same-hour-only windows.
/// `Civil` uses ordinary clock arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRules {
    #[default]
    Literal,
    Civil,
}

impl TimeRules {
    /// Converts a 12-hour clock hour to a 24-hour one.
    pub fn to_24_hour(&self, hour: u32, pm: bool) -> u32 {
        match self {
            // 12pm becomes 24 and 12am stays 12
            TimeRules::Literal => {
                if pm {
                    hour + 12
                } else {
                    hour
                }
            }
            TimeRules::Civil => (hour % 12) + if pm { 12 } else { 0 },
        }
    }

    /// Hour used for window matching. The shift's intent (timezone offset
    /// or clock-source compensation) is unconfirmed; `Literal` adds it
    /// without wrapping, exactly as deployed. Shifts are taken modulo a day.
    pub fn shifted_hour(&self, hour: u32, shift: u32) -> u32 {
        let shift = shift % 24;
        match self {
            TimeRules::Literal => hour + shift,
            TimeRules::Civil => (hour + shift) % 24,
        }
    }

    /// Whether this clock hour starts a new prayer day.
    pub fn is_new_day_hour(&self, hour: u32, shift: u32) -> bool {
        match self {
            TimeRules::Literal => (hour + shift % 24) % 24 == shift % 24,
            TimeRules::Civil => self.shifted_hour(hour, shift) == 0,
        }
    }

    /// Whether `now` falls inside the reminder window `[reminder, prayer]`.
    pub fn window_contains(&self, reminder: ClockTime, prayer: ClockTime, now: ClockTime) -> bool {
        match self {
            TimeRules::Literal => {
                reminder.hour == now.hour
                    && reminder.minute <= now.minute
                    && now.minute <= prayer.minute
            }
            TimeRules::Civil => {
                let start = reminder.minutes_of_day();
                let end = prayer.minutes_of_day();
                let current = now.minutes_of_day();
                if start <= end {
                    start <= current && current <= end
                } else {
                    // window wraps past midnight
                    current >= start || current <= end
                }
            }
        }
    }
}

/// Parses an "H:MMam" / "H:MM pm" string into a 24-hour [`ClockTime`].
pub fn parse_prayer_time(raw: &str, rules: TimeRules) -> AppResult<ClockTime> {
    let text = raw.trim();
    if !text.is_ascii() {
        return Err(AppError::parse(raw, "expected ASCII text"));
    }
    if text.len() < 6 {
        return Err(AppError::parse(raw, "too short for H:MMam"));
    }

    let (clock, suffix) = text.split_at(text.len() - 2);
    let pm = match suffix.to_ascii_lowercase().as_str() {
        "am" => false,
        "pm" => true,
        _ => return Err(AppError::parse(raw, "missing am/pm suffix")),
    };

    let (hour_text, minute_text) = clock
        .trim_end()
        .split_once(':')
        .ok_or_else(|| AppError::parse(raw, "missing ':' separator"))?;

    if minute_text.len() != 2 || !minute_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::parse(raw, "minute must be two digits"));
    }
    if hour_text.is_empty() || hour_text.len() > 2 || !hour_text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::parse(raw, "hour is not numeric"));
    }

    let hour: u32 = hour_text
        .parse()
        .map_err(|_| AppError::parse(raw, "hour is not numeric"))?;
    let minute: u32 = minute_text
        .parse()
        .map_err(|_| AppError::parse(raw, "minute is not numeric"))?;

    if hour == 0 || hour > 12 {
        return Err(AppError::parse(raw, "hour must be between 1 and 12"));
    }
    if minute > 59 {
        return Err(AppError::parse(raw, "minute must be below 60"));
    }

    Ok(ClockTime::new(rules.to_24_hour(hour, pm), minute))
}

/// Start of the reminder window that opens `offset` minutes before `time`.
///
/// `offset` must be below 60 so the window borrows at most one hour.
pub fn reminder_window(time: ClockTime, offset: u32) -> ClockTime {
    let hour = i64::from(time.hour);
    let minute = i64::from(time.minute);
    let offset = i64::from(offset);

    if minute < offset {
        ClockTime {
            hour: (hour - 1 - minute / 60).rem_euclid(24) as u32,
            minute: (minute - offset).rem_euclid(60) as u32,
        }
    } else {
        ClockTime {
            hour: time.hour,
            minute: (minute - offset) as u32,
        }
    }
}
