//! Daily schedule of the five prayers
//!
//! Holds the per-prayer state machines, turns clock readings into
//! fired reminders and decides when a new prayer day has begun.

use crate::error::AppResult;
use crate::models::{parse_prayer_time, ClockTime, Prayer, PrayerName, RawTimes, Reminder, TimeRules};
use chrono::{NaiveTime, Timelike};
use log::{debug, info};

#[derive(Debug, Clone)]
pub struct DailySchedule {
    prayers: [Prayer; 5],
    offset: u32,
    rules: TimeRules,
    hour_shift: u32,
}

impl DailySchedule {
    pub fn new(offset: u32, rules: TimeRules, hour_shift: u32) -> Self {
        Self {
            prayers: PrayerName::ALL.map(Prayer::new),
            offset,
            rules,
            hour_shift,
        }
    }

    pub fn prayers(&self) -> &[Prayer; 5] {
        &self.prayers
    }

    pub fn prayer(&self, name: PrayerName) -> &Prayer {
        &self.prayers[name as usize]
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Re-times every prayer. All five strings are parsed before any
    /// prayer is touched, so a bad string leaves the schedule as it was.
    pub fn apply_times(&mut self, raw: &RawTimes) -> AppResult<()> {
        let mut parsed = [ClockTime::new(0, 0); 5];
        for (slot, text) in parsed.iter_mut().zip(raw.iter()) {
            *slot = parse_prayer_time(text, self.rules)?;
        }

        for (prayer, time) in self.prayers.iter_mut().zip(parsed) {
            prayer.set_time(time, self.offset);
            debug!("Scheduled {}", prayer);
        }
        Ok(())
    }

    /// Starts a new day: re-arms all prayers and applies the fresh times.
    pub fn rollover(&mut self, raw: &RawTimes) -> AppResult<()> {
        // Parse first so a failure cannot leave prayers re-armed with stale times.
        let mut next = self.clone();
        next.apply_times(raw)?;
        for prayer in next.prayers.iter_mut() {
            prayer.reset();
        }
        *self = next;
        info!("Prayer day rolled over, all reminders re-armed");
        Ok(())
    }

    /// Clock reading after the configured hour shift.
    pub fn reading(&self, now: NaiveTime) -> ClockTime {
        ClockTime::new(
            self.rules.shifted_hour(now.hour(), self.hour_shift),
            now.minute(),
        )
    }

    /// The hour has wrapped into a new day and the day's last prayer has
    /// already fired.
    pub fn is_rollover_due(&self, now: NaiveTime) -> bool {
        self.rules.is_new_day_hour(now.hour(), self.hour_shift)
            && self.prayer(PrayerName::Isha).is_fired()
    }

    /// Runs the firing check for every prayer in order and returns the
    /// reminders that fired on this tick.
    pub fn due_reminders(&mut self, now: NaiveTime) -> Vec<Reminder> {
        let reading = self.reading(now);
        let (offset, rules) = (self.offset, self.rules);
        self.prayers
            .iter_mut()
            .filter_map(|prayer| prayer.check(reading, offset, rules))
            .collect()
    }
}
