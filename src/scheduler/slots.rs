//! Daily publication slots
//!
//! Slots are a pure function of `posts_per_day` and the publish window, so
//! every call on the same day with the same configuration yields the same
//! sequence.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One scheduled time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub hour: u32,
    pub minute: u32,
}

impl Slot {
    pub fn new(hour: u32, minute: u32) -> Self {
        Self { hour, minute }
    }

    /// Seconds since midnight
    pub fn seconds(&self) -> i64 {
        i64::from(self.hour) * 3600 + i64::from(self.minute) * 60
    }

    /// The slot on a given calendar day
    ///
    /// A slot at `24:00` (window ending at midnight) lands on the next day.
    pub fn on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(NaiveTime::MIN) + Duration::seconds(self.seconds())
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Seconds between consecutive slots
///
/// The whole window when only one post per day is configured.
pub fn interval_seconds(posts_per_day: u32, window: (u32, u32)) -> i64 {
    let (start, end) = window;
    let total = (i64::from(end) - i64::from(start)) * 3600;
    if posts_per_day > 1 {
        total.div_euclid(i64::from(posts_per_day) - 1)
    } else {
        total
    }
}

/// Today's slots, in increasing order
///
/// One post per day yields `window_start:00`. Otherwise slots start at
/// `window_start:00` and are spaced `floor(window_secs / (n - 1))` apart,
/// truncated to whole minutes.
pub fn get_today_slots(posts_per_day: u32, window: (u32, u32)) -> Vec<Slot> {
    let (start, _) = window;

    if posts_per_day <= 1 {
        return vec![Slot::new(start, 0)];
    }

    let interval = interval_seconds(posts_per_day, window);
    (0..i64::from(posts_per_day))
        .map(|i| {
            let slot_seconds = i64::from(start) * 3600 + interval * i;
            // bounded by window_end * 3600, so the casts cannot truncate
            Slot::new(
                (slot_seconds / 3600) as u32,
                ((slot_seconds % 3600) / 60) as u32,
            )
        })
        .collect()
}
