//! Next publication time
//!
//! Used for the "next post" line in logs and status reports. The main loop
//! itself waits on slots; this planner answers the human question of when
//! the next post will go out.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::fmt;

use super::slots::interval_seconds;
use crate::config::PublishingConfig;
use crate::utils::format_hours_minutes;

/// Which rule chose the next post time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPostReason {
    /// Daily limit reached, next post tomorrow
    LimitReached,
    /// Inside the window, next evenly spaced time today
    InWindow,
    /// Inside the window, but the candidate fell past its end
    OutOfRoom,
    /// Before the window opens today
    BeforeWindow,
    /// After the window closed today
    AfterWindow,
}

/// Planned next publication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextPost {
    pub at: NaiveDateTime,
    pub reason: NextPostReason,
    /// Human-readable description
    pub description: String,
}

impl NextPost {
    /// `HH:MM`
    pub fn time_str(&self) -> String {
        self.at.format("%H:%M").to_string()
    }

    /// `dd.mm`
    pub fn date_str(&self) -> String {
        self.at.format("%d.%m").to_string()
    }
}

impl fmt::Display for NextPost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, {})",
            self.description,
            self.time_str(),
            self.date_str()
        )
    }
}

fn window_start_on(date: NaiveDate, hour: u32) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour))
}

fn tomorrow_start(now: NaiveDateTime, publishing: &PublishingConfig) -> NaiveDateTime {
    let tomorrow = now.date().succ_opt().unwrap_or(now.date());
    window_start_on(tomorrow, publishing.window_start())
}

/// Compute when the next post should go out
///
/// Rules, first match wins:
/// 1. `published_count >= posts_per_day`: tomorrow at `window_start:00`.
/// 2. Current hour inside the window: `window_start:00 + interval * count`.
///    If that is not after `now`, use `now + interval_min` instead; if the
///    result's hour is at or past `window_end`, use tomorrow's start.
/// 3. Before the window: today at `window_start:00`.
/// 4. Otherwise: tomorrow at `window_start:00`.
///
/// Pure: identical inputs give identical output.
pub fn calculate_next_post_time(
    now: NaiveDateTime,
    published_count: usize,
    publishing: &PublishingConfig,
) -> NextPost {
    let (start, end) = publishing.publish_window;

    if published_count >= publishing.posts_per_day as usize {
        return NextPost {
            at: tomorrow_start(now, publishing),
            reason: NextPostReason::LimitReached,
            description: format!(
                "tomorrow at {start:02}:00 (limit of {} posts/day reached)",
                publishing.posts_per_day
            ),
        };
    }

    let hour = now.hour();

    if start <= hour && hour < end {
        let interval = interval_seconds(publishing.posts_per_day, publishing.publish_window);
        let count = i64::try_from(published_count).unwrap_or(i64::MAX);
        let first = window_start_on(now.date(), start);

        let mut candidate = first + Duration::seconds(interval.saturating_mul(count));
        if candidate <= now {
            let gap = i64::try_from(publishing.interval_min).unwrap_or(i64::MAX);
            candidate = now + Duration::seconds(gap);
        }

        if candidate.hour() >= end {
            return NextPost {
                at: tomorrow_start(now, publishing),
                reason: NextPostReason::OutOfRoom,
                description: format!("tomorrow at {start:02}:00 (past the publish window)"),
            };
        }

        let remaining = (candidate - now).num_seconds();
        let description = if remaining >= 3600 {
            format!("in {}", format_hours_minutes(remaining))
        } else {
            format!("in {}m", remaining / 60)
        };

        return NextPost {
            at: candidate,
            reason: NextPostReason::InWindow,
            description,
        };
    }

    if hour < start {
        return NextPost {
            at: window_start_on(now.date(), start),
            reason: NextPostReason::BeforeWindow,
            description: format!("today at {start:02}:00"),
        };
    }

    NextPost {
        at: tomorrow_start(now, publishing),
        reason: NextPostReason::AfterWindow,
        description: format!("tomorrow at {start:02}:00"),
    }
}
