//! Human-readable daily status

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::Config;
use crate::error::Result;
use crate::models::PublicationRecord;
use crate::scheduler::{calculate_next_post_time, get_today_slots, NextPost, Slot};
use crate::storage::HistoryStore;

/// Today's publications and the next planned post
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub date: NaiveDate,
    /// Distinct (brand, topic) pairs with a record today
    pub published: Vec<(String, String)>,
    pub posts_per_day: u32,
    pub slots: Vec<Slot>,
    pub wordpress_failures: u32,
    pub telegram_failures: u32,
    pub next: NextPost,
    /// Every attempt in the last [`RECENT_DAYS`] days, oldest first
    pub recent: Vec<PublicationRecord>,
}

/// History window listed under "Recent attempts"
pub const RECENT_DAYS: i64 = 3;

impl StatusReport {
    /// Build from the history store
    pub fn build(
        store: &dyn HistoryStore,
        config: &Config,
        now: NaiveDateTime,
        failures: (u32, u32),
    ) -> Result<Self> {
        let date = now.date();
        let published: Vec<(String, String)> = store.published_on(date)?.into_iter().collect();
        let next = calculate_next_post_time(now, published.len(), &config.publishing);
        let mut recent = store.recent(now, RECENT_DAYS)?;
        recent.sort_by_key(|r| r.published_at);

        Ok(Self {
            date,
            posts_per_day: config.publishing.posts_per_day,
            slots: get_today_slots(
                config.publishing.posts_per_day,
                config.publishing.publish_window,
            ),
            published,
            wordpress_failures: failures.0,
            telegram_failures: failures.1,
            next,
            recent,
        })
    }

    pub fn published_count(&self) -> usize {
        self.published.len()
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<String> = self.slots.iter().map(Slot::to_string).collect();

        writeln!(f, "Status for {}", self.date.format("%Y-%m-%d"))?;
        writeln!(
            f,
            "Published today: {}/{}",
            self.published_count(),
            self.posts_per_day
        )?;
        for (brand, topic) in &self.published {
            writeln!(f, "  - {brand}: {topic}")?;
        }
        writeln!(f, "Slots: {}", slots.join(", "))?;
        writeln!(
            f,
            "Failures: wordpress={}, telegram={}",
            self.wordpress_failures, self.telegram_failures
        )?;
        write!(f, "Next post: {}", self.next)?;

        if !self.recent.is_empty() {
            write!(f, "\nRecent attempts ({RECENT_DAYS} days):")?;
            for record in &self.recent {
                write!(
                    f,
                    "\n  {} {} - {} [{}] {}",
                    record.published_at.format("%d.%m %H:%M"),
                    record.brand,
                    record.topic,
                    record.platform,
                    record.status
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Platform, PublishStatus};
    use crate::storage::MockHistoryStore;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_report_counts_distinct_topics() {
        let store = MockHistoryStore::new();
        store
            .record("ABB", "Drives", Platform::WordPress, PublishStatus::Success, at(8))
            .unwrap();
        store
            .record("ABB", "Drives", Platform::Telegram, PublishStatus::error("down"), at(8))
            .unwrap();
        store
            .record("Festo", "Valves", Platform::WordPress, PublishStatus::Success, at(14))
            .unwrap();

        let report = StatusReport::build(&store, &Config::default(), at(15), (0, 1)).unwrap();
        assert_eq!(report.published_count(), 2);
        assert_eq!(report.slots.len(), 3);

        let text = report.to_string();
        assert!(text.contains("Published today: 2/3"));
        assert!(text.contains("  - ABB: Drives"));
        assert!(text.contains("Slots: 08:00, 14:00, 20:00"));
        assert!(text.contains("telegram=1"));
        assert!(text.contains("Next post: "));
        assert!(text.contains("01.06 08:00 ABB - Drives [telegram] error: down"));
    }

    #[test]
    fn test_recent_attempts_span_three_days() {
        let store = MockHistoryStore::new();
        let older = at(9) - chrono::Duration::days(4);
        let two_days_ago = at(9) - chrono::Duration::days(2);
        store
            .record("ABB", "Old", Platform::WordPress, PublishStatus::Success, older)
            .unwrap();
        store
            .record("ABB", "Motors", Platform::WordPress, PublishStatus::Success, two_days_ago)
            .unwrap();

        let report = StatusReport::build(&store, &Config::default(), at(10), (0, 0)).unwrap();
        assert_eq!(report.published_count(), 0);
        assert_eq!(report.recent.len(), 1);
        assert_eq!(report.recent[0].topic, "Motors");
        assert!(report.to_string().contains("30.05 09:00 ABB - Motors [wordpress] success"));
    }
}
