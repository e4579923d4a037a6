// Core data structures for the autoposter

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

/// Timestamp layout used for `published_at` in the history store.
///
/// Local, naive and lexically sortable, so a `YYYY-MM-DD` prefix selects one
/// calendar day.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Longest error detail kept in a history status
pub const STATUS_DETAIL_LIMIT: usize = 200;

/// Publish target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Primary blog platform
    WordPress,
    /// Messaging channel
    Telegram,
}

impl Platform {
    /// Both targets, in publish order
    pub fn all() -> [Platform; 2] {
        [Platform::WordPress, Platform::Telegram]
    }

    /// Get string representation (as stored in history)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WordPress => "wordpress",
            Self::Telegram => "telegram",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::WordPress => "WordPress",
            Self::Telegram => "Telegram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wordpress" => Ok(Self::WordPress),
            "telegram" => Ok(Self::Telegram),
            other => Err(format!("unknown platform: {other}")),
        }
    }
}

/// Outcome of one publish attempt as stored in history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Success,
    Error(String),
}

impl PublishStatus {
    /// Build an error status, keeping at most [`STATUS_DETAIL_LIMIT`] characters of detail
    pub fn error(detail: impl AsRef<str>) -> Self {
        Self::Error(truncate_chars(detail.as_ref(), STATUS_DETAIL_LIMIT))
    }

    /// Status recorded when the circuit breaker rejected the attempt
    pub fn circuit_open() -> Self {
        Self::Error("circuit breaker open".to_string())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Error(detail) => write!(f, "error: {detail}"),
        }
    }
}

impl std::str::FromStr for PublishStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "success" => Self::Success,
            other => Self::Error(
                other
                    .strip_prefix("error: ")
                    .or_else(|| other.strip_prefix("error:"))
                    .unwrap_or(other)
                    .to_string(),
            ),
        })
    }
}

/// One publication attempt, appended to the history store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicationRecord {
    pub brand: String,
    pub topic: String,
    pub platform: Platform,
    pub status: PublishStatus,
    pub published_at: NaiveDateTime,
}

impl PublicationRecord {
    pub fn new(
        brand: impl Into<String>,
        topic: impl Into<String>,
        platform: Platform,
        status: PublishStatus,
        published_at: NaiveDateTime,
    ) -> Self {
        Self {
            brand: brand.into(),
            topic: topic.into(),
            platform,
            status,
            published_at,
        }
    }

    /// Calendar day of the attempt
    pub fn date(&self) -> NaiveDate {
        self.published_at.date()
    }
}

/// Distinct (brand, topic) pairs published on one day
pub type PublishedSet = BTreeSet<(String, String)>;

/// Collect the distinct (brand, topic) pairs of `records` that fall on `date`
pub fn published_on(records: &[PublicationRecord], date: NaiveDate) -> PublishedSet {
    records
        .iter()
        .filter(|r| r.date() == date)
        .map(|r| (r.brand.clone(), r.topic.clone()))
        .collect()
}

/// A fully generated post, ready for both platforms
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Post {
    /// Brand the topic belongs to
    pub brand: String,
    /// Topic title exactly as it appears in the theme catalog
    pub topic: String,
    /// Generated article title
    pub title: String,
    /// HTML article body
    pub body: String,
    pub tags: Vec<String>,
    /// Title of the messaging summary
    pub summary_title: String,
    /// Messaging-ready HTML summary (title, text, suffix, hashtags)
    pub summary: String,
    pub image_path: Option<PathBuf>,
}

impl Post {
    /// Short form of the title for log lines
    pub fn short_title(&self) -> String {
        truncate_chars(&self.title, 50)
    }
}

/// Truncate to at most `max` characters without splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_platform_round_trip_names() {
        assert_eq!("wordpress".parse::<Platform>().unwrap(), Platform::WordPress);
        assert_eq!("Telegram".parse::<Platform>().unwrap(), Platform::Telegram);
        assert!("vk".parse::<Platform>().is_err());
        assert_eq!(Platform::WordPress.to_string(), "wordpress");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PublishStatus::Success.to_string(), "success");
        assert_eq!(
            PublishStatus::circuit_open().to_string(),
            "error: circuit breaker open"
        );
    }

    #[test]
    fn test_status_error_truncates_detail() {
        let long = "x".repeat(500);
        let status = PublishStatus::error(&long);
        match status {
            PublishStatus::Error(detail) => assert_eq!(detail.chars().count(), 200),
            PublishStatus::Success => panic!("expected error"),
        }
    }

    #[test]
    fn test_status_parse() {
        assert!("success".parse::<PublishStatus>().unwrap().is_success());
        assert_eq!(
            "error: timeout".parse::<PublishStatus>().unwrap(),
            PublishStatus::Error("timeout".to_string())
        );
    }

    #[test]
    fn test_published_on_counts_distinct_pairs() {
        let records = vec![
            PublicationRecord::new("ABB", "Switch", Platform::WordPress, PublishStatus::Success, at(5, 9)),
            PublicationRecord::new("ABB", "Switch", Platform::Telegram, PublishStatus::error("down"), at(5, 9)),
            PublicationRecord::new("Siemens", "PLC", Platform::WordPress, PublishStatus::Success, at(5, 14)),
            PublicationRecord::new("ABB", "Drive", Platform::WordPress, PublishStatus::Success, at(4, 14)),
        ];

        let today = published_on(&records, at(5, 0).date());
        assert_eq!(today.len(), 2);
        assert!(today.contains(&("ABB".to_string(), "Switch".to_string())));
    }

    #[test]
    fn test_truncate_chars_respects_code_points() {
        assert_eq!(truncate_chars("Привет мир", 6), "Привет");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
