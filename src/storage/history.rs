//! Publication history store
//!
//! Append-only log of publish attempts, queried by calendar day to decide how
//! many slots are already filled.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │  Orchestrator / FailureGovernor / CLI status │
//! └──────────────────────────────────────────────┘
//!                        │
//!                        ▼
//!             ┌─────────────────────┐
//!             │ HistoryStore trait  │
//!             └─────────────────────┘
//!                ┌───────┴───────┐
//!                ▼               ▼
//!        ┌──────────────┐ ┌──────────────┐
//!        │    SQLite    │ │     Mock     │
//!        └──────────────┘ └──────────────┘
//! ```
//!
//! The SQLite store opens a fresh connection for every operation, so an
//! external `status` invocation can read the same file while the bot runs.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection};

use crate::error::{Error, Result};
use crate::models::{self, Platform, PublicationRecord, PublishStatus, PublishedSet, TIMESTAMP_FORMAT};

// ============================================================================
// Store Trait
// ============================================================================

/// Persistence of publication attempts
pub trait HistoryStore: Send + Sync {
    /// Append one record
    fn append(&self, record: &PublicationRecord) -> Result<()>;

    /// Records newer than `days` days before `now`
    fn recent(&self, now: NaiveDateTime, days: i64) -> Result<Vec<PublicationRecord>>;

    /// Records whose `published_at` falls on `date`
    fn records_on(&self, date: NaiveDate) -> Result<Vec<PublicationRecord>>;

    /// Delete every record dated `date`, returning the number removed
    fn delete_day(&self, date: NaiveDate) -> Result<usize>;

    /// Record an attempt
    fn record(
        &self,
        brand: &str,
        topic: &str,
        platform: Platform,
        status: PublishStatus,
        at: NaiveDateTime,
    ) -> Result<()> {
        self.append(&PublicationRecord::new(brand, topic, platform, status, at))
    }

    /// Distinct (brand, topic) pairs with any record on `date`, regardless of status
    fn published_on(&self, date: NaiveDate) -> Result<PublishedSet> {
        Ok(models::published_on(&self.records_on(date)?, date))
    }
}

/// Thread-safe shared store
pub type SharedHistoryStore = Arc<dyn HistoryStore>;

fn day_prefix(date: NaiveDate) -> String {
    format!("{}%", date.format("%Y-%m-%d"))
}

fn format_timestamp(at: NaiveDateTime) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite-backed history, one connection per operation
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    path: PathBuf,
}

impl SqliteHistoryStore {
    /// Create the store, making sure the file and schema exist
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let store = Self { path };
        store.open()?;

        tracing::debug!(path = %store.path.display(), "History store initialized");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS publication_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    brand TEXT,
                    topic TEXT,
                    platform TEXT,
                    status TEXT,
                    published_at TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_publication_history_published_at
                    ON publication_history(published_at);
                "#,
        )?;
        Ok(conn)
    }

    fn query(&self, sql: &str, arg: &str) -> Result<Vec<PublicationRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(sql)?;

        let rows = stmt.query_map(params![arg], |row| {
            Ok((
                row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            ))
        })?;

        let mut records = Vec::new();
        for row in rows {
            let (brand, topic, platform, status, published_at) = row?;

            let Ok(platform) = platform.parse::<Platform>() else {
                tracing::warn!(platform = %platform, "Skipping history row with unknown platform");
                continue;
            };
            let Some(published_at) = parse_timestamp(&published_at) else {
                tracing::warn!(published_at = %published_at, "Skipping history row with bad timestamp");
                continue;
            };
            let status = status
                .parse::<PublishStatus>()
                .unwrap_or_else(|never| match never {});

            records.push(PublicationRecord {
                brand,
                topic,
                platform,
                status,
                published_at,
            });
        }

        Ok(records)
    }
}

impl HistoryStore for SqliteHistoryStore {
    fn append(&self, record: &PublicationRecord) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO publication_history (brand, topic, platform, status, published_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.brand,
                record.topic,
                record.platform.as_str(),
                record.status.to_string(),
                format_timestamp(record.published_at),
            ],
        )?;
        Ok(())
    }

    fn recent(&self, now: NaiveDateTime, days: i64) -> Result<Vec<PublicationRecord>> {
        let since = format_timestamp(now - ChronoDuration::days(days));
        self.query(
            "SELECT brand, topic, platform, status, published_at
             FROM publication_history WHERE published_at > ?1 ORDER BY published_at",
            &since,
        )
    }

    fn records_on(&self, date: NaiveDate) -> Result<Vec<PublicationRecord>> {
        self.query(
            "SELECT brand, topic, platform, status, published_at
             FROM publication_history WHERE published_at LIKE ?1 ORDER BY published_at",
            &day_prefix(date),
        )
    }

    fn delete_day(&self, date: NaiveDate) -> Result<usize> {
        let conn = self.open()?;
        let removed = conn.execute(
            "DELETE FROM publication_history WHERE published_at LIKE ?1",
            params![day_prefix(date)],
        )?;
        Ok(removed)
    }
}

// ============================================================================
// Mock Implementation (for testing)
// ============================================================================

/// In-memory history store
///
/// Useful for testing without database dependencies.
#[derive(Debug, Default)]
pub struct MockHistoryStore {
    records: RwLock<Vec<PublicationRecord>>,
}

impl MockHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record
    pub fn all(&self) -> Vec<PublicationRecord> {
        self.records.read().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Result<Vec<PublicationRecord>> {
        self.records
            .read()
            .map(|r| r.clone())
            .map_err(|_| Error::other("history lock poisoned"))
    }
}

impl HistoryStore for MockHistoryStore {
    fn append(&self, record: &PublicationRecord) -> Result<()> {
        self.records
            .write()
            .map_err(|_| Error::other("history lock poisoned"))?
            .push(record.clone());
        Ok(())
    }

    fn recent(&self, now: NaiveDateTime, days: i64) -> Result<Vec<PublicationRecord>> {
        let since = now - ChronoDuration::days(days);
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|r| r.published_at > since)
            .collect())
    }

    fn records_on(&self, date: NaiveDate) -> Result<Vec<PublicationRecord>> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|r| r.date() == date)
            .collect())
    }

    fn delete_day(&self, date: NaiveDate) -> Result<usize> {
        let mut records = self
            .records
            .write()
            .map_err(|_| Error::other("history lock poisoned"))?;
        let before = records.len();
        records.retain(|r| r.date() != date);
        Ok(before - records.len())
    }
}

// ============================================================================
// Tests
// ============================================================================
