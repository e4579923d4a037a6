//! Time source abstraction
//!
//! The governor and the orchestrator never read the wall clock or call
//! `tokio::time::sleep` directly; they go through a [`Clock`] so tests can
//! drive schedules and backoff with virtual time.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime};
use std::sync::Mutex;
use std::time::Duration;

/// Source of local time and of sleeping
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current process-local wall time
    fn now(&self) -> NaiveDateTime;

    /// Suspend the caller for `duration`
    async fn sleep(&self, duration: Duration);
}

/// Wall clock backed by `chrono::Local` and `tokio::time::sleep`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock for tests
///
/// `sleep` returns immediately after advancing the virtual time, and every
/// requested duration is recorded so backoff schedules can be asserted.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<NaiveDateTime>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(start),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Jump to an absolute time
    pub fn set(&self, at: NaiveDateTime) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }

    /// Move virtual time forward without recording a sleep
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += to_chrono(duration);
        }
    }

    /// Every duration passed to `sleep`, in call order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Sum of all recorded sleeps
    pub fn total_slept(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Clock for ManualClock {
    fn now(&self) -> NaiveDateTime {
        self.now
            .lock()
            .map(|now| *now)
            .unwrap_or_else(|poisoned| *poisoned.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        if let Ok(mut sleeps) = self.sleeps.lock() {
            sleeps.push(duration);
        }
        self.advance(duration);
        tokio::task::yield_now().await;
    }
}

/// Convert a std duration to a chrono one, saturating on overflow
pub fn to_chrono(duration: Duration) -> ChronoDuration {
    ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::days(36_500))
}
