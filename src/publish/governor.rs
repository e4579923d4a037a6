//! Failure governor
//!
//! Wraps every publish call in the per-service circuit breaker and the retry
//! loop, and writes exactly one history record per publish request.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::breaker::{CircuitBreaker, ServiceFailureState};
use crate::config::Config;
use crate::models::{Platform, Post, PublishStatus};
use crate::platforms::Publish;
use crate::storage::SharedHistoryStore;
use crate::utils::clock::Clock;
use crate::utils::retry::{with_retry, RetryConfig};
use crate::utils::truncate_text;

/// Outcome of publishing one post to both services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishResults {
    pub wordpress: bool,
    pub telegram: bool,
}

impl PublishResults {
    pub fn get(&self, platform: Platform) -> bool {
        match platform {
            Platform::WordPress => self.wordpress,
            Platform::Telegram => self.telegram,
        }
    }

    fn set(&mut self, platform: Platform, ok: bool) {
        match platform {
            Platform::WordPress => self.wordpress = ok,
            Platform::Telegram => self.telegram = ok,
        }
    }

    /// At least one service accepted the post
    pub fn any(&self) -> bool {
        self.wordpress || self.telegram
    }

    pub fn all(&self) -> bool {
        self.wordpress && self.telegram
    }
}

/// Retry and circuit breaker policy around a [`Publish`] implementation
pub struct FailureGovernor {
    publisher: Arc<dyn Publish>,
    store: SharedHistoryStore,
    clock: Arc<dyn Clock>,
    retry_delay: Duration,
    max_retries: u32,
    breakers: Mutex<HashMap<Platform, CircuitBreaker>>,
}

impl FailureGovernor {
    pub fn new(
        publisher: Arc<dyn Publish>,
        store: SharedHistoryStore,
        clock: Arc<dyn Clock>,
        retry: RetryConfig,
        threshold: u32,
        timeout: Duration,
    ) -> Self {
        let breakers = Platform::all()
            .into_iter()
            .map(|p| (p, CircuitBreaker::new(threshold, timeout)))
            .collect();

        Self {
            publisher,
            store,
            clock,
            retry_delay: retry.base_delay,
            max_retries: retry.max_retries,
            breakers: Mutex::new(breakers),
        }
    }

    pub fn from_config(
        config: &Config,
        publisher: Arc<dyn Publish>,
        store: SharedHistoryStore,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::new(
            publisher,
            store,
            clock,
            RetryConfig::new(
                config.publishing.max_retries,
                Duration::from_secs(config.publishing.retry_delay),
            ),
            config.system.circuit_breaker_threshold,
            Duration::from_secs(config.system.circuit_breaker_timeout),
        )
    }

    /// Take retry and breaker settings from a reloaded configuration
    ///
    /// Failure counters and open circuits carry over.
    pub fn apply_config(&mut self, config: &Config) {
        self.max_retries = config.publishing.max_retries;
        self.retry_delay = Duration::from_secs(config.publishing.retry_delay);

        let threshold = config.system.circuit_breaker_threshold;
        let timeout = Duration::from_secs(config.system.circuit_breaker_timeout);
        let breakers = self.breakers.get_mut().unwrap_or_else(|e| e.into_inner());
        for breaker in breakers.values_mut() {
            breaker.set_policy(threshold, timeout);
        }
    }

    /// Configured retries after the first attempt
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    fn with_breaker<R>(&self, platform: Platform, f: impl FnOnce(&mut CircuitBreaker) -> R) -> R {
        let mut breakers = self.breakers.lock().unwrap_or_else(|e| e.into_inner());
        let breaker = breakers
            .entry(platform)
            .or_insert_with(|| CircuitBreaker::new(1, Duration::ZERO));
        f(breaker)
    }

    /// Consecutive failures currently counted for `platform`
    pub fn failures(&self, platform: Platform) -> u32 {
        self.with_breaker(platform, |b| b.failures())
    }

    pub fn failure_state(&self, platform: Platform) -> ServiceFailureState {
        self.with_breaker(platform, |b| b.state().clone())
    }

    fn record(&self, post: &Post, platform: Platform, status: PublishStatus) {
        let at = self.clock.now();
        if let Err(e) = self
            .store
            .record(&post.brand, &post.topic, platform, status, at)
        {
            error!(platform = %platform, error = %e, "Failed to record publication history");
        }
    }

    /// Publish `post` to one service
    ///
    /// Rejected immediately while the circuit is open. Otherwise up to
    /// `max_retries + 1` attempts with linear backoff; each failed attempt
    /// counts against the breaker and a success erodes one failure. One
    /// history record is written either way.
    pub async fn publish_with_retry(&self, post: &Post, platform: Platform, max_retries: u32) -> bool {
        let now = self.clock.now();
        if self.with_breaker(platform, |b| b.is_open(now)) {
            warn!(
                platform = %platform,
                topic = %post.topic,
                "Circuit breaker open, skipping publish"
            );
            self.record(post, platform, PublishStatus::circuit_open());
            return false;
        }

        let config = RetryConfig::new(max_retries, self.retry_delay);
        let result = with_retry(
            &config,
            self.clock.as_ref(),
            |attempt| {
                debug!(
                    platform = %platform,
                    attempt = attempt + 1,
                    attempts = config.attempts(),
                    title = %post.short_title(),
                    "Publishing"
                );
                self.publisher.publish_to(platform, post)
            },
            |attempt, err| {
                let now = self.clock.now();
                let failures = self.with_breaker(platform, |b| {
                    b.record_failure(now);
                    b.failures()
                });
                warn!(
                    platform = %platform,
                    attempt = attempt + 1,
                    failures,
                    error = %truncate_text(&err.to_string(), 200),
                    "Publish attempt failed"
                );
            },
        )
        .await;

        match result {
            Ok(()) => {
                self.with_breaker(platform, CircuitBreaker::record_success);
                self.record(post, platform, PublishStatus::Success);
                info!(
                    platform = %platform,
                    brand = %post.brand,
                    topic = %post.topic,
                    "Published"
                );
                true
            }
            Err(e) => {
                let message = e.to_string();
                self.record(post, platform, PublishStatus::error(&message));
                error!(
                    platform = %platform,
                    brand = %post.brand,
                    topic = %post.topic,
                    attempts = config.attempts(),
                    error = %truncate_text(&message, 200),
                    "Publish failed"
                );
                false
            }
        }
    }

    /// Publish to every service in order; one service never blocks the other
    pub async fn publish_all(&self, post: &Post) -> PublishResults {
        let mut results = PublishResults::default();
        for platform in Platform::all() {
            let ok = self.publish_with_retry(post, platform, self.max_retries).await;
            results.set(platform, ok);
        }
        results
    }
}
