//! Common test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::watch;

use autoposter::config::Config;
use autoposter::content::MockGenerator;
use autoposter::models::Post;
use autoposter::orchestrator::{MemoryCommandQueue, Orchestrator};
use autoposter::platforms::MockPublisher;
use autoposter::publish::FailureGovernor;
use autoposter::storage::MockHistoryStore;
use autoposter::utils::clock::ManualClock;
use autoposter::utils::retry::RetryConfig;

/// 2024-06-01 at `hour:minute`
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day(1).and_hms_opt(hour, minute, 0).unwrap()
}

/// A date in June 2024
pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
}

/// Create a test post with default values
pub fn create_test_post(brand: &str, topic: &str) -> Post {
    Post {
        brand: brand.to_string(),
        topic: topic.to_string(),
        title: format!("{topic} overview"),
        body: format!("<h1>{topic} overview</h1><p>{brand} equipment.</p>"),
        tags: vec!["automation".to_string(), "plc".to_string()],
        summary_title: topic.to_string(),
        summary: format!("🌐 GVN <b>{topic}</b>\n\n{brand} equipment."),
        image_path: None,
    }
}

/// Default configuration with every file under `dir`
pub fn test_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.paths.database = dir.join("autoposter.db");
    config.paths.themes = dir.join("theme_host.json");
    config.paths.control_dir = dir.to_path_buf();
    config.paths.health_file = dir.join("autoposter.health");
    config.logging.file = None;
    config.publishing.max_retries = 1;
    config.publishing.retry_delay = 5;
    config
}

/// Orchestrator wired to in-memory collaborators and a virtual clock
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub clock: Arc<ManualClock>,
    pub store: Arc<MockHistoryStore>,
    pub publisher: Arc<MockPublisher>,
    pub generator: Arc<MockGenerator>,
    pub queue: Arc<MemoryCommandQueue>,
    pub shutdown: watch::Sender<bool>,
}

impl Harness {
    pub fn new(config: Config, start: NaiveDateTime, topics: usize) -> Self {
        Self::with_generator(config, start, MockGenerator::with_topics("ABB", topics))
    }

    pub fn with_generator(config: Config, start: NaiveDateTime, generator: MockGenerator) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let store = Arc::new(MockHistoryStore::new());
        let publisher = Arc::new(MockPublisher::new());
        let generator = Arc::new(generator);
        let queue = Arc::new(MemoryCommandQueue::new());
        let (shutdown, shutdown_rx) = watch::channel(false);

        let governor = FailureGovernor::new(
            publisher.clone(),
            store.clone(),
            clock.clone(),
            RetryConfig::new(
                config.publishing.max_retries,
                Duration::from_secs(config.publishing.retry_delay),
            ),
            config.system.circuit_breaker_threshold,
            Duration::from_secs(config.system.circuit_breaker_timeout),
        );

        let orchestrator = Orchestrator::new(
            config,
            store.clone(),
            governor,
            generator.clone(),
            queue.clone(),
            clock.clone(),
            shutdown_rx,
        );

        Self {
            orchestrator,
            clock,
            store,
            publisher,
            generator,
            queue,
            shutdown,
        }
    }
}
