//! Scripted publisher for testing
//!
//! Each platform gets a queue of outcomes; once a queue is drained the
//! platform falls back to its default outcome.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;

use super::{Publish, PublishError, PublishResult};
use crate::models::{Platform, Post};

#[derive(Debug, Default)]
struct PlatformScript {
    queued: VecDeque<bool>,
    always_fail: bool,
    calls: u32,
}

/// In-memory [`Publish`] implementation
#[derive(Debug, Default)]
pub struct MockPublisher {
    scripts: Mutex<HashMap<Platform, PlatformScript>>,
    published: Mutex<Vec<(Platform, String)>>,
}

impl MockPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` calls for `platform`
    pub fn fail_times(&self, platform: Platform, times: usize) {
        if let Ok(mut scripts) = self.scripts.lock() {
            let script = scripts.entry(platform).or_default();
            script.queued.extend(std::iter::repeat(false).take(times));
        }
    }

    /// Fail every call for `platform` that is not otherwise scripted
    pub fn always_fail(&self, platform: Platform) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(platform).or_default().always_fail = true;
        }
    }

    /// Let calls for `platform` succeed again
    pub fn recover(&self, platform: Platform) {
        if let Ok(mut scripts) = self.scripts.lock() {
            let script = scripts.entry(platform).or_default();
            script.always_fail = false;
            script.queued.clear();
        }
    }

    /// Number of calls that reached `platform`
    pub fn calls(&self, platform: Platform) -> u32 {
        self.scripts
            .lock()
            .ok()
            .and_then(|s| s.get(&platform).map(|p| p.calls))
            .unwrap_or(0)
    }

    /// Successful publications as (platform, topic)
    pub fn published(&self) -> Vec<(Platform, String)> {
        self.published.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Publish for MockPublisher {
    async fn publish_to(&self, platform: Platform, post: &Post) -> PublishResult<()> {
        let succeed = {
            let mut scripts = self
                .scripts
                .lock()
                .map_err(|_| PublishError::Unavailable("mock lock poisoned".into()))?;
            let script = scripts.entry(platform).or_default();
            script.calls += 1;
            script.queued.pop_front().unwrap_or(!script.always_fail)
        };

        if !succeed {
            return Err(PublishError::Unavailable(format!(
                "{} is down",
                platform.label()
            )));
        }

        if let Ok(mut published) = self.published.lock() {
            published.push((platform, post.topic.clone()));
        }
        Ok(())
    }
}
