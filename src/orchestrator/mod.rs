//! Publication orchestrator
//!
//! The main loop. Each iteration:
//!
//! 1. Handles control commands and refreshes the liveness artifact.
//! 2. Catch-up: publishes for every slot whose time has passed while
//!    `published_today <= slot index`.
//! 3. Waits for the next unfilled future slot and publishes for it.
//! 4. With every slot filled, waits for tomorrow's first slot.
//!
//! Waiting happens in chunks of at most `min(check_interval,
//! health_check_interval)`, checking for shutdown and commands between
//! chunks. A publish in progress is never interrupted. Errors inside an
//! iteration are logged and the loop resumes after `cycle_restart_delay`.
//!
//! ```text
//!   RUNNING ──(signal | stop marker | restart marker)──▶ STOPPED
//! ```

pub mod control;
pub mod health;
pub mod status;

pub use control::{CommandQueue, ControlCommand, FileCommandQueue, MemoryCommandQueue};
pub use health::{LivenessReport, RunState, ShutdownReason};
pub use status::StatusReport;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::content::ContentGenerator;
use crate::error::{PosterErrorTrait, Result};
use crate::models::Platform;
use crate::publish::{FailureGovernor, PublishResults};
use crate::scheduler::{calculate_next_post_time, get_today_slots};
use crate::storage::SharedHistoryStore;
use crate::utils::clock::{to_chrono, Clock};

/// Ties the planner, the content pipeline and the governor together
pub struct Orchestrator {
    config: Config,
    store: SharedHistoryStore,
    governor: FailureGovernor,
    generator: Arc<dyn ContentGenerator>,
    queue: Arc<dyn CommandQueue>,
    clock: Arc<dyn Clock>,
    shutdown: watch::Receiver<bool>,
    last_health: Option<NaiveDateTime>,
    config_path: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        config: Config,
        store: SharedHistoryStore,
        governor: FailureGovernor,
        generator: Arc<dyn ContentGenerator>,
        queue: Arc<dyn CommandQueue>,
        clock: Arc<dyn Clock>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            config,
            store,
            governor,
            generator,
            queue,
            clock,
            shutdown,
            last_health: None,
            config_path: None,
        }
    }

    /// File re-read before every forced publication
    pub fn set_config_path(&mut self, path: impl Into<PathBuf>) {
        self.config_path = Some(path.into());
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn governor(&self) -> &FailureGovernor {
        &self.governor
    }

    fn failures(&self) -> (u32, u32) {
        (
            self.governor.failures(Platform::WordPress),
            self.governor.failures(Platform::Telegram),
        )
    }

    fn published_today(&self, date: NaiveDate) -> Result<usize> {
        Ok(self.store.published_on(date)?.len())
    }

    // ========================================================================
    // Main loop
    // ========================================================================

    /// Run until a signal, a stop marker or a restart marker
    pub async fn run(&mut self) -> ShutdownReason {
        info!(
            posts_per_day = self.config.publishing.posts_per_day,
            window_start = self.config.publishing.window_start(),
            window_end = self.config.publishing.window_end(),
            max_retries = self.governor.max_retries(),
            "Autoposter started"
        );

        let reason = loop {
            if self.signalled() {
                break ShutdownReason::Signal;
            }

            match self.run_iteration().await {
                Ok(Some(reason)) => break reason,
                Ok(None) => {}
                Err(e) => {
                    error!(
                        error = %e,
                        category = e.category().as_str(),
                        "Main loop iteration failed"
                    );
                    let delay = self.config.cycle_restart_delay();
                    info!(delay_secs = delay.as_secs(), "Resuming main loop after pause");
                    match self.pause(delay).await {
                        Ok(Some(reason)) => break reason,
                        Ok(None) => {}
                        Err(e) => error!(error = %e, "Pause after failure was interrupted"),
                    }
                }
            }
        };

        self.write_health(RunState::Stopped, Some(reason));
        info!(reason = %reason, "Autoposter stopped");
        reason
    }

    /// One pass of the main loop
    ///
    /// Returns the shutdown reason when the loop must stop.
    pub async fn run_iteration(&mut self) -> Result<Option<ShutdownReason>> {
        if let Some(reason) = self.check_interrupts().await? {
            return Ok(Some(reason));
        }

        let publishing = self.config.publishing.clone();
        let slots = get_today_slots(publishing.posts_per_day, publishing.publish_window);
        let today = self.clock.now().date();
        let mut published = self.published_today(today)?;

        // catch-up
        for (i, slot) in slots.iter().enumerate() {
            if slot.on(today) >= self.clock.now() || published > i {
                continue;
            }

            info!(slot = %slot, published, "Catch-up publication");
            match self.publish_once().await {
                Ok(Some(results)) => {
                    published = self.published_today(today)?;
                    if results.any() {
                        if let Some(reason) = self.pause(self.config.post_delay()).await? {
                            return Ok(Some(reason));
                        }
                    }
                }
                Ok(None) => {
                    warn!("No unpublished topics left for today");
                    break;
                }
                Err(e) => {
                    error!(slot = %slot, error = %e, "Catch-up publication failed, skipping slot");
                }
            }
        }

        // wait for the next unfilled slot
        let now = self.clock.now();
        let next_slot = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| (i, *slot, slot.on(today)))
            .find(|(i, _, at)| *at > now && published <= *i);

        if let Some((_, slot, at)) = next_slot {
            let plan = calculate_next_post_time(now, published, &publishing);
            info!(slot = %slot, next = %plan, "Waiting for next slot");

            if let Some(reason) = self.wait_until(at).await? {
                return Ok(Some(reason));
            }

            match self.publish_once().await {
                Ok(Some(_)) => {}
                Ok(None) => warn!("No unpublished topics left for today"),
                Err(e) => error!(slot = %slot, error = %e, "Scheduled publication failed"),
            }
            return Ok(None);
        }

        if published >= publishing.posts_per_day as usize {
            let tomorrow = today.succ_opt().unwrap_or(today);
            let first = slots.first().map(|s| s.on(tomorrow)).unwrap_or(now);
            info!(
                published,
                next = %first.format("%Y-%m-%d %H:%M"),
                "All slots filled for today"
            );
            return self.wait_until(first).await;
        }

        debug!(published, "No future slot left today, re-checking later");
        self.pause(Duration::from_secs(self.config.system.check_interval))
            .await
    }

    // ========================================================================
    // Publishing
    // ========================================================================

    /// Generate one post and publish it to every service
    ///
    /// `None` when every topic has been published today.
    pub async fn publish_once(&self) -> Result<Option<PublishResults>> {
        let today = self.clock.now().date();
        let published = self.store.published_on(today)?;

        let Some(post) = self.generator.generate_post(&published).await? else {
            return Ok(None);
        };

        info!(
            brand = %post.brand,
            topic = %post.topic,
            title = %post.short_title(),
            image = post.image_path.is_some(),
            "Post generated"
        );

        let results = self.governor.publish_all(&post).await;
        if results.any() {
            info!(
                topic = %post.topic,
                wordpress = results.wordpress,
                telegram = results.telegram,
                "Post published"
            );
        } else {
            warn!(topic = %post.topic, "Post was not accepted by any service");
        }

        Ok(Some(results))
    }

    /// Publish immediately, outside the schedule
    ///
    /// Settings and the theme catalog are re-read first.
    pub async fn force_publish(&mut self) -> Result<Option<PublishResults>> {
        info!("Forced publication requested");
        self.reload();
        let results = self.publish_once().await?;
        if results.is_none() {
            warn!("Forced publication skipped: no unpublished topics left for today");
        }
        Ok(results)
    }

    /// Re-read the configuration file and the theme catalog
    ///
    /// Failures are logged and the settings already loaded stay in effect.
    pub fn reload(&mut self) {
        if let Some(path) = &self.config_path {
            match Config::load(path) {
                Ok(config) => {
                    self.governor.apply_config(&config);
                    self.config = config;
                    info!(path = %path.display(), "Configuration reloaded");
                }
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Configuration reload failed, keeping current settings"
                ),
            }
        }

        match self.generator.reload(&self.config) {
            Ok(()) => debug!(path = %self.config.paths.themes.display(), "Theme catalog reloaded"),
            Err(e) => warn!(error = %e, "Theme catalog reload failed, keeping loaded catalog"),
        }
    }

    /// Delete today's history, returning the number of removed records
    pub fn reset_today(&self) -> Result<usize> {
        let today = self.clock.now().date();
        let removed = self.store.delete_day(today)?;
        info!(date = %today, removed, "Today's publication history reset");
        Ok(removed)
    }

    pub fn status_report(&self) -> Result<StatusReport> {
        StatusReport::build(
            self.store.as_ref(),
            &self.config,
            self.clock.now(),
            self.failures(),
        )
    }

    // ========================================================================
    // Commands, health and waiting
    // ========================================================================

    fn signalled(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Run pending control commands in priority order
    pub async fn handle_commands(&mut self) -> Result<Option<ShutdownReason>> {
        for command in self.queue.poll()? {
            info!(command = %command, "Control command received");

            let outcome = self.execute(command).await;
            self.queue.ack(command)?;

            match outcome {
                Ok(Some(reason)) => return Ok(Some(reason)),
                Ok(None) => {}
                Err(e) => error!(command = %command, error = %e, "Control command failed"),
            }
        }
        Ok(None)
    }

    async fn execute(&mut self, command: ControlCommand) -> Result<Option<ShutdownReason>> {
        match command {
            ControlCommand::Stop => return Ok(Some(ShutdownReason::StopCommand)),
            ControlCommand::Restart => return Ok(Some(ShutdownReason::Restart)),
            ControlCommand::PublishNow => {
                self.force_publish().await?;
            }
            ControlCommand::Status => {
                let report = self.status_report()?;
                for line in report.to_string().lines() {
                    info!("{line}");
                }
            }
            ControlCommand::ResetToday => {
                self.reset_today()?;
            }
        }
        Ok(None)
    }

    /// Signal, commands and the periodic liveness write
    async fn check_interrupts(&mut self) -> Result<Option<ShutdownReason>> {
        if self.signalled() {
            return Ok(Some(ShutdownReason::Signal));
        }
        if let Some(reason) = self.handle_commands().await? {
            return Ok(Some(reason));
        }
        self.maybe_write_health();
        Ok(None)
    }

    /// Sleep until `target` in bounded chunks
    pub async fn wait_until(&mut self, target: NaiveDateTime) -> Result<Option<ShutdownReason>> {
        let chunk = self.config.poll_chunk();
        loop {
            if let Some(reason) = self.check_interrupts().await? {
                return Ok(Some(reason));
            }

            let now = self.clock.now();
            if now >= target {
                return Ok(None);
            }

            let remaining = (target - now).to_std().unwrap_or(chunk);
            self.clock.sleep(remaining.min(chunk)).await;
        }
    }

    async fn pause(&mut self, duration: Duration) -> Result<Option<ShutdownReason>> {
        let target = self.clock.now() + to_chrono(duration);
        self.wait_until(target).await
    }

    fn maybe_write_health(&mut self) {
        let now = self.clock.now();
        let due = match self.last_health {
            Some(last) => now - last >= to_chrono(self.config.health_check_interval()),
            None => true,
        };
        if due {
            self.write_health(RunState::Running, None);
        }
    }

    fn write_health(&mut self, status: RunState, reason: Option<ShutdownReason>) {
        let now = self.clock.now();
        let published = self.published_today(now.date()).unwrap_or_else(|e| {
            warn!(error = %e, "Could not count today's publications for the liveness artifact");
            0
        });

        let mut report = LivenessReport::new(
            now,
            status,
            published,
            self.config.publishing.posts_per_day,
            self.failures(),
        );
        if let Some(reason) = reason {
            report = report.with_shutdown_reason(reason);
        }

        match health::write_report(&self.config.paths.health_file, &report) {
            Ok(()) => self.last_health = Some(now),
            Err(e) => warn!(error = %e, "Failed to write liveness artifact"),
        }
    }
}
