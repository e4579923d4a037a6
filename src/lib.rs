//! autoposter - Scheduled article publishing bot
//!
//! Picks an unpublished topic from a theme catalog, asks a text API for an
//! article, attaches a product image and publishes the result to WordPress
//! and a Telegram channel a fixed number of times per day.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - TOML configuration and environment overrides
//! - [`scheduler`] - Daily slots and next-post planning
//! - [`publish`] - Retry, backoff and circuit breaking per service
//! - [`orchestrator`] - The main loop, control commands and liveness file
//! - [`content`] - Theme catalog, article generation, images, formatting
//! - [`platforms`] - WordPress and Telegram clients
//! - [`storage`] - Publication history (SQLite)
//! - [`models`] - Core data structures and types
//! - [`utils`] - Clock, retry helper and text utilities
//!
//! # Example
//!
//! ```no_run
//! use autoposter::config::Config;
//! use autoposter::scheduler::calculate_next_post_time;
//! use autoposter::storage::{open_history, HistoryStore};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml".as_ref())?;
//!     let store = open_history(&config.paths.database)?;
//!     let now = chrono::Local::now().naive_local();
//!     let today = store.published_on(now.date())?;
//!     let next = calculate_next_post_time(now, today.len(), &config.publishing);
//!     println!("{next}");
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod content;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod platforms;
pub mod publish;
pub mod scheduler;
pub mod storage;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::content::{ArticleGenerator, ContentGenerator};
    pub use crate::error::{Error, ErrorCategory, PosterErrorTrait, Result};
    pub use crate::models::{Platform, Post, PublicationRecord, PublishStatus};
    pub use crate::orchestrator::{Orchestrator, ShutdownReason};
    pub use crate::publish::FailureGovernor;
    pub use crate::storage::{HistoryStore, SqliteHistoryStore};
}

// Direct re-exports for convenience
pub use models::{Platform, Post, PublicationRecord, PublishStatus};
