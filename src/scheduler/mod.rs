//! Slot planning
//!
//! Answers two questions for the orchestrator: at which times of day posts
//! are due ([`slots`]), and when the next one will go out ([`planner`]).
//!
//! # Quick Start
//!
//! ```
//! use autoposter::config::PublishingConfig;
//! use autoposter::scheduler::{calculate_next_post_time, get_today_slots};
//! use chrono::NaiveDate;
//!
//! let publishing = PublishingConfig::default();
//! let slots = get_today_slots(publishing.posts_per_day, publishing.publish_window);
//! assert_eq!(slots.len(), 3);
//!
//! let now = NaiveDate::from_ymd_opt(2024, 6, 1)
//!     .unwrap()
//!     .and_hms_opt(21, 0, 0)
//!     .unwrap();
//! let next = calculate_next_post_time(now, 1, &publishing);
//! assert_eq!(next.time_str(), "08:00");
//! ```

pub mod planner;
pub mod slots;

pub use planner::{calculate_next_post_time, NextPost, NextPostReason};
pub use slots::{get_today_slots, interval_seconds, Slot};
