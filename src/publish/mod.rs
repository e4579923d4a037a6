//! Failure isolation for publish calls
//!
//! - [`breaker`] - Per-service consecutive failure counter and circuit
//! - [`governor`] - Retry with linear backoff around the breaker, one
//!   history record per publish request
//!
//! ```rust,no_run
//! use autoposter::publish::FailureGovernor;
//! use autoposter::models::{Platform, Post};
//!
//! # async fn example(governor: FailureGovernor, post: Post) {
//! let results = governor.publish_all(&post).await;
//! if !results.any() {
//!     tracing::warn!("Post rejected by every service");
//! }
//! let ok = governor.publish_with_retry(&post, Platform::Telegram, 0).await;
//! # }
//! ```

pub mod breaker;
pub mod governor;

pub use breaker::{CircuitBreaker, ServiceFailureState};
pub use governor::{FailureGovernor, PublishResults};
