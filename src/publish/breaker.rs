//! Per-service circuit breaker
//!
//! ```text
//!   failures < threshold          failures reach threshold
//!  ┌────────┐  ─────────────────▶  ┌────────┐
//!  │ CLOSED │                      │  OPEN  │  rejects without a network call
//!  └────────┘  ◀─────────────────  └────────┘
//!          first check after `timeout`: failures reset to 0
//! ```
//!
//! There is no separate half-open state: the attempt allowed through after
//! the timeout acts as a trial, and its failure starts counting again.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use serde::Serialize;

use crate::utils::clock::to_chrono;

/// Failure bookkeeping for one service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServiceFailureState {
    pub consecutive_failures: u32,
    pub circuit_opened_at: Option<NaiveDateTime>,
}

/// Circuit breaker for one service
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    threshold: u32,
    timeout: ChronoDuration,
    state: ServiceFailureState,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, timeout: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            timeout: to_chrono(timeout),
            state: ServiceFailureState::default(),
        }
    }

    /// Change threshold and timeout, keeping the current failure state
    pub fn set_policy(&mut self, threshold: u32, timeout: Duration) {
        self.threshold = threshold.max(1);
        self.timeout = to_chrono(timeout);
    }

    /// Whether attempts are currently rejected
    ///
    /// Closes the circuit (failures back to 0) on the first check after the
    /// timeout has elapsed.
    pub fn is_open(&mut self, now: NaiveDateTime) -> bool {
        if self.state.consecutive_failures < self.threshold {
            return false;
        }

        match self.state.circuit_opened_at {
            None => {
                self.state.circuit_opened_at = Some(now);
                true
            }
            Some(opened_at) if now - opened_at < self.timeout => true,
            Some(_) => {
                self.state = ServiceFailureState::default();
                false
            }
        }
    }

    /// Count a failed attempt, opening the circuit on reaching the threshold
    pub fn record_failure(&mut self, now: NaiveDateTime) {
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        if self.state.consecutive_failures >= self.threshold
            && self.state.circuit_opened_at.is_none()
        {
            self.state.circuit_opened_at = Some(now);
        }
    }

    /// Successes erode failures one at a time
    pub fn record_success(&mut self) {
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_sub(1);
    }

    pub fn failures(&self) -> u32 {
        self.state.consecutive_failures
    }

    pub fn state(&self) -> &ServiceFailureState {
        &self.state
    }
}
