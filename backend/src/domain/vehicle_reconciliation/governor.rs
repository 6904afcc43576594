//! Run-wide admission state shared by concurrent batch workers.
//!
//! This module contains adapter-agnostic policy logic for:
//! - cooling down after upstream rate-limit responses, doubling per streak;
//! - tripping the run once the rate-limit streak reaches the abort threshold;
//! - refusing further lookups after a fatal (authentication) failure.

use std::time::Duration;

/// Rate-limit backoff configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBackoffConfig {
    /// Consecutive rate-limit responses that stop the run.
    pub abort_threshold: u32,
    /// Cooldown after the first rate-limit response in a streak.
    pub initial_cooldown: Duration,
    /// Cooldown cap.
    pub max_cooldown: Duration,
}

/// Admission decision for one lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Lookup may proceed.
    Allowed,
    /// The rate-limit streak tripped the run.
    DeniedByRateLimit,
    /// A fatal error aborted the run.
    DeniedByAbort,
}

/// Mutable governor state shared across workers of one run.
#[derive(Debug, Clone)]
pub struct RunGovernor {
    config: RateLimitBackoffConfig,
    consecutive_rate_limits: u32,
    aborted: bool,
}

impl RunGovernor {
    /// Build fresh state for one run.
    pub fn new(config: RateLimitBackoffConfig) -> Self {
        Self {
            config: RateLimitBackoffConfig {
                abort_threshold: config.abort_threshold.max(1),
                ..config
            },
            consecutive_rate_limits: 0,
            aborted: false,
        }
    }

    /// Decide whether the next lookup may start.
    pub fn admit(&self) -> Admission {
        if self.aborted {
            Admission::DeniedByAbort
        } else if self.is_rate_limit_tripped() {
            Admission::DeniedByRateLimit
        } else {
            Admission::Allowed
        }
    }

    /// Record a rate-limit response and return the cooldown the worker should observe.
    pub fn record_rate_limited(&mut self) -> Duration {
        self.consecutive_rate_limits = self.consecutive_rate_limits.saturating_add(1);
        let exponent = 2_u32.saturating_pow(self.consecutive_rate_limits.saturating_sub(1));
        let base_ms = u64::try_from(self.config.initial_cooldown.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.config.max_cooldown.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(base_ms.saturating_mul(u64::from(exponent)).min(max_ms))
    }

    /// Record any response that was not a rate limit.
    pub fn record_response(&mut self) {
        if !self.is_rate_limit_tripped() {
            self.consecutive_rate_limits = 0;
        }
    }

    /// Stop admitting lookups for the rest of the run.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    /// Return whether the rate-limit streak reached the abort threshold.
    pub fn is_rate_limit_tripped(&self) -> bool {
        self.consecutive_rate_limits >= self.config.abort_threshold
    }

    /// Current streak length.
    #[cfg(test)]
    pub fn consecutive_rate_limits(&self) -> u32 {
        self.consecutive_rate_limits
    }
}
