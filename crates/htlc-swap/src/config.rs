//! # Swap Configuration
//!
//! Coordinator-wide settings. Per-ledger settings live in
//! [`crate::adapters::LedgerProfile`].

use crate::domain::{SwapError, SwapResult, TimelockRequest, MIN_SAFETY_MARGIN_SECS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff for polling and transient retries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Attempts before giving up
    pub max_attempts: u32,
    /// First delay (milliseconds)
    pub initial_interval_ms: u64,
    /// Delay ceiling (milliseconds)
    pub max_interval_ms: u64,
    /// Growth factor per attempt
    pub multiplier: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 60,
            initial_interval_ms: 2_000,
            max_interval_ms: 30_000,
            multiplier: 2,
        }
    }
}

impl RetryPolicy {
    /// Fast policy for tests.
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 20,
            initial_interval_ms: 10,
            max_interval_ms: 100,
            multiplier: 2,
        }
    }

    /// Delay before retry number `attempt` (zero-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.multiplier.max(1)).saturating_pow(attempt);
        let ms = self
            .initial_interval_ms
            .saturating_mul(factor)
            .min(self.max_interval_ms);
        Duration::from_millis(ms)
    }

    /// Longest single delay.
    pub fn max_interval(&self) -> Duration {
        Duration::from_millis(self.max_interval_ms)
    }
}

/// Configuration for the swap coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SwapConfig {
    /// Source expiry when the request names none (seconds from now)
    pub default_source_timelock_secs: u64,
    /// Destination expiry when the request names none (seconds from now)
    pub default_destination_timelock_secs: u64,
    /// Floor for the gap between the two expiries
    pub min_safety_margin_secs: u64,
    /// Floor for how far above a ledger's earliest accepted timelock each
    /// lock is placed, covering time spent before it is submitted
    pub min_lock_headroom_secs: u64,
    /// Polling and transient retry policy
    pub retry: RetryPolicy,
    /// Ceiling on any single ledger call (milliseconds)
    pub call_timeout_ms: u64,
}

impl Default for SwapConfig {
    fn default() -> Self {
        Self {
            default_source_timelock_secs: 6 * 3_600,
            default_destination_timelock_secs: 3 * 3_600,
            min_safety_margin_secs: MIN_SAFETY_MARGIN_SECS,
            min_lock_headroom_secs: 300,
            retry: RetryPolicy::default(),
            call_timeout_ms: 30_000,
        }
    }
}

impl SwapConfig {
    /// Create a config for testing with short retry intervals.
    pub fn for_testing() -> Self {
        Self {
            retry: RetryPolicy::for_testing(),
            call_timeout_ms: 1_000,
            ..Self::default()
        }
    }

    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(raw: &str) -> SwapResult<Self> {
        let config: Self = serde_json::from_str(raw)
            .map_err(|e| SwapError::Validation(format!("config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the coordinator cannot operate with.
    pub fn validate(&self) -> SwapResult<()> {
        if self.default_destination_timelock_secs >= self.default_source_timelock_secs {
            return Err(SwapError::Validation(
                "default destination timelock must be shorter than source".into(),
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(SwapError::Validation("retry.max_attempts must be > 0".into()));
        }
        if self.retry.initial_interval_ms == 0 || self.retry.max_interval_ms == 0 {
            return Err(SwapError::Validation("retry intervals must be > 0".into()));
        }
        if self.call_timeout_ms == 0 {
            return Err(SwapError::Validation("call_timeout_ms must be > 0".into()));
        }
        Ok(())
    }

    /// Timelock request used when the caller supplies none.
    pub fn default_timelocks(&self) -> TimelockRequest {
        TimelockRequest::Relative {
            source_secs: self.default_source_timelock_secs,
            destination_secs: self.default_destination_timelock_secs,
        }
    }

    /// Per-call timeout as a duration.
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}
