//! Configuration constants and the validated pool configuration.
//!
//! ## Key Concepts
//! - **Ceiling**: generators draw from `[0, ceiling)`, and the collector
//!   completes once it holds `ceiling` distinct values, i.e. every value in
//!   that range.
//! - **Backpressure**: the shared value channel is bounded; a generator blocks
//!   on emission while the collector falls behind.
//! - **Synchronous control**: control channels hold a single message since the
//!   dispatcher never has more than one command in flight per worker.

use crate::error::{Error, Result};
use core::time::Duration;

/// Capacity of each command and feedback channel.
pub const CONTROL_BUFFER_SIZE: usize = 1;

/// How long the dispatcher waits for an acknowledgment before giving up.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_secs(3);

/// Construction parameters for a [`NumberPool`](crate::NumberPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of generator workers.
    pub workers: usize,
    /// Exclusive upper bound of generated values, and the collector's target
    /// cardinality.
    pub ceiling: u64,
    /// Period between two values of an active generator.
    pub interval: Duration,
    /// Capacity of the shared value channel.
    pub value_buffer: usize,
    /// Per-command acknowledgment deadline. `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

impl PoolConfig {
    /// Builds a configuration with the default value buffer (one slot per
    /// generator) and the default reply timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if any of `workers`, `ceiling` or
    /// `interval` is zero.
    pub fn new(workers: usize, ceiling: u64, interval: Duration) -> Result<Self> {
        let config = Self {
            workers,
            ceiling,
            interval,
            value_buffer: workers.max(1),
            reply_timeout: Some(DEFAULT_REPLY_TIMEOUT),
        };
        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub const fn with_value_buffer(mut self, value_buffer: usize) -> Self {
        self.value_buffer = value_buffer;
        self
    }

    #[must_use]
    pub const fn with_reply_timeout(mut self, reply_timeout: Option<Duration>) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    /// Checks every invariant. Called again by the pool since the builder
    /// methods bypass [`PoolConfig::new`].
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(invalid("worker count must be greater than 0"));
        }
        validate_ceiling(self.ceiling)?;
        validate_interval(self.interval)?;
        if self.value_buffer == 0 {
            return Err(invalid("value buffer must be greater than 0"));
        }
        if self.reply_timeout.is_some_and(|t| t.is_zero()) {
            return Err(invalid("reply timeout must be greater than 0"));
        }
        if usize::try_from(self.ceiling).is_err() {
            return Err(invalid("ceiling does not fit in memory on this platform"));
        }
        Ok(())
    }
}

pub(crate) fn validate_ceiling(ceiling: u64) -> Result<()> {
    if ceiling == 0 {
        return Err(invalid("ceiling must be greater than 0"));
    }
    Ok(())
}

pub(crate) fn validate_interval(interval: Duration) -> Result<()> {
    if interval.is_zero() {
        return Err(invalid("tick interval must be greater than 0"));
    }
    Ok(())
}

fn invalid(reason: &str) -> Error {
    Error::InvalidConfig {
        reason: reason.to_owned(),
    }
}
