//! Engine configuration
//!
//! Immutable settings handed to the engine at construction: execution mode,
//! superstep guard, signal delivery retry policy and RNG seeding.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Execution mode for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Supersteps separated by global barriers. Signals raised in superstep
    /// `k` become visible in superstep `k + 1`.
    #[default]
    Synchronous,

    /// Partition workers drain their queues continuously. Signals are
    /// visible as soon as they are delivered; higher priority runs first,
    /// FIFO among equal priorities.
    Asynchronous,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Synchronous => f.write_str("synchronous"),
            ExecutionMode::Asynchronous => f.write_str("asynchronous"),
        }
    }
}

impl FromStr for ExecutionMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sync" | "synchronous" => Ok(ExecutionMode::Synchronous),
            "async" | "asynchronous" => Ok(ExecutionMode::Asynchronous),
            other => Err(EngineError::config_error(format!(
                "unknown execution mode '{other}' (expected synchronous or asynchronous)"
            ))),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synchronous or asynchronous scheduling
    pub execution_mode: ExecutionMode,

    /// Fail a synchronous run after this many supersteps (`None` = unlimited)
    pub max_supersteps: Option<usize>,

    /// Retry policy for cross-partition signal delivery
    pub delivery_retry: RetryPolicy,

    /// Seed for the per-partition RNGs (`None` = seeded from entropy)
    pub seed: Option<u64>,

    /// Emit per-superstep debug events
    pub tracing_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::default(),
            max_supersteps: None,
            delivery_retry: RetryPolicy::default(),
            seed: None,
            tracing_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode
    pub fn with_execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = mode;
        self
    }

    /// Set maximum supersteps
    pub fn with_max_supersteps(mut self, max: usize) -> Self {
        self.max_supersteps = Some(max);
        self
    }

    /// Set the delivery retry policy
    pub fn with_delivery_retry(mut self, policy: RetryPolicy) -> Self {
        self.delivery_retry = policy;
        self
    }

    /// Seed the partition RNGs for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable tracing
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.tracing_enabled = enabled;
        self
    }

    /// Check whether a superstep is beyond the configured limit
    pub fn exceeds_supersteps(&self, superstep: usize) -> bool {
        self.max_supersteps.is_some_and(|max| superstep >= max)
    }
}

/// Retry policy for signal delivery
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum retry attempts after the first failure
    pub max_retries: usize,

    /// Base delay for exponential backoff
    #[serde(with = "humantime_serde")]
    pub backoff_base: Duration,

    /// Maximum delay between retries
    #[serde(with = "humantime_serde")]
    pub backoff_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy
    pub fn new(max_retries: usize) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set backoff base duration
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Set maximum backoff duration
    pub fn with_backoff_max(mut self, max: Duration) -> Self {
        self.backoff_max = max;
        self
    }

    /// Calculate delay for a given retry attempt (exponential backoff)
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let multiplier = 2u32.saturating_pow(attempt as u32);
        let delay = self.backoff_base.saturating_mul(multiplier);
        delay.min(self.backoff_max)
    }

    /// Check if more retries are allowed
    pub fn should_retry(&self, attempts: usize) -> bool {
        attempts < self.max_retries
    }
}
