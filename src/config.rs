//! # Configuration Module
//!
//! Loads demo settings from environment variables (and an optional `.env`
//! file). Command-line flags override whatever is loaded here.

use anyhow::{Context, Result};
use std::env;

use gas_engine::programs::{PageRankParams, MAX_VISITS, RESET_PROB, SCHEDULE_COUNT, TOLERANCE};
use gas_engine::{EngineConfig, ExecutionMode, GraphFormat};

// =============================================================================
// CONFIGURATION STRUCT
// =============================================================================
/// Settings shared by every demo.
#[derive(Debug, Clone)]
pub struct Config {
    /// Number of graph partitions (`None` = one per CPU core)
    pub partitions: Option<usize>,

    /// Synchronous or asynchronous scheduling
    pub execution_mode: ExecutionMode,

    /// Input edge-list format
    pub format: GraphFormat,

    /// Probability of a random jump (PageRank) or of a walker stopping
    pub reset_prob: f64,

    /// Largest rank change that still counts as converged
    pub tolerance: f64,

    /// Applies per vertex for the fixed-iteration demo
    pub schedule_count: usize,

    /// Visit budget for the random-walk simulation
    pub max_visits: u64,

    /// Seed for reproducible runs
    pub seed: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            partitions: None,
            execution_mode: ExecutionMode::Synchronous,
            format: GraphFormat::Tsv,
            reset_prob: RESET_PROB,
            tolerance: TOLERANCE,
            schedule_count: SCHEDULE_COUNT,
            max_visits: MAX_VISITS,
            seed: None,
        }
    }
}

// =============================================================================
// CONFIGURATION LOADING
// =============================================================================
impl Config {
    /// Load configuration from `GAS_*` environment variables.
    ///
    /// # Rust Concept: The ? Operator with Context
    ///
    /// `.context()` wraps a parse error with a message naming the variable,
    /// so a bad value fails fast with a clear explanation.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = Config::default();

        if let Ok(val) = env::var("GAS_PARTITIONS") {
            config.partitions = Some(
                val.parse()
                    .context("GAS_PARTITIONS must be a positive integer")?,
            );
        }

        if let Ok(val) = env::var("GAS_EXEC_MODE") {
            config.execution_mode = val
                .parse()
                .context("GAS_EXEC_MODE must be 'sync' or 'async'")?;
        }

        if let Ok(val) = env::var("GAS_FORMAT") {
            config.format = val.parse().context("GAS_FORMAT must be 'tsv' or 'snap'")?;
        }

        if let Ok(val) = env::var("GAS_RESET_PROB") {
            config.reset_prob = val
                .parse()
                .context("GAS_RESET_PROB must be a number between 0 and 1")?;
        }

        if let Ok(val) = env::var("GAS_TOLERANCE") {
            config.tolerance = val
                .parse()
                .context("GAS_TOLERANCE must be a non-negative number (e.g., 1e-5)")?;
        }

        if let Ok(val) = env::var("GAS_SCHEDULE_COUNT") {
            config.schedule_count = val
                .parse()
                .context("GAS_SCHEDULE_COUNT must be a positive integer")?;
        }

        if let Ok(val) = env::var("GAS_MAX_VISITS") {
            config.max_visits = val
                .parse()
                .context("GAS_MAX_VISITS must be a non-negative integer")?;
        }

        if let Ok(val) = env::var("GAS_SEED") {
            config.seed = Some(val.parse().context("GAS_SEED must be an unsigned integer")?);
        }

        Ok(config)
    }

    /// Validate the configuration before any graph is loaded.
    pub fn validate(&self) -> Result<()> {
        if self.partitions == Some(0) {
            anyhow::bail!("GAS_PARTITIONS must be at least 1");
        }

        if !(0.0..=1.0).contains(&self.reset_prob) {
            anyhow::bail!(
                "Reset probability must be between 0.0 and 1.0, got: {}",
                self.reset_prob
            );
        }

        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            anyhow::bail!("Tolerance must be a finite non-negative number, got: {}", self.tolerance);
        }

        if self.schedule_count == 0 {
            anyhow::bail!("GAS_SCHEDULE_COUNT must be at least 1");
        }

        Ok(())
    }

    /// PageRank parameters derived from this configuration
    pub fn pagerank_params(&self) -> PageRankParams {
        PageRankParams::new(self.reset_prob, self.tolerance)
    }

    /// Engine configuration derived from this configuration
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default().with_execution_mode(self.execution_mode);
        match self.seed {
            Some(seed) => config.with_seed(seed),
            None => config,
        }
    }
}

// =============================================================================
// UNIT TESTS
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.partitions, None);
        assert_eq!(config.execution_mode, ExecutionMode::Synchronous);
        assert!((config.reset_prob - 0.15).abs() < f64::EPSILON);
        assert_eq!(config.schedule_count, 10);
        assert_eq!(config.max_visits, 1000);
    }

    #[test]
    fn test_config_validation_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_invalid_reset_prob() {
        let mut config = Config::default();
        config.reset_prob = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_partitions() {
        let mut config = Config::default();
        config.partitions = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_tolerance() {
        let mut config = Config::default();
        config.tolerance = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_engine_config_carries_seed_and_mode() {
        let mut config = Config::default();
        config.execution_mode = ExecutionMode::Asynchronous;
        config.seed = Some(5);

        let engine = config.engine_config();
        assert_eq!(engine.execution_mode, ExecutionMode::Asynchronous);
        assert_eq!(engine.seed, Some(5));
    }
}
