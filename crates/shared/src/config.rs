//! Application configuration management.

use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use thiserror::Error;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Retry and timeout policy for storage calls.
    #[serde(default)]
    pub resilience: ResilienceConfig,
    /// Earned value policy constants.
    #[serde(default)]
    pub evm: EvmPolicy,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Bounded retry and timeout policy.
///
/// Retries only ever wrap reads and idempotent writes.
#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    /// Total attempts including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Backoff before the second attempt, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Multiplier applied to the backoff after every failed attempt.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
    /// Upper bound for a single backoff, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Overall deadline for one ledger operation, in seconds.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    50
}

fn default_backoff_multiplier() -> u32 {
    2
}

fn default_max_backoff_ms() -> u64 {
    2_000
}

fn default_operation_timeout_secs() -> u64 {
    30
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

impl ResilienceConfig {
    /// Overall deadline for one operation.
    #[must_use]
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_secs)
    }

    /// Backoff to wait after the given failed attempt (1-indexed).
    #[must_use]
    pub fn backoff_after(&self, attempt: u32) -> Duration {
        let factor = u64::from(self.backoff_multiplier.max(1))
            .saturating_pow(attempt.saturating_sub(1));
        let millis = self
            .initial_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms);
        Duration::from_millis(millis)
    }
}

/// Policy constants for earned value calculations.
///
/// The EAC branch thresholds and the health-score weights have no external
/// standard behind them, so they live in configuration rather than code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
#[serde(default)]
pub struct EvmPolicy {
    /// CPI above which EAC assumes remaining work runs at budget.
    pub eac_upper_cpi: Decimal,
    /// CPI at or above which EAC is `BAC / CPI`; below it the remaining work is
    /// scaled by CPI.
    pub eac_lower_cpi: Decimal,
    /// `min(CPI, SPI)` at or above this is on-track.
    pub on_track_threshold: Decimal,
    /// `min(CPI, SPI)` at or above this (and below on-track) is at-risk.
    pub at_risk_threshold: Decimal,
    /// Health-score weight of `min(CPI, 1)`.
    pub cpi_weight: Decimal,
    /// Health-score weight of `min(SPI, 1)`.
    pub spi_weight: Decimal,
    /// Health-score weight of `PV / BAC`.
    pub progress_weight: Decimal,
    /// Index offset applied in each direction for forecast scenarios.
    pub scenario_offset: Decimal,
    /// Number of trailing points (including the current one) in the trend.
    pub trend_window: usize,
    /// Smallest index used as a divisor.
    pub index_floor: Decimal,
    /// Lower bound of the confidence level.
    pub confidence_floor: Decimal,
    /// Upper bound of the confidence level.
    pub confidence_ceiling: Decimal,
}

impl Default for EvmPolicy {
    fn default() -> Self {
        Self {
            eac_upper_cpi: dec!(0.95),
            eac_lower_cpi: dec!(0.8),
            on_track_threshold: dec!(0.95),
            at_risk_threshold: dec!(0.8),
            cpi_weight: dec!(0.4),
            spi_weight: dec!(0.4),
            progress_weight: dec!(0.2),
            scenario_offset: dec!(0.1),
            trend_window: 3,
            index_floor: dec!(0.1),
            confidence_floor: dec!(0.5),
            confidence_ceiling: dec!(1.0),
        }
    }
}

/// Inconsistent policy constants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    /// A lower threshold exceeds its upper counterpart.
    #[error("Threshold {lower_name} ({lower}) must not exceed {upper_name} ({upper})")]
    ThresholdOrder {
        /// Name of the lower threshold.
        lower_name: &'static str,
        /// Value of the lower threshold.
        lower: Decimal,
        /// Name of the upper threshold.
        upper_name: &'static str,
        /// Value of the upper threshold.
        upper: Decimal,
    },

    /// Health-score weights must add up to one.
    #[error("Health score weights must sum to 1, got {0}")]
    WeightSum(Decimal),

    /// A value that must be strictly positive is not.
    #[error("{0} must be positive")]
    NotPositive(&'static str),
}

impl EvmPolicy {
    /// Checks the policy for internal consistency.
    pub fn validate(&self) -> Result<(), PolicyError> {
        let ordered = [
            ("eac_lower_cpi", self.eac_lower_cpi, "eac_upper_cpi", self.eac_upper_cpi),
            (
                "at_risk_threshold",
                self.at_risk_threshold,
                "on_track_threshold",
                self.on_track_threshold,
            ),
            (
                "confidence_floor",
                self.confidence_floor,
                "confidence_ceiling",
                self.confidence_ceiling,
            ),
        ];
        for (lower_name, lower, upper_name, upper) in ordered {
            if lower > upper {
                return Err(PolicyError::ThresholdOrder {
                    lower_name,
                    lower,
                    upper_name,
                    upper,
                });
            }
        }

        let weights = self.cpi_weight + self.spi_weight + self.progress_weight;
        if weights != Decimal::ONE {
            return Err(PolicyError::WeightSum(weights));
        }
        if self.index_floor <= Decimal::ZERO {
            return Err(PolicyError::NotPositive("index_floor"));
        }
        if self.trend_window == 0 {
            return Err(PolicyError::NotPositive("trend_window"));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TRESTLE").separator("__"))
            .build()?;

        let loaded: Self = config.try_deserialize()?;
        loaded
            .evm
            .validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(loaded)
    }
}
