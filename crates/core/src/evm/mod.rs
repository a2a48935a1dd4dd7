//! Earned value management: performance metrics and forecasts.

pub mod cache;
pub mod calculator;
pub mod error;
pub mod forecast;
pub mod types;

#[cfg(test)]
mod forecast_props;

pub use cache::EvmReportCache;
pub use calculator::EvmCalculator;
pub use error::EvmError;
pub use types::{
    ActualCost, BudgetLine, EvmInput, EvmMetrics, EvmSnapshot, Forecast, PerformancePoint,
    PerformanceStatus, Priority, ScenarioForecast, TaskDefinition, TaskSnapshot,
};
