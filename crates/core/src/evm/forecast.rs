//! Trend analysis and scenario forecasts.
//!
//! The trend is the mean CPI/SPI over the trailing window of measurements,
//! the current one included. Each scenario runs the same cost and date
//! functions with a shifted trend, so the most-likely scenario is the primary
//! forecast.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use trestle_shared::EvmPolicy;

use super::calculator::{EvmCalculator, ratio};
use super::types::{EvmInput, EvmMetrics, Forecast, PerformancePoint, ScenarioForecast, TaskSnapshot};

/// Trailing measurements used for the trend, oldest first.
///
/// History points on or after `as_of` are ignored; the current measurement is
/// always last.
#[must_use]
pub fn trend_window(
    input: &EvmInput,
    metrics: &EvmMetrics,
    policy: &EvmPolicy,
) -> Vec<PerformancePoint> {
    let mut earlier: Vec<PerformancePoint> = input
        .history
        .iter()
        .filter(|p| p.as_of < input.as_of)
        .copied()
        .collect();
    earlier.sort_by_key(|p| p.as_of);

    let keep = policy.trend_window.max(1) - 1;
    let skip = earlier.len().saturating_sub(keep);
    let mut window: Vec<PerformancePoint> = earlier.into_iter().skip(skip).collect();
    window.push(PerformancePoint {
        as_of: input.as_of,
        cpi: metrics.cpi,
        spi: metrics.spi,
    });
    window
}

fn mean(values: &[Decimal]) -> Decimal {
    let sum: Decimal = values.iter().copied().sum();
    ratio(sum, Decimal::from(values.len()), Decimal::ZERO)
}

fn mean_absolute_deviation(values: &[Decimal]) -> Decimal {
    let centre = mean(values);
    let deviations: Vec<Decimal> = values.iter().map(|v| (*v - centre).abs()).collect();
    mean(&deviations)
}

/// Mean CPI and SPI over the window.
#[must_use]
pub fn trend_indices(window: &[PerformancePoint]) -> (Decimal, Decimal) {
    let cpis: Vec<Decimal> = window.iter().map(|p| p.cpi).collect();
    let spis: Vec<Decimal> = window.iter().map(|p| p.spi).collect();
    (mean(&cpis), mean(&spis))
}

/// `1 − (MAD(CPI) + MAD(SPI))`, clamped to the policy bounds.
///
/// With fewer than two measurements there is no variability to judge, so the
/// midpoint of the bounds is returned.
#[must_use]
pub fn confidence_level(window: &[PerformancePoint], policy: &EvmPolicy) -> Decimal {
    if window.len() < 2 {
        return (policy.confidence_floor + policy.confidence_ceiling) / Decimal::TWO;
    }
    let cpis: Vec<Decimal> = window.iter().map(|p| p.cpi).collect();
    let spis: Vec<Decimal> = window.iter().map(|p| p.spi).collect();
    let instability = mean_absolute_deviation(&cpis) + mean_absolute_deviation(&spis);
    (Decimal::ONE - instability).clamp(policy.confidence_floor, policy.confidence_ceiling)
}

/// Final cost if the remaining work runs at `cpi`.
#[must_use]
pub fn forecast_cost(metrics: &EvmMetrics, cpi: Decimal, policy: &EvmPolicy) -> Decimal {
    EvmCalculator::eac(metrics.bac, metrics.ev, metrics.ac, cpi, policy)
}

/// Completion date if the schedule runs at `spi`.
///
/// Project start plus the planned duration stretched by `1 / max(spi, floor)`,
/// rounded up to whole days. `None` without tasks.
#[must_use]
pub fn forecast_date(tasks: &[TaskSnapshot], spi: Decimal, policy: &EvmPolicy) -> Option<NaiveDate> {
    let start = tasks.iter().map(|t| t.planned_start).min()?;
    let end = tasks.iter().map(|t| t.planned_end).max()?;
    let planned_days = Decimal::from((end - start).num_days());
    let pace = spi.max(policy.index_floor);
    let days = ratio(planned_days, pace, planned_days).ceil().to_u64()?;
    start.checked_add_days(Days::new(days))
}

fn scenario(
    input: &EvmInput,
    metrics: &EvmMetrics,
    cpi: Decimal,
    spi: Decimal,
    policy: &EvmPolicy,
) -> ScenarioForecast {
    ScenarioForecast {
        cpi,
        spi,
        cost: forecast_cost(metrics, cpi, policy),
        completion_date: forecast_date(&input.tasks, spi, policy),
    }
}

/// Optimistic, most-likely and pessimistic forecasts around the trend.
#[must_use]
pub fn scenarios(
    input: &EvmInput,
    metrics: &EvmMetrics,
    window: &[PerformancePoint],
    policy: &EvmPolicy,
) -> Forecast {
    let (trend_cpi, trend_spi) = trend_indices(window);
    let offset = policy.scenario_offset;
    let floor = policy.index_floor;

    Forecast {
        optimistic: scenario(input, metrics, trend_cpi + offset, trend_spi + offset, policy),
        most_likely: scenario(input, metrics, trend_cpi, trend_spi, policy),
        pessimistic: scenario(
            input,
            metrics,
            (trend_cpi - offset).max(floor),
            (trend_spi - offset).max(floor),
            policy,
        ),
    }
}
