//! Earned value calculations.
//!
//! All functions are pure. Every division goes through [`ratio`], so a zero
//! denominator never panics.

use chrono::NaiveDate;
use rayon::prelude::*;
use rust_decimal::Decimal;
use trestle_shared::EvmPolicy;
use trestle_shared::types::TaskId;

use super::error::EvmError;
use super::forecast;
use super::types::{EvmInput, EvmMetrics, EvmSnapshot, PerformanceStatus, Priority, TaskSnapshot};

/// Progress below which a task counts as critical.
const CRITICAL_PROGRESS: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// `numerator / denominator`, or `fallback` when the denominator is zero.
pub(crate) fn ratio(numerator: Decimal, denominator: Decimal, fallback: Decimal) -> Decimal {
    if denominator.is_zero() {
        fallback
    } else {
        numerator / denominator
    }
}

/// Stateless earned value calculator.
pub struct EvmCalculator;

impl EvmCalculator {
    /// Checks progress, schedule and cost of every task.
    pub fn validate(input: &EvmInput) -> Result<(), EvmError> {
        for task in &input.tasks {
            if task.actual_progress < Decimal::ZERO || task.actual_progress > Decimal::ONE {
                return Err(EvmError::ProgressOutOfRange {
                    task_id: task.id,
                    progress: task.actual_progress,
                });
            }
            if task.planned_end < task.planned_start {
                return Err(EvmError::InvalidSchedule { task_id: task.id });
            }
            if task.planned_cost < Decimal::ZERO || task.actual_cost < Decimal::ZERO {
                return Err(EvmError::NegativeCost { task_id: task.id });
            }
        }
        Ok(())
    }

    /// Fraction of the task's planned duration elapsed at `as_of`.
    ///
    /// 0 before the start, 1 from the end date on, linear in days in between.
    #[must_use]
    pub fn schedule_progress(task: &TaskSnapshot, as_of: NaiveDate) -> Decimal {
        if as_of < task.planned_start {
            return Decimal::ZERO;
        }
        if as_of >= task.planned_end {
            return Decimal::ONE;
        }
        let elapsed = (as_of - task.planned_start).num_days();
        let duration = (task.planned_end - task.planned_start).num_days();
        ratio(Decimal::from(elapsed), Decimal::from(duration), Decimal::ONE)
    }

    /// Budget at completion: Σ planned cost.
    #[must_use]
    pub fn budget_at_completion(tasks: &[TaskSnapshot]) -> Decimal {
        tasks.iter().map(|t| t.planned_cost).sum()
    }

    /// Planned value: Σ planned cost × schedule progress.
    #[must_use]
    pub fn planned_value(tasks: &[TaskSnapshot], as_of: NaiveDate) -> Decimal {
        tasks
            .iter()
            .map(|t| t.planned_cost * Self::schedule_progress(t, as_of))
            .sum()
    }

    /// Earned value: Σ planned cost × actual progress.
    #[must_use]
    pub fn earned_value(tasks: &[TaskSnapshot]) -> Decimal {
        tasks
            .iter()
            .map(|t| t.planned_cost * t.actual_progress)
            .sum()
    }

    /// Actual cost: Σ actual cost.
    #[must_use]
    pub fn actual_cost(tasks: &[TaskSnapshot]) -> Decimal {
        tasks.iter().map(|t| t.actual_cost).sum()
    }

    /// `EV / AC`, 1 when nothing has been spent.
    #[must_use]
    pub fn cpi(ev: Decimal, ac: Decimal) -> Decimal {
        ratio(ev, ac, Decimal::ONE)
    }

    /// `EV / PV`, 1 when nothing was planned yet.
    #[must_use]
    pub fn spi(ev: Decimal, pv: Decimal) -> Decimal {
        ratio(ev, pv, Decimal::ONE)
    }

    /// Estimate at completion for a given CPI.
    ///
    /// - CPI above the upper threshold: remaining work at budget, `AC + (BAC − EV)`
    /// - CPI at or above the lower threshold: `BAC / CPI`
    /// - otherwise remaining work scaled by CPI, `AC + (BAC − EV) / CPI`
    #[must_use]
    pub fn eac(bac: Decimal, ev: Decimal, ac: Decimal, cpi: Decimal, policy: &EvmPolicy) -> Decimal {
        let divisor = if cpi > Decimal::ZERO {
            cpi
        } else {
            policy.index_floor
        };
        if cpi > policy.eac_upper_cpi {
            ac + (bac - ev)
        } else if cpi >= policy.eac_lower_cpi {
            ratio(bac, divisor, bac)
        } else {
            ac + ratio(bac - ev, divisor, bac - ev)
        }
    }

    /// `(BAC − EV) / (BAC − AC)`; undefined when the budget is fully spent.
    #[must_use]
    pub fn tcpi(bac: Decimal, ev: Decimal, ac: Decimal) -> Option<Decimal> {
        let remaining_budget = bac - ac;
        if remaining_budget.is_zero() {
            None
        } else {
            Some((bac - ev) / remaining_budget)
        }
    }

    /// Classifies `min(CPI, SPI)` against the policy thresholds.
    #[must_use]
    pub fn performance_status(cpi: Decimal, spi: Decimal, policy: &EvmPolicy) -> PerformanceStatus {
        let worst = cpi.min(spi);
        if worst >= policy.on_track_threshold {
            PerformanceStatus::OnTrack
        } else if worst >= policy.at_risk_threshold {
            PerformanceStatus::AtRisk
        } else {
            PerformanceStatus::Critical
        }
    }

    /// `100 × (w_cpi·min(CPI,1) + w_spi·min(SPI,1) + w_progress·(PV/BAC))`, clamped to [0, 100].
    #[must_use]
    pub fn health_score(
        cpi: Decimal,
        spi: Decimal,
        pv: Decimal,
        bac: Decimal,
        policy: &EvmPolicy,
    ) -> Decimal {
        let planned_share = ratio(pv, bac, Decimal::ZERO);
        let weighted = policy.cpi_weight * cpi.min(Decimal::ONE)
            + policy.spi_weight * spi.min(Decimal::ONE)
            + policy.progress_weight * planned_share;
        (Decimal::ONE_HUNDRED * weighted).clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
    }

    /// Tasks with critical priority or less than half done.
    #[must_use]
    pub fn identify_critical_tasks(tasks: &[TaskSnapshot]) -> Vec<TaskId> {
        tasks
            .iter()
            .filter(|t| t.priority == Priority::Critical || t.actual_progress < CRITICAL_PROGRESS)
            .map(|t| t.id)
            .collect()
    }

    /// Computes the earned value figures.
    #[must_use]
    pub fn metrics(input: &EvmInput, policy: &EvmPolicy) -> EvmMetrics {
        let bac = Self::budget_at_completion(&input.tasks);
        let pv = Self::planned_value(&input.tasks, input.as_of);
        let ev = Self::earned_value(&input.tasks);
        let ac = Self::actual_cost(&input.tasks);
        let cpi = Self::cpi(ev, ac);
        let spi = Self::spi(ev, pv);
        let eac = Self::eac(bac, ev, ac, cpi, policy);

        EvmMetrics {
            bac,
            pv,
            ev,
            ac,
            cpi,
            spi,
            cv: ev - ac,
            sv: ev - pv,
            eac,
            etc: eac - ac,
            vac: bac - eac,
            tcpi: Self::tcpi(bac, ev, ac),
        }
    }

    /// Computes the full report for one project.
    pub fn compute(input: &EvmInput, policy: &EvmPolicy) -> Result<EvmSnapshot, EvmError> {
        Self::validate(input)?;

        let metrics = Self::metrics(input, policy);
        let window = forecast::trend_window(input, &metrics, policy);
        let forecast = forecast::scenarios(input, &metrics, &window, policy);

        Ok(EvmSnapshot {
            project_id: input.project_id,
            as_of: input.as_of,
            performance_status: Self::performance_status(metrics.cpi, metrics.spi, policy),
            health_score: Self::health_score(metrics.cpi, metrics.spi, metrics.pv, metrics.bac, policy),
            forecast_cost: forecast.most_likely.cost,
            forecast_date: forecast.most_likely.completion_date,
            confidence_level: forecast::confidence_level(&window, policy),
            critical_tasks: Self::identify_critical_tasks(&input.tasks),
            forecast,
            metrics,
        })
    }

    /// Computes reports for many projects in parallel.
    ///
    /// Results are returned in input order.
    #[must_use]
    pub fn compute_portfolio(
        inputs: &[EvmInput],
        policy: &EvmPolicy,
    ) -> Vec<Result<EvmSnapshot, EvmError>> {
        inputs
            .par_iter()
            .map(|input| Self::compute(input, policy))
            .collect()
    }
}
