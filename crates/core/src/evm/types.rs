//! Earned value data types.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trestle_shared::types::{BudgetLineId, ProjectId, TaskId};

/// Task priority as recorded in the project schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
    /// On the critical path.
    Critical,
}

/// Schedule and progress data for a task, before costs are attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskDefinition {
    /// Task ID.
    pub id: TaskId,
    /// Task name.
    pub name: String,
    /// Planned start date.
    pub planned_start: NaiveDate,
    /// Planned end date.
    pub planned_end: NaiveDate,
    /// Physical progress in [0, 1].
    pub actual_progress: Decimal,
    /// Task priority.
    pub priority: Priority,
}

/// A budget line linked to a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BudgetLine {
    /// Budget line ID.
    pub id: BudgetLineId,
    /// The task this line budgets.
    pub task_id: TaskId,
    /// Quantity (m³, hours, units...).
    pub volume: Decimal,
    /// Price per unit.
    pub unit_price: Decimal,
}

impl BudgetLine {
    /// `volume × unit_price`.
    #[must_use]
    pub fn planned_cost(&self) -> Decimal {
        self.volume * self.unit_price
    }
}

/// An actual cost booked against a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActualCost {
    /// The task the cost was booked to.
    pub task_id: TaskId,
    /// Amount spent.
    pub amount: Decimal,
}

/// A task with its planned and actual cost, as consumed by the calculator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskSnapshot {
    /// Task ID.
    pub id: TaskId,
    /// Task name.
    pub name: String,
    /// Budgeted cost.
    pub planned_cost: Decimal,
    /// Planned start date.
    pub planned_start: NaiveDate,
    /// Planned end date.
    pub planned_end: NaiveDate,
    /// Physical progress in [0, 1].
    pub actual_progress: Decimal,
    /// Task priority.
    pub priority: Priority,
    /// Cost spent so far.
    pub actual_cost: Decimal,
}

/// A previously recorded CPI/SPI pair, used for trend analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PerformancePoint {
    /// Date the indices were measured.
    pub as_of: NaiveDate,
    /// Cost performance index.
    pub cpi: Decimal,
    /// Schedule performance index.
    pub spi: Decimal,
}

/// Everything needed to compute one project's EVM snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvmInput {
    /// The project.
    pub project_id: ProjectId,
    /// Measurement date.
    pub as_of: NaiveDate,
    /// Tasks with costs attached.
    pub tasks: Vec<TaskSnapshot>,
    /// Earlier measurements, any order. Points on or after `as_of` are ignored.
    pub history: Vec<PerformancePoint>,
}

impl EvmInput {
    /// Builds the input from task definitions, budget lines and actual costs.
    ///
    /// A task's planned cost is the sum of its budget lines; its actual cost is
    /// the sum of the costs booked to it. Lines and costs for unknown tasks are
    /// ignored.
    #[must_use]
    pub fn assemble(
        project_id: ProjectId,
        as_of: NaiveDate,
        tasks: Vec<TaskDefinition>,
        budget_lines: &[BudgetLine],
        actual_costs: &[ActualCost],
        history: Vec<PerformancePoint>,
    ) -> Self {
        let mut planned: HashMap<TaskId, Decimal> = HashMap::new();
        for line in budget_lines {
            *planned.entry(line.task_id).or_default() += line.planned_cost();
        }
        let mut spent: HashMap<TaskId, Decimal> = HashMap::new();
        for cost in actual_costs {
            *spent.entry(cost.task_id).or_default() += cost.amount;
        }

        let tasks = tasks
            .into_iter()
            .map(|task| TaskSnapshot {
                planned_cost: planned.get(&task.id).copied().unwrap_or_default(),
                actual_cost: spent.get(&task.id).copied().unwrap_or_default(),
                id: task.id,
                name: task.name,
                planned_start: task.planned_start,
                planned_end: task.planned_end,
                actual_progress: task.actual_progress,
                priority: task.priority,
            })
            .collect();

        Self {
            project_id,
            as_of,
            tasks,
            history,
        }
    }
}

/// Overall project health classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PerformanceStatus {
    /// `min(CPI, SPI)` at or above the on-track threshold.
    OnTrack,
    /// `min(CPI, SPI)` at or above the at-risk threshold.
    AtRisk,
    /// Below the at-risk threshold.
    Critical,
}

impl PerformanceStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "on-track",
            Self::AtRisk => "at-risk",
            Self::Critical => "critical",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "on-track" => Some(Self::OnTrack),
            "at-risk" => Some(Self::AtRisk),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

/// Core earned value figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmMetrics {
    /// Budget at completion.
    pub bac: Decimal,
    /// Planned value.
    pub pv: Decimal,
    /// Earned value.
    pub ev: Decimal,
    /// Actual cost.
    pub ac: Decimal,
    /// Cost performance index.
    pub cpi: Decimal,
    /// Schedule performance index.
    pub spi: Decimal,
    /// Cost variance.
    pub cv: Decimal,
    /// Schedule variance.
    pub sv: Decimal,
    /// Estimate at completion.
    pub eac: Decimal,
    /// Estimate to complete.
    pub etc: Decimal,
    /// Variance at completion.
    pub vac: Decimal,
    /// To-complete performance index; `None` when `AC == BAC`.
    pub tcpi: Option<Decimal>,
}

/// One forecast scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioForecast {
    /// CPI assumed for the remaining work.
    pub cpi: Decimal,
    /// SPI assumed for the remaining work.
    pub spi: Decimal,
    /// Forecast final cost.
    pub cost: Decimal,
    /// Forecast completion date; `None` for a project without tasks.
    pub completion_date: Option<NaiveDate>,
}

/// The three forecast scenarios.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forecast {
    /// Trend improved by the scenario offset.
    pub optimistic: ScenarioForecast,
    /// Trend as measured.
    pub most_likely: ScenarioForecast,
    /// Trend worsened by the scenario offset.
    pub pessimistic: ScenarioForecast,
}

/// A complete EVM report for one project at one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvmSnapshot {
    /// The project.
    pub project_id: ProjectId,
    /// Measurement date.
    pub as_of: NaiveDate,
    /// Earned value figures.
    pub metrics: EvmMetrics,
    /// Health classification.
    pub performance_status: PerformanceStatus,
    /// Weighted health score in [0, 100].
    pub health_score: Decimal,
    /// Primary cost forecast (equals `forecast.most_likely.cost`).
    pub forecast_cost: Decimal,
    /// Primary completion forecast (equals `forecast.most_likely.completion_date`).
    pub forecast_date: Option<NaiveDate>,
    /// Scenario forecasts.
    pub forecast: Forecast,
    /// Confidence in the forecast, within the policy bounds.
    pub confidence_level: Decimal,
    /// Tasks that are critical or less than half done.
    pub critical_tasks: Vec<TaskId>,
}

impl EvmSnapshot {
    /// The CPI/SPI pair of this snapshot, for use as trend history.
    #[must_use]
    pub fn performance_point(&self) -> PerformancePoint {
        PerformancePoint {
            as_of: self.as_of,
            cpi: self.metrics.cpi,
            spi: self.metrics.spi,
        }
    }
}
