//! Property-based tests for EVM reports.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use trestle_shared::EvmPolicy;
use trestle_shared::types::{ProjectId, TaskId};

use super::calculator::EvmCalculator;
use super::types::{EvmInput, PerformancePoint, Priority, TaskSnapshot};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
        Just(Priority::Critical),
    ]
}

fn arb_task() -> impl Strategy<Value = TaskSnapshot> {
    (
        0i64..1_000_000_000,
        0u32..=100,
        0i64..1_000_000_000,
        0u64..300,
        0u64..300,
        priority(),
    )
        .prop_map(|(planned, pct, actual, offset, length, priority)| {
            let start = base_date() + Days::new(offset);
            TaskSnapshot {
                id: TaskId::new(),
                name: "task".to_string(),
                planned_cost: Decimal::new(planned, 2),
                planned_start: start,
                planned_end: start + Days::new(length),
                actual_progress: Decimal::new(i64::from(pct), 2),
                priority,
                actual_cost: Decimal::new(actual, 2),
            }
        })
}

fn arb_history() -> impl Strategy<Value = Vec<PerformancePoint>> {
    prop::collection::vec((0u64..400, 0i64..300, 0i64..300), 0..6).prop_map(|points| {
        points
            .into_iter()
            .map(|(day, cpi, spi)| PerformancePoint {
                as_of: base_date() + Days::new(day),
                cpi: Decimal::new(cpi, 2),
                spi: Decimal::new(spi, 2),
            })
            .collect()
    })
}

fn arb_input() -> impl Strategy<Value = EvmInput> {
    (
        prop::collection::vec(arb_task(), 0..6),
        arb_history(),
        0u64..500,
    )
        .prop_map(|(tasks, history, day)| EvmInput {
            project_id: ProjectId::new(),
            as_of: base_date() + Days::new(day),
            tasks,
            history,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// The most-likely scenario is the primary forecast, exactly.
    #[test]
    fn prop_most_likely_equals_primary_forecast(input in arb_input()) {
        let report = EvmCalculator::compute(&input, &EvmPolicy::default()).unwrap();
        prop_assert_eq!(report.forecast_cost, report.forecast.most_likely.cost);
        prop_assert_eq!(report.forecast_date, report.forecast.most_likely.completion_date);
    }

    /// Health score stays within [0, 100].
    #[test]
    fn prop_health_score_bounded(input in arb_input()) {
        let report = EvmCalculator::compute(&input, &EvmPolicy::default()).unwrap();
        prop_assert!(report.health_score >= Decimal::ZERO);
        prop_assert!(report.health_score <= Decimal::ONE_HUNDRED);
    }

    /// Confidence stays within the policy bounds.
    #[test]
    fn prop_confidence_bounded(input in arb_input()) {
        let policy = EvmPolicy::default();
        let report = EvmCalculator::compute(&input, &policy).unwrap();
        prop_assert!(report.confidence_level >= policy.confidence_floor);
        prop_assert!(report.confidence_level <= policy.confidence_ceiling);
    }

    /// Scenario indices are ordered and the pessimistic one never drops below the floor.
    #[test]
    fn prop_scenario_indices_ordered(input in arb_input()) {
        let policy = EvmPolicy::default();
        let forecast = EvmCalculator::compute(&input, &policy).unwrap().forecast;
        prop_assert!(forecast.optimistic.cpi > forecast.most_likely.cpi);
        prop_assert!(forecast.pessimistic.cpi <= forecast.most_likely.cpi.max(policy.index_floor));
        prop_assert!(forecast.pessimistic.cpi >= policy.index_floor);
        prop_assert!(forecast.pessimistic.spi >= policy.index_floor);
    }

    /// Earned value never exceeds the budget and planned value stays within it.
    #[test]
    fn prop_values_within_budget(input in arb_input()) {
        let m = EvmCalculator::metrics(&input, &EvmPolicy::default());
        prop_assert!(m.ev <= m.bac);
        prop_assert!(m.pv <= m.bac);
        prop_assert!(m.pv >= Decimal::ZERO);
    }

    /// Critical tasks are exactly those with critical priority or under half done.
    #[test]
    fn prop_critical_tasks_rule(input in arb_input()) {
        let ids = EvmCalculator::identify_critical_tasks(&input.tasks);
        for task in &input.tasks {
            let expected = task.priority == Priority::Critical
                || task.actual_progress < Decimal::new(5, 1);
            prop_assert_eq!(ids.contains(&task.id), expected);
        }
    }

    /// The same input always yields the same report.
    #[test]
    fn prop_compute_deterministic(input in arb_input()) {
        let policy = EvmPolicy::default();
        prop_assert_eq!(
            EvmCalculator::compute(&input, &policy).unwrap(),
            EvmCalculator::compute(&input, &policy).unwrap()
        );
    }
}
