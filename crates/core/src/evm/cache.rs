//! EVM report caching using Moka.
//!
//! Reports are pure functions of their input and policy, so a report keyed by
//! both can be reused until it expires. Keys are compared by value; a hash
//! collision between two inputs never shares a report.

use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;

use trestle_shared::EvmPolicy;

use super::calculator::EvmCalculator;
use super::error::EvmError;
use super::types::{EvmInput, EvmSnapshot};

/// Default cache capacity (number of reports).
const DEFAULT_CACHE_CAPACITY: u64 = 500;

/// Default time-to-live for cached reports (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

type ReportKey = (EvmInput, EvmPolicy);

/// Cache for computed EVM reports.
#[derive(Clone)]
pub struct EvmReportCache {
    cache: Cache<ReportKey, Arc<EvmSnapshot>>,
}

impl EvmReportCache {
    /// Creates a cache with default settings (500 reports, 5 minute TTL).
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom capacity and time-to-live.
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { cache }
    }

    fn key(input: &EvmInput, policy: &EvmPolicy) -> ReportKey {
        (input.clone(), policy.clone())
    }

    /// Computes a report, returning the cached one if available.
    ///
    /// Invalid inputs are not cached.
    pub fn compute_cached(
        &self,
        input: &EvmInput,
        policy: &EvmPolicy,
    ) -> Result<Arc<EvmSnapshot>, EvmError> {
        let key = Self::key(input, policy);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }

        let report = Arc::new(EvmCalculator::compute(input, policy)?);
        self.cache.insert(key, Arc::clone(&report));
        Ok(report)
    }

    /// Returns true if a report for this input is cached.
    #[must_use]
    pub fn contains(&self, input: &EvmInput, policy: &EvmPolicy) -> bool {
        self.cache.contains_key(&Self::key(input, policy))
    }

    /// Invalidates the report for one input.
    pub fn invalidate(&self, input: &EvmInput, policy: &EvmPolicy) {
        self.cache.invalidate(&Self::key(input, policy));
    }

    /// Invalidates all cached reports.
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Returns the number of reports currently in the cache.
    ///
    /// Moka updates this lazily; call [`Self::run_pending_tasks`] first for an
    /// exact figure.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending cache maintenance.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for EvmReportCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evm::types::{Priority, TaskSnapshot};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use trestle_shared::types::{ProjectId, TaskId};

    fn input(progress: rust_decimal::Decimal) -> EvmInput {
        EvmInput {
            project_id: ProjectId::new(),
            as_of: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            tasks: vec![TaskSnapshot {
                id: TaskId::new(),
                name: "Foundations".to_string(),
                planned_cost: dec!(600000),
                planned_start: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
                planned_end: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
                actual_progress: progress,
                priority: Priority::High,
                actual_cost: dec!(400000),
            }],
            history: vec![],
        }
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let cache = EvmReportCache::new();
        let policy = EvmPolicy::default();
        let input = input(dec!(0.6));

        assert!(!cache.contains(&input, &policy));
        let first = cache.compute_cached(&input, &policy).unwrap();
        assert!(cache.contains(&input, &policy));
        let second = cache.compute_cached(&input, &policy).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_different_input_not_shared() {
        let cache = EvmReportCache::new();
        let policy = EvmPolicy::default();
        let a = input(dec!(0.6));
        let mut b = a.clone();
        b.tasks[0].actual_progress = dec!(0.7);

        let ra = cache.compute_cached(&a, &policy).unwrap();
        let rb = cache.compute_cached(&b, &policy).unwrap();
        assert_ne!(ra.metrics.ev, rb.metrics.ev);
    }

    #[test]
    fn test_policy_is_part_of_key() {
        let cache = EvmReportCache::new();
        let policy = EvmPolicy::default();
        let other = EvmPolicy {
            scenario_offset: dec!(0.2),
            ..EvmPolicy::default()
        };
        let input = input(dec!(0.6));

        let a = cache.compute_cached(&input, &policy).unwrap();
        assert!(!cache.contains(&input, &other));
        let b = cache.compute_cached(&input, &other).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.forecast.optimistic, b.forecast.optimistic);
    }

    #[test]
    fn test_reports_are_never_shared_across_projects() {
        let cache = EvmReportCache::new();
        let policy = EvmPolicy::default();
        let first = input(dec!(0.6));
        let mut second = first.clone();
        second.project_id = ProjectId::new();

        let a = cache.compute_cached(&first, &policy).unwrap();
        let b = cache.compute_cached(&second, &policy).unwrap();

        assert_eq!(a.project_id, first.project_id);
        assert_eq!(b.project_id, second.project_id);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(a.metrics, b.metrics);
    }

    #[test]
    fn test_invalid_input_not_cached() {
        let cache = EvmReportCache::new();
        let policy = EvmPolicy::default();
        let bad = input(dec!(1.5));

        let err = cache.compute_cached(&bad, &policy).unwrap_err();
        assert_eq!(err.error_code(), "PROGRESS_OUT_OF_RANGE");
        assert!(!cache.contains(&bad, &policy));
    }

    #[test]
    fn test_invalidate() {
        let cache = EvmReportCache::new();
        let policy = EvmPolicy::default();
        let input = input(dec!(0.6));

        cache.compute_cached(&input, &policy).unwrap();
        cache.invalidate(&input, &policy);
        assert!(!cache.contains(&input, &policy));

        cache.compute_cached(&input, &policy).unwrap();
        cache.invalidate_all();
        cache.run_pending_tasks();
        assert_eq!(cache.entry_count(), 0);
    }
}
