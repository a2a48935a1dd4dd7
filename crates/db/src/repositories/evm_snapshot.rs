//! Append-only log of EVM snapshots.
//!
//! A snapshot is written once and never updated or deleted. The CPI/SPI of
//! earlier snapshots is the trend history for later ones.

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use trestle_core::evm::{
    EvmError, EvmInput, EvmMetrics, EvmReportCache, EvmSnapshot, PerformancePoint,
    PerformanceStatus,
};
use trestle_core::ledger::LedgerError;
use trestle_shared::types::{ProjectId, SnapshotId};
use trestle_shared::{EvmPolicy, ResilienceConfig};

use crate::entities::evm_snapshots;
use crate::resilience::{is_unique_violation, storage_error, with_retry, with_timeout};

use super::parse_decimal;

/// Errors from the snapshot log.
#[derive(Debug, Error)]
pub enum EvmStoreError {
    /// The input could not be evaluated.
    #[error(transparent)]
    Evm(#[from] EvmError),

    /// Storage failed.
    #[error(transparent)]
    Storage(#[from] LedgerError),

    /// The project already has a snapshot for that date.
    #[error("Snapshot for project {project_id} as of {as_of} already recorded")]
    DuplicateSnapshot {
        /// The project.
        project_id: ProjectId,
        /// The measurement date.
        as_of: NaiveDate,
    },
}

impl EvmStoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Evm(e) => e.error_code(),
            Self::Storage(e) => e.error_code(),
            Self::DuplicateSnapshot { .. } => "DUPLICATE_SNAPSHOT",
        }
    }
}

/// A snapshot as stored in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSnapshot {
    /// Log row id.
    pub id: SnapshotId,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
    /// The report.
    pub snapshot: EvmSnapshot,
}

/// Repository for the EVM snapshot log.
#[derive(Clone)]
pub struct EvmSnapshotRepository {
    db: DatabaseConnection,
    resilience: ResilienceConfig,
    policy: EvmPolicy,
    cache: EvmReportCache,
}

impl EvmSnapshotRepository {
    /// Creates a repository using the default EVM policy.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            resilience: ResilienceConfig::default(),
            policy: EvmPolicy::default(),
            cache: EvmReportCache::new(),
        }
    }

    /// Replaces the EVM policy.
    #[must_use]
    pub fn with_policy(mut self, policy: EvmPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the retry and timeout policy.
    #[must_use]
    pub fn with_resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }

    /// Computes the report for `input` with the logged history as trend
    /// input, then appends it.
    ///
    /// History points passed in `input` are merged with the log; the log wins
    /// for a date present in both.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid, the date is already logged,
    /// or storage fails.
    pub async fn record(&self, mut input: EvmInput) -> Result<StoredSnapshot, EvmStoreError> {
        let logged = self.history(input.project_id, input.as_of).await?;
        input
            .history
            .retain(|p| !logged.iter().any(|l| l.as_of == p.as_of));
        input.history.extend(logged);
        input.history.sort_by_key(|p| p.as_of);

        let report = self.cache.compute_cached(&input, &self.policy)?;
        let stored = self.append(&report).await?;

        info!(
            project_id = %stored.snapshot.project_id,
            as_of = %stored.snapshot.as_of,
            status = stored.snapshot.performance_status.as_str(),
            health_score = %stored.snapshot.health_score,
            "EVM snapshot recorded"
        );
        Ok(stored)
    }

    /// Appends a computed snapshot.
    ///
    /// # Errors
    ///
    /// Returns `DUPLICATE_SNAPSHOT` if the project already has a snapshot for
    /// that date.
    pub async fn append(&self, snapshot: &EvmSnapshot) -> Result<StoredSnapshot, EvmStoreError> {
        let model = to_active_model(SnapshotId::new(), snapshot, Utc::now())?;

        let row = self
            .bounded(async {
                match model.insert(&self.db).await {
                    Ok(row) => Ok(row),
                    Err(e) if is_unique_violation(&e) => Err(EvmStoreError::DuplicateSnapshot {
                        project_id: snapshot.project_id,
                        as_of: snapshot.as_of,
                    }),
                    Err(e) => Err(storage_error(e).into()),
                }
            })
            .await?;

        Ok(from_model(row)?)
    }

    /// CPI/SPI points logged for a project strictly before `before`, oldest first.
    pub async fn history(
        &self,
        project_id: ProjectId,
        before: NaiveDate,
    ) -> Result<Vec<PerformancePoint>, EvmStoreError> {
        let points = with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "evm_history", || async {
                evm_snapshots::Entity::find()
                    .filter(evm_snapshots::Column::ProjectId.eq(project_id.into_inner()))
                    .filter(evm_snapshots::Column::AsOf.lt(before))
                    .order_by_asc(evm_snapshots::Column::AsOf)
                    .all(&self.db)
                    .await
                    .map_err(storage_error)?
                    .into_iter()
                    .map(|row| {
                        Ok(PerformancePoint {
                            as_of: row.as_of,
                            cpi: parse_decimal("evm_snapshots.cpi", &row.cpi)?,
                            spi: parse_decimal("evm_snapshots.spi", &row.spi)?,
                        })
                    })
                    .collect::<Result<Vec<_>, LedgerError>>()
            }),
        )
        .await?;
        Ok(points)
    }

    /// All snapshots logged for a project, oldest first.
    pub async fn snapshots(&self, project_id: ProjectId) -> Result<Vec<StoredSnapshot>, EvmStoreError> {
        let rows = with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "evm_snapshots", || async {
                evm_snapshots::Entity::find()
                    .filter(evm_snapshots::Column::ProjectId.eq(project_id.into_inner()))
                    .order_by_asc(evm_snapshots::Column::AsOf)
                    .all(&self.db)
                    .await
                    .map_err(storage_error)
            }),
        )
        .await?;

        rows.into_iter()
            .map(|row| from_model(row).map_err(EvmStoreError::from))
            .collect()
    }

    async fn bounded<T, Fut>(&self, operation: Fut) -> Result<T, EvmStoreError>
    where
        Fut: Future<Output = Result<T, EvmStoreError>>,
    {
        with_timeout(&self.resilience, async { Ok(operation.await) }).await?
    }
}

fn corrupt(column: &str, reason: impl std::fmt::Display) -> LedgerError {
    LedgerError::Storage(format!("unreadable {column}: {reason}"))
}

fn to_active_model(
    id: SnapshotId,
    snapshot: &EvmSnapshot,
    recorded_at: DateTime<Utc>,
) -> Result<evm_snapshots::ActiveModel, LedgerError> {
    let m = &snapshot.metrics;
    let forecast = serde_json::to_string(&snapshot.forecast)
        .map_err(|e| corrupt("evm_snapshots.forecast", e))?;
    let critical_tasks = serde_json::to_string(&snapshot.critical_tasks)
        .map_err(|e| corrupt("evm_snapshots.critical_tasks", e))?;

    Ok(evm_snapshots::ActiveModel {
        id: Set(id.into_inner()),
        project_id: Set(snapshot.project_id.into_inner()),
        as_of: Set(snapshot.as_of),
        bac: Set(m.bac.to_string()),
        pv: Set(m.pv.to_string()),
        ev: Set(m.ev.to_string()),
        ac: Set(m.ac.to_string()),
        cpi: Set(m.cpi.to_string()),
        spi: Set(m.spi.to_string()),
        cv: Set(m.cv.to_string()),
        sv: Set(m.sv.to_string()),
        eac: Set(m.eac.to_string()),
        etc: Set(m.etc.to_string()),
        vac: Set(m.vac.to_string()),
        tcpi: Set(m.tcpi.map(|v| v.to_string())),
        performance_status: Set(snapshot.performance_status.as_str().to_string()),
        health_score: Set(snapshot.health_score.to_string()),
        forecast_cost: Set(snapshot.forecast_cost.to_string()),
        forecast_date: Set(snapshot.forecast_date),
        forecast: Set(forecast),
        confidence_level: Set(snapshot.confidence_level.to_string()),
        critical_tasks: Set(critical_tasks),
        recorded_at: Set(recorded_at),
    })
}

fn from_model(row: evm_snapshots::Model) -> Result<StoredSnapshot, LedgerError> {
    let metrics = EvmMetrics {
        bac: parse_decimal("evm_snapshots.bac", &row.bac)?,
        pv: parse_decimal("evm_snapshots.pv", &row.pv)?,
        ev: parse_decimal("evm_snapshots.ev", &row.ev)?,
        ac: parse_decimal("evm_snapshots.ac", &row.ac)?,
        cpi: parse_decimal("evm_snapshots.cpi", &row.cpi)?,
        spi: parse_decimal("evm_snapshots.spi", &row.spi)?,
        cv: parse_decimal("evm_snapshots.cv", &row.cv)?,
        sv: parse_decimal("evm_snapshots.sv", &row.sv)?,
        eac: parse_decimal("evm_snapshots.eac", &row.eac)?,
        etc: parse_decimal("evm_snapshots.etc", &row.etc)?,
        vac: parse_decimal("evm_snapshots.vac", &row.vac)?,
        tcpi: row
            .tcpi
            .as_deref()
            .map(|v| parse_decimal("evm_snapshots.tcpi", v))
            .transpose()?,
    };

    let performance_status = PerformanceStatus::parse(&row.performance_status)
        .ok_or_else(|| corrupt("evm_snapshots.performance_status", &row.performance_status))?;

    Ok(StoredSnapshot {
        id: SnapshotId::from_uuid(row.id),
        recorded_at: row.recorded_at,
        snapshot: EvmSnapshot {
            project_id: ProjectId::from_uuid(row.project_id),
            as_of: row.as_of,
            metrics,
            performance_status,
            health_score: parse_decimal("evm_snapshots.health_score", &row.health_score)?,
            forecast_cost: parse_decimal("evm_snapshots.forecast_cost", &row.forecast_cost)?,
            forecast_date: row.forecast_date,
            forecast: serde_json::from_str(&row.forecast)
                .map_err(|e| corrupt("evm_snapshots.forecast", e))?,
            confidence_level: parse_decimal(
                "evm_snapshots.confidence_level",
                &row.confidence_level,
            )?,
            critical_tasks: serde_json::from_str(&row.critical_tasks)
                .map_err(|e| corrupt("evm_snapshots.critical_tasks", e))?,
        },
    })
}
