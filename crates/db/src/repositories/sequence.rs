//! Entry number allocation.
//!
//! Each period key has one counter row in `entry_sequences`. A number is taken
//! by a version-guarded compare-and-swap in its own short transaction, so two
//! allocators never hand out the same number and a lost race simply retries.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use tracing::debug;

use trestle_core::ledger::LedgerError;
use trestle_shared::ResilienceConfig;

use crate::entities::entry_sequences;
use crate::resilience::{is_unique_violation, storage_error, with_retry, with_timeout};

/// Compare-and-swap attempts before a contended allocation gives up.
const MAX_CAS_ATTEMPTS: u32 = 16;

/// Persistent counters backing entry numbers.
#[derive(Debug, Clone)]
pub struct SequenceRepository {
    db: DatabaseConnection,
    resilience: ResilienceConfig,
}

impl SequenceRepository {
    /// Creates a new sequence repository.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            resilience: ResilienceConfig::default(),
        }
    }

    /// Replaces the retry and timeout policy.
    #[must_use]
    pub fn with_resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }

    /// Allocates the next number for `period_key`, starting at 1.
    ///
    /// # Errors
    ///
    /// Returns a transient error if the counter stays contended for every
    /// attempt.
    pub async fn next(&self, period_key: &str) -> Result<i64, LedgerError> {
        with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "allocate_entry_number", || {
                self.allocate(period_key)
            }),
        )
        .await
    }

    /// Returns the last number handed out for `period_key`, if any.
    pub async fn current(&self, period_key: &str) -> Result<Option<i64>, LedgerError> {
        with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "read_entry_sequence", || async {
                Ok::<_, LedgerError>(entry_sequences::Entity::find_by_id(period_key.to_string())
                    .one(&self.db)
                    .await
                    .map_err(storage_error)?
                    .map(|row| row.last_value))
            }),
        )
        .await
    }

    async fn allocate(&self, period_key: &str) -> Result<i64, LedgerError> {
        for attempt in 1..=MAX_CAS_ATTEMPTS {
            if let Some(value) = self.compare_and_swap(period_key).await? {
                return Ok(value);
            }
            debug!(period_key, attempt, "Entry sequence contended");
        }
        Err(LedgerError::Transient(format!(
            "entry sequence {period_key} contended"
        )))
    }

    /// One allocation attempt. `None` means another allocator got there first.
    async fn compare_and_swap(&self, period_key: &str) -> Result<Option<i64>, LedgerError> {
        let txn = self.db.begin().await.map_err(storage_error)?;

        let current = entry_sequences::Entity::find_by_id(period_key.to_string())
            .one(&txn)
            .await
            .map_err(storage_error)?;

        let allocated = match current {
            None => {
                let first = entry_sequences::ActiveModel {
                    period_key: Set(period_key.to_string()),
                    last_value: Set(1),
                    version: Set(1),
                };
                match first.insert(&txn).await {
                    Ok(row) => row.last_value,
                    Err(e) if is_unique_violation(&e) => return Ok(None),
                    Err(e) => return Err(storage_error(e)),
                }
            }
            Some(row) => {
                let next = row.last_value + 1;
                let result = entry_sequences::Entity::update_many()
                    .set(entry_sequences::ActiveModel {
                        last_value: Set(next),
                        version: Set(row.version + 1),
                        ..Default::default()
                    })
                    .filter(entry_sequences::Column::PeriodKey.eq(period_key))
                    .filter(entry_sequences::Column::Version.eq(row.version))
                    .exec(&txn)
                    .await
                    .map_err(storage_error)?;
                if result.rows_affected == 0 {
                    return Ok(None);
                }
                next
            }
        };

        txn.commit().await.map_err(storage_error)?;
        Ok(Some(allocated))
    }
}
