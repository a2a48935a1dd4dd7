//! Retry and timeout policy for storage calls.
//!
//! Only reads and idempotent writes go through [`with_retry`]. A mutation that
//! may have partially applied is rolled back and surfaced, never retried here.

use std::future::Future;

use sea_orm::{DbErr, SqlErr};
use tracing::warn;

use trestle_core::ledger::LedgerError;
use trestle_shared::ResilienceConfig;

/// Maps a storage error onto the ledger taxonomy.
///
/// Connection and pool failures are transient; everything else is internal.
pub fn storage_error(err: DbErr) -> LedgerError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => LedgerError::Transient(err.to_string()),
        other => LedgerError::Storage(other.to_string()),
    }
}

/// Returns true if the error is a unique constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the configured attempts are used up.
pub async fn with_retry<T, F, Fut>(
    config: &ResilienceConfig,
    name: &'static str,
    mut operation: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let backoff = config.backoff_after(attempt);
                warn!(
                    operation = name,
                    attempt,
                    backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Retrying storage operation"
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Bounds `operation` by the configured deadline.
///
/// On expiry the future is dropped, which rolls back any transaction it held,
/// and a retryable `TIMEOUT` is returned.
pub async fn with_timeout<T, Fut>(config: &ResilienceConfig, operation: Fut) -> Result<T, LedgerError>
where
    Fut: Future<Output = Result<T, LedgerError>>,
{
    tokio::time::timeout(config.operation_timeout(), operation)
        .await
        .map_err(|_| LedgerError::Timeout {
            seconds: config.operation_timeout_secs,
        })?
}
