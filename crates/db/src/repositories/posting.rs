//! Applies a posting inside the caller's transaction.
//!
//! The order is fixed: read the accounts and build the plan, flip the status
//! with the guarded write, then apply the deltas in account id order. Each
//! balance write is checked against the account version read at the start,
//! so a posting that lands in between surfaces as `CONCURRENT_MODIFICATION`.
//! The caller commits, or rolls back on any error.

use sea_orm::DatabaseTransaction;

use trestle_core::ledger::{JournalEntry, LedgerError, PostingPlan};
use trestle_core::workflow::WorkflowAction;
use trestle_shared::types::AccountId;

use super::account::{apply_delta, load_accounts};
use super::mutation::system_status_mutation;

/// Posts `entry` within `txn`.
///
/// `action` must be the `Post` action produced by the workflow service for
/// the entry's current status.
///
/// # Errors
///
/// - `ACCOUNT_NOT_FOUND` before anything is written
/// - `INVALID_TRANSITION` if the entry was posted concurrently
/// - `CONCURRENT_MODIFICATION` if an account changed under us
/// - `POSTING_PARTIAL_FAILURE` for any other failure after the first delta
pub(crate) async fn apply(
    txn: &DatabaseTransaction,
    entry: &JournalEntry,
    action: &WorkflowAction,
) -> Result<PostingPlan, LedgerError> {
    let WorkflowAction::Post { from_status, .. } = action else {
        return Err(LedgerError::Storage(format!(
            "posting requires a post action, got {:?}",
            action.new_status()
        )));
    };

    let mut ids: Vec<AccountId> = entry.lines.iter().map(|l| l.account_id).collect();
    ids.sort_unstable();
    ids.dedup();
    let accounts = load_accounts(txn, &ids).await?;
    let plan = PostingPlan::build(entry.id, &entry.lines, |id| {
        accounts.get(&id).map(|row| row.account_type.into())
    })?;

    system_status_mutation(txn, entry.id, *from_status, action, None).await?;

    for (index, delta) in plan.deltas.iter().enumerate() {
        let applied = match accounts.get(&delta.account_id) {
            Some(read) => apply_delta(txn, delta, read).await,
            None => Err(LedgerError::AccountNotFound(delta.account_id)),
        };
        if let Err(e) = applied {
            return Err(match e {
                LedgerError::ConcurrentModification { .. } => e,
                _ if index == 0 => e,
                _ => LedgerError::PostingPartialFailure {
                    entry_id: entry.id,
                    account_id: delta.account_id,
                    reason: e.to_string(),
                },
            });
        }
    }

    Ok(plan)
}
