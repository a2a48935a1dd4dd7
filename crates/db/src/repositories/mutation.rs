//! System-owned status changes on journal entries.
//!
//! Workflow fields (status, actors, timestamps, void reason and the reversing
//! entry link) are written only here. The user-facing update path in
//! `journal` writes content fields and never reaches this module.

use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QuerySelect, Set};

use trestle_core::ledger::LedgerError;
use trestle_core::workflow::{EntryStatus, WorkflowAction, WorkflowError};
use trestle_shared::types::JournalEntryId;

use crate::entities::{journal_entries, sea_orm_active_enums};
use crate::resilience::storage_error;

/// Moves an entry from `from` to the status `action` leads to.
///
/// The write is guarded on `status = from`, so of two racing transitions on
/// the same entry exactly one succeeds; the loser gets the error it would have
/// seen had it read the entry after the winner committed.
pub(crate) async fn system_status_mutation<C: ConnectionTrait>(
    conn: &C,
    entry_id: JournalEntryId,
    from: EntryStatus,
    action: &WorkflowAction,
    reversing_entry_id: Option<JournalEntryId>,
) -> Result<(), LedgerError> {
    let mut change = journal_entries::ActiveModel {
        status: Set(action.new_status().into()),
        ..Default::default()
    };

    match action {
        WorkflowAction::Submit {
            submitted_by,
            submitted_at,
            ..
        } => {
            change.submitted_by = Set(Some(submitted_by.into_inner()));
            change.submitted_at = Set(Some(*submitted_at));
            change.updated_at = Set(*submitted_at);
        }
        WorkflowAction::Approve {
            approved_by,
            approved_at,
            approval_notes,
            ..
        } => {
            change.approved_by = Set(Some(approved_by.into_inner()));
            change.approved_at = Set(Some(*approved_at));
            change.approval_notes = Set(approval_notes.clone());
            change.updated_at = Set(*approved_at);
        }
        WorkflowAction::Post {
            posted_by,
            posted_at,
            ..
        } => {
            change.posted_by = Set(Some(posted_by.into_inner()));
            change.posted_at = Set(Some(*posted_at));
            change.updated_at = Set(*posted_at);
        }
        WorkflowAction::Void {
            voided_by,
            voided_at,
            void_reason,
            ..
        } => {
            change.voided_by = Set(Some(voided_by.into_inner()));
            change.voided_at = Set(Some(*voided_at));
            change.void_reason = Set(Some(void_reason.clone()));
            change.reversing_entry_id = Set(reversing_entry_id.map(JournalEntryId::into_inner));
            change.updated_at = Set(*voided_at);
        }
    }

    let result = journal_entries::Entity::update_many()
        .set(change)
        .filter(journal_entries::Column::Id.eq(entry_id.into_inner()))
        .filter(journal_entries::Column::Status.eq(sea_orm_active_enums::EntryStatus::from(from)))
        .exec(conn)
        .await
        .map_err(storage_error)?;

    if result.rows_affected == 0 {
        return Err(lost_transition(conn, entry_id, action.new_status()).await);
    }
    Ok(())
}

/// Reads the current status of an entry without loading its lines.
pub(crate) async fn current_status<C: ConnectionTrait>(
    conn: &C,
    entry_id: JournalEntryId,
) -> Result<Option<EntryStatus>, LedgerError> {
    let status: Option<sea_orm_active_enums::EntryStatus> = journal_entries::Entity::find_by_id(
        entry_id.into_inner(),
    )
    .select_only()
    .column(journal_entries::Column::Status)
    .into_tuple()
    .one(conn)
    .await
    .map_err(storage_error)?;

    Ok(status.map(EntryStatus::from))
}

/// The error for a guarded write that matched no row.
async fn lost_transition<C: ConnectionTrait>(
    conn: &C,
    entry_id: JournalEntryId,
    to: EntryStatus,
) -> LedgerError {
    match current_status(conn, entry_id).await {
        Ok(Some(from)) => WorkflowError::InvalidTransition { from, to }.into(),
        Ok(None) => LedgerError::EntryNotFound(entry_id),
        Err(e) => e,
    }
}
