//! Reversal builder for voiding posted entries.
//!
//! A posted entry is never edited; it is cancelled by a reversing entry whose
//! lines are the originals with debit and credit exchanged.

use chrono::NaiveDate;
use trestle_shared::types::{JournalEntryId, UserId};

use crate::ledger::{CreateEntryInput, JournalEntry, JournalLine};
use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;

/// What the storage layer needs to create and post a reversing entry.
#[derive(Debug, Clone)]
pub struct ReversalPlan {
    /// The entry being voided.
    pub original_id: JournalEntryId,
    /// Input for the reversing entry.
    pub input: CreateEntryInput,
    /// Normalised void reason.
    pub reason: String,
}

/// Stateless service for building reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Builds the reversing entry for `original`.
    ///
    /// - every line has debit and credit swapped, account and memo unchanged
    /// - the description is `Reversal of {entryNumber}: {reason}`
    /// - the date defaults to `today`
    ///
    /// Fails with the same errors as voiding: the original must be Posted and
    /// the reason non-blank.
    pub fn build(
        original: &JournalEntry,
        reason: &str,
        voided_by: UserId,
        date: NaiveDate,
    ) -> Result<ReversalPlan, WorkflowError> {
        WorkflowService::void(original.status, voided_by, reason.to_string())?;
        let reason = reason.trim().to_string();

        let lines = original.lines.iter().map(JournalLine::swapped).collect();

        Ok(ReversalPlan {
            original_id: original.id,
            input: CreateEntryInput {
                date,
                description: Self::description(&original.entry_number, &reason),
                lines,
                created_by: voided_by,
            },
            reason,
        })
    }

    /// Description of a reversing entry.
    #[must_use]
    pub fn description(entry_number: &str, reason: &str) -> String {
        format!("Reversal of {entry_number}: {reason}")
    }

    /// True if `reversal` is line-for-line the swap of `original`.
    #[must_use]
    pub fn is_exact_reversal(original: &[JournalLine], reversal: &[JournalLine]) -> bool {
        original.len() == reversal.len()
            && original
                .iter()
                .zip(reversal)
                .all(|(o, r)| o.swapped() == *r)
    }
}
