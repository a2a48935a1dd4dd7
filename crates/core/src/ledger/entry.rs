//! Journal entry and journal line domain types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trestle_shared::types::{AccountId, JournalEntryId, UserId};

use super::error::LedgerError;
use super::types::{CreateEntryInput, EntryTotals, UpdateEntryInput};
use super::validation::validate;
use crate::workflow::{EntryStatus, WorkflowAction, WorkflowService};

/// A single debit or credit line of a journal entry.
///
/// Exactly one of `debit`/`credit` is expected to be non-zero; the
/// validation engine enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// The account this line posts to.
    pub account_id: AccountId,
    /// Debit amount (>= 0).
    pub debit: Decimal,
    /// Credit amount (>= 0).
    pub credit: Decimal,
    /// Optional line memo.
    pub description: Option<String>,
}

impl JournalLine {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
        }
    }

    /// Sets the line memo.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True if both sides carry a positive amount.
    #[must_use]
    pub fn is_dual_posting(&self) -> bool {
        self.debit > Decimal::ZERO && self.credit > Decimal::ZERO
    }

    /// True if either side is negative.
    #[must_use]
    pub fn has_negative_amount(&self) -> bool {
        self.debit < Decimal::ZERO || self.credit < Decimal::ZERO
    }

    /// Debit minus credit.
    #[must_use]
    pub fn net(&self) -> Decimal {
        self.debit - self.credit
    }

    /// Returns the line with debit and credit exchanged.
    #[must_use]
    pub fn swapped(&self) -> Self {
        Self {
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
            description: self.description.clone(),
        }
    }
}

/// A journal entry with its ordered lines and workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Human-readable number, `JE-{year}-{seq:04}`.
    pub entry_number: String,
    /// Accounting date.
    pub date: NaiveDate,
    /// What the entry records.
    pub description: String,
    /// Ordered lines.
    pub lines: Vec<JournalLine>,
    /// Sum of debit amounts.
    pub total_debit: Decimal,
    /// Sum of credit amounts.
    pub total_credit: Decimal,
    /// Current workflow status.
    pub status: EntryStatus,
    /// Creator.
    pub created_by: UserId,
    /// Submitter, once submitted.
    pub submitted_by: Option<UserId>,
    /// Approver, once approved.
    pub approved_by: Option<UserId>,
    /// Poster, once posted.
    pub posted_by: Option<UserId>,
    /// Voider, once voided.
    pub voided_by: Option<UserId>,
    /// Notes left by the approver.
    pub approval_notes: Option<String>,
    /// Reason given when voiding.
    pub void_reason: Option<String>,
    /// The reversing entry created when this entry was voided.
    pub reversing_entry_id: Option<JournalEntryId>,
    /// The entry this one reverses, if it is a reversing entry.
    pub reverses_entry_id: Option<JournalEntryId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
    /// Submission time.
    pub submitted_at: Option<DateTime<Utc>>,
    /// Approval time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Posting time.
    pub posted_at: Option<DateTime<Utc>>,
    /// Void time.
    pub voided_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// Builds a validated Draft entry from creation input.
    pub fn new_draft(
        id: JournalEntryId,
        entry_number: String,
        input: CreateEntryInput,
        now: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        let totals = validate(&input.lines)?;

        Ok(Self {
            id,
            entry_number,
            date: input.date,
            description: input.description,
            lines: input.lines,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            status: EntryStatus::Draft,
            created_by: input.created_by,
            submitted_by: None,
            approved_by: None,
            posted_by: None,
            voided_by: None,
            approval_notes: None,
            void_reason: None,
            reversing_entry_id: None,
            reverses_entry_id: None,
            created_at: now,
            updated_at: now,
            submitted_at: None,
            approved_at: None,
            posted_at: None,
            voided_at: None,
        })
    }

    /// Returns the stored totals.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        EntryTotals {
            total_debit: self.total_debit,
            total_credit: self.total_credit,
        }
    }

    /// Re-runs validation over the stored lines.
    pub fn revalidate(&self) -> Result<EntryTotals, LedgerError> {
        Ok(validate(&self.lines)?)
    }

    /// Applies a user-facing edit.
    ///
    /// Rejected once the entry is Posted or Void. When the lines change they are
    /// validated and the totals recomputed. The status is left as is.
    ///
    /// The entry number is fixed at creation. Moving the date into another
    /// year keeps the number, and its year, that the entry was created with.
    pub fn apply_update(
        &mut self,
        patch: UpdateEntryInput,
        now: DateTime<Utc>,
    ) -> Result<(), LedgerError> {
        WorkflowService::ensure_editable(self.status)?;

        if let Some(lines) = patch.lines {
            let totals = validate(&lines)?;
            self.lines = lines;
            self.total_debit = totals.total_debit;
            self.total_credit = totals.total_credit;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Records a workflow transition on the entry.
    pub fn apply_action(&mut self, action: &WorkflowAction) {
        match action {
            WorkflowAction::Submit {
                submitted_by,
                submitted_at,
                ..
            } => {
                self.submitted_by = Some(*submitted_by);
                self.submitted_at = Some(*submitted_at);
                self.updated_at = *submitted_at;
            }
            WorkflowAction::Approve {
                approved_by,
                approved_at,
                approval_notes,
                ..
            } => {
                self.approved_by = Some(*approved_by);
                self.approved_at = Some(*approved_at);
                self.approval_notes.clone_from(approval_notes);
                self.updated_at = *approved_at;
            }
            WorkflowAction::Post {
                posted_by,
                posted_at,
                ..
            } => {
                self.posted_by = Some(*posted_by);
                self.posted_at = Some(*posted_at);
                self.updated_at = *posted_at;
            }
            WorkflowAction::Void {
                voided_by,
                voided_at,
                void_reason,
                ..
            } => {
                self.voided_by = Some(*voided_by);
                self.voided_at = Some(*voided_at);
                self.void_reason = Some(void_reason.clone());
                self.updated_at = *voided_at;
            }
        }
        self.status = action.new_status();
    }
}
