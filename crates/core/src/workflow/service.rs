//! Workflow service for journal entry state transitions.
//!
//! This module implements the core state machine logic for
//! moving journal entries through the approval workflow.

use chrono::Utc;
use trestle_shared::types::UserId;

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{EntryStatus, WorkflowAction};

/// Stateless service for managing entry workflow transitions.
///
/// All methods are associated functions that validate a transition
/// against the status table and return the `WorkflowAction` to persist.
pub struct WorkflowService;

impl WorkflowService {
    /// Submit a draft entry for approval.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Submit)` if the entry is in Draft
    /// * `Err(WorkflowError::InvalidTransition)` otherwise
    pub fn submit(
        current_status: EntryStatus,
        submitted_by: UserId,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure_transition(current_status, EntryStatus::PendingApproval)?;
        Ok(WorkflowAction::Submit {
            new_status: EntryStatus::PendingApproval,
            submitted_by,
            submitted_at: Utc::now(),
        })
    }

    /// Approve a pending entry.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Approve)` if the entry is in PendingApproval
    /// * `Err(WorkflowError::InvalidTransition)` otherwise
    pub fn approve(
        current_status: EntryStatus,
        approved_by: UserId,
        approval_notes: Option<String>,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure_transition(current_status, EntryStatus::Approved)?;
        Ok(WorkflowAction::Approve {
            new_status: EntryStatus::Approved,
            approved_by,
            approved_at: Utc::now(),
            approval_notes,
        })
    }

    /// Post an entry to the ledger.
    ///
    /// Allowed from Approved, and directly from Draft.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Post)` if the transition is valid
    /// * `Err(WorkflowError::InvalidTransition)` otherwise, including when
    ///   the entry is already Posted
    pub fn post(
        current_status: EntryStatus,
        posted_by: UserId,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure_transition(current_status, EntryStatus::Posted)?;
        Ok(WorkflowAction::Post {
            from_status: current_status,
            new_status: EntryStatus::Posted,
            posted_by,
            posted_at: Utc::now(),
        })
    }

    /// Void a posted entry.
    ///
    /// # Returns
    /// * `Ok(WorkflowAction::Void)` if the entry is Posted
    /// * `Err(WorkflowError::InvalidTransition)` if not Posted (including already Void)
    /// * `Err(WorkflowError::VoidReasonRequired)` if the reason is blank
    pub fn void(
        current_status: EntryStatus,
        voided_by: UserId,
        void_reason: String,
    ) -> Result<WorkflowAction, WorkflowError> {
        Self::ensure_transition(current_status, EntryStatus::Void)?;
        let void_reason = void_reason.trim().to_string();
        if void_reason.is_empty() {
            return Err(WorkflowError::VoidReasonRequired);
        }

        Ok(WorkflowAction::Void {
            new_status: EntryStatus::Void,
            voided_by,
            voided_at: Utc::now(),
            void_reason,
        })
    }

    /// Check that the entry's content may still be edited.
    pub fn ensure_editable(current_status: EntryStatus) -> Result<(), WorkflowError> {
        if current_status.is_editable() {
            Ok(())
        } else {
            Err(WorkflowError::EntryAlreadyPosted {
                status: current_status,
            })
        }
    }

    /// Check that the entry may be deleted.
    pub fn ensure_deletable(current_status: EntryStatus) -> Result<(), WorkflowError> {
        match current_status {
            EntryStatus::Draft => Ok(()),
            EntryStatus::Posted | EntryStatus::Void => Err(WorkflowError::EntryAlreadyPosted {
                status: current_status,
            }),
            EntryStatus::PendingApproval | EntryStatus::Approved => {
                Err(WorkflowError::CanOnlyDeleteDraft {
                    status: current_status,
                })
            }
        }
    }

    /// Check if a status transition is valid.
    #[must_use]
    pub fn is_valid_transition(from: EntryStatus, to: EntryStatus) -> bool {
        from.can_transition_to(to)
    }

    fn ensure_transition(from: EntryStatus, to: EntryStatus) -> Result<(), WorkflowError> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidTransition { from, to })
        }
    }
}
