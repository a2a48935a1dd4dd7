//! Workflow error types for journal entry lifecycle management.

use thiserror::Error;

use crate::workflow::types::EntryStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: EntryStatus,
        /// The attempted target status.
        to: EntryStatus,
    },

    /// Attempted to edit or delete a Posted or Void entry.
    #[error("Journal entry is already {status} and cannot be modified")]
    EntryAlreadyPosted {
        /// The entry's current status.
        status: EntryStatus,
    },

    /// Attempted to delete an entry that is past Draft but not yet posted.
    #[error("Only draft entries can be deleted, entry is {status}")]
    CanOnlyDeleteDraft {
        /// The entry's current status.
        status: EntryStatus,
    },

    /// Void reason is required but not provided.
    #[error("Void reason is required")]
    VoidReasonRequired,
}

impl WorkflowError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::EntryAlreadyPosted { .. } => "ENTRY_ALREADY_POSTED",
            Self::CanOnlyDeleteDraft { .. } => "CAN_ONLY_DELETE_DRAFT",
            Self::VoidReasonRequired => "VOID_REASON_REQUIRED",
        }
    }
}
