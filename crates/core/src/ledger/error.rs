//! Ledger error taxonomy.
//!
//! Every failure a ledger operation can surface is a `LedgerError`. Each
//! variant carries a stable code and belongs to one `ErrorKind`, which tells
//! the caller whether to render it, retry it, or fail fast.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use trestle_shared::Envelope;
use trestle_shared::types::{AccountId, JournalEntryId};

use super::validation::ValidationError;
use crate::workflow::WorkflowError;

/// Broad error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The proposed entry breaks a double-entry rule.
    Validation,
    /// The entry or account is in the wrong state, or does not exist.
    State,
    /// A posting failed after balances started to change.
    Integrity,
    /// Storage contention, connectivity or timeout; safe to retry.
    Transient,
    /// Unexpected storage failure.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// The proposed lines are invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ========== State Errors ==========
    /// The workflow rejected the transition.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Another account already uses this number.
    #[error("Account number '{0}' already exists")]
    DuplicateAccountNumber(String),

    // ========== Integrity Errors ==========
    /// Posting failed after the first balance delta; the transaction was rolled back.
    #[error("Posting of entry {entry_id} failed at account {account_id}: {reason}")]
    PostingPartialFailure {
        /// The entry being posted.
        entry_id: JournalEntryId,
        /// The account whose update failed.
        account_id: AccountId,
        /// Underlying cause.
        reason: String,
    },

    // ========== Transient Errors ==========
    /// An account changed between read and write.
    #[error("Concurrent modification of account {account_id}, please retry")]
    ConcurrentModification {
        /// The contended account.
        account_id: AccountId,
    },

    /// Storage temporarily unavailable.
    #[error("Transient storage error: {0}")]
    Transient(String),

    /// The operation exceeded its time budget.
    #[error("Operation timed out after {seconds}s")]
    Timeout {
        /// The configured budget.
        seconds: u64,
    },

    // ========== Internal Errors ==========
    /// Unexpected storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Workflow(e) => e.error_code(),
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::DuplicateAccountNumber(_) => "DUPLICATE_ACCOUNT_NUMBER",
            Self::PostingPartialFailure { .. } => "POSTING_PARTIAL_FAILURE",
            Self::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Self::Transient(_) => "TRANSIENT_STORAGE_ERROR",
            Self::Timeout { .. } => "TIMEOUT",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Workflow(_)
            | Self::EntryNotFound(_)
            | Self::AccountNotFound(_)
            | Self::DuplicateAccountNumber(_) => ErrorKind::State,
            Self::PostingPartialFailure { .. } => ErrorKind::Integrity,
            Self::ConcurrentModification { .. } | Self::Transient(_) | Self::Timeout { .. } => {
                ErrorKind::Transient
            }
            Self::Storage(_) => ErrorKind::Internal,
        }
    }

    /// Returns true if retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Returns true if the ledger may need operator attention.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Integrity
    }

    /// Renders the error as a failure envelope.
    #[must_use]
    pub fn to_envelope<T>(&self) -> Envelope<T> {
        Envelope::failure(self.error_code(), self.to_string())
    }
}
