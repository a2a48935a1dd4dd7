//! Workflow domain types for journal entry lifecycle management.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use trestle_shared::types::UserId;

/// Journal entry status in the approval workflow.
///
/// The valid transitions are:
/// - Draft → PendingApproval (submit)
/// - PendingApproval → Approved (approve)
/// - Approved → Posted (post)
/// - Draft → Posted (post without review)
/// - Posted → Void (void)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryStatus {
    /// Entry is being drafted and can be modified.
    Draft,
    /// Entry has been submitted for approval.
    PendingApproval,
    /// Entry has been approved and is ready for posting.
    Approved,
    /// Entry has been posted to the ledger (immutable).
    Posted,
    /// Entry has been voided by a reversing entry (immutable).
    Void,
}

impl EntryStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Draft,
        Self::PendingApproval,
        Self::Approved,
        Self::Posted,
        Self::Void,
    ];

    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Posted => "posted",
            Self::Void => "void",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "posted" => Some(Self::Posted),
            "void" => Some(Self::Void),
            _ => None,
        }
    }

    /// Returns true if the entry's content can still be edited.
    #[must_use]
    pub fn is_editable(&self) -> bool {
        matches!(self, Self::Draft | Self::PendingApproval | Self::Approved)
    }

    /// Returns true if the entry is immutable.
    #[must_use]
    pub fn is_immutable(&self) -> bool {
        matches!(self, Self::Posted | Self::Void)
    }

    /// The transition table.
    #[must_use]
    pub fn can_transition_to(&self, to: Self) -> bool {
        match self {
            Self::Draft => matches!(to, Self::PendingApproval | Self::Posted),
            Self::PendingApproval => to == Self::Approved,
            Self::Approved => to == Self::Posted,
            Self::Posted => to == Self::Void,
            Self::Void => false,
        }
    }
}

impl fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow action representing a state transition with audit data.
///
/// Each variant captures the action performed, the resulting status,
/// and the audit trail information (who, when, why).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Submit a draft entry for approval.
    Submit {
        /// The new status after submission.
        new_status: EntryStatus,
        /// The user who submitted the entry.
        submitted_by: UserId,
        /// When the entry was submitted.
        submitted_at: DateTime<Utc>,
    },
    /// Approve a pending entry.
    Approve {
        /// The new status after approval.
        new_status: EntryStatus,
        /// The user who approved the entry.
        approved_by: UserId,
        /// When the entry was approved.
        approved_at: DateTime<Utc>,
        /// Optional notes from the approver.
        approval_notes: Option<String>,
    },
    /// Post an entry to the ledger.
    Post {
        /// The status the entry was posted from.
        from_status: EntryStatus,
        /// The new status after posting.
        new_status: EntryStatus,
        /// The user who posted the entry.
        posted_by: UserId,
        /// When the entry was posted.
        posted_at: DateTime<Utc>,
    },
    /// Void a posted entry.
    Void {
        /// The new status after voiding.
        new_status: EntryStatus,
        /// The user who voided the entry.
        voided_by: UserId,
        /// When the entry was voided.
        voided_at: DateTime<Utc>,
        /// The reason for voiding.
        void_reason: String,
    },
}

impl WorkflowAction {
    /// Returns the new status resulting from this action.
    #[must_use]
    pub fn new_status(&self) -> EntryStatus {
        match self {
            Self::Submit { new_status, .. }
            | Self::Approve { new_status, .. }
            | Self::Post { new_status, .. }
            | Self::Void { new_status, .. } => *new_status,
        }
    }

    /// Returns the user performing the action.
    #[must_use]
    pub fn actor(&self) -> UserId {
        match self {
            Self::Submit { submitted_by, .. } => *submitted_by,
            Self::Approve { approved_by, .. } => *approved_by,
            Self::Post { posted_by, .. } => *posted_by,
            Self::Void { voided_by, .. } => *voided_by,
        }
    }
}
