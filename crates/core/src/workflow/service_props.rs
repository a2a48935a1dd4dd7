//! Property-based tests for WorkflowService.

use proptest::prelude::*;
use trestle_shared::types::UserId;
use uuid::Uuid;

use crate::workflow::error::WorkflowError;
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{EntryStatus, WorkflowAction};

/// Strategy for generating random EntryStatus values.
fn arb_status() -> impl Strategy<Value = EntryStatus> {
    prop::sample::select(EntryStatus::ALL.to_vec())
}

/// Strategy for generating random user ids.
fn arb_user() -> impl Strategy<Value = UserId> {
    any::<u128>().prop_map(|n| UserId::from_uuid(Uuid::from_u128(n)))
}

/// Strategy for generating reasons with at least one visible character.
fn arb_reason() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9 ]{0,60}".prop_map(|s| s.trim().to_string())
}

/// Strategy for generating optional approval notes.
fn arb_approval_notes() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), arb_reason().prop_map(Some)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Draft + submit → PendingApproval carrying the submitter.
    #[test]
    fn prop_submit_from_draft_succeeds(user_id in arb_user()) {
        let action = WorkflowService::submit(EntryStatus::Draft, user_id).unwrap();
        prop_assert_eq!(action.new_status(), EntryStatus::PendingApproval);
        prop_assert_eq!(action.actor(), user_id);
    }

    /// PendingApproval + approve → Approved carrying approver and notes.
    #[test]
    fn prop_approve_from_pending_succeeds(
        user_id in arb_user(),
        notes in arb_approval_notes(),
    ) {
        let action =
            WorkflowService::approve(EntryStatus::PendingApproval, user_id, notes.clone()).unwrap();
        prop_assert_eq!(action.new_status(), EntryStatus::Approved);
        if let WorkflowAction::Approve { approved_by, approval_notes, .. } = action {
            prop_assert_eq!(approved_by, user_id);
            prop_assert_eq!(approval_notes, notes);
        } else {
            prop_assert!(false, "Expected Approve action");
        }
    }

    /// Posted + void → Void carrying voider and reason.
    #[test]
    fn prop_void_from_posted_succeeds(user_id in arb_user(), reason in arb_reason()) {
        let action = WorkflowService::void(EntryStatus::Posted, user_id, reason.clone()).unwrap();
        prop_assert_eq!(action.new_status(), EntryStatus::Void);
        if let WorkflowAction::Void { voided_by, void_reason, .. } = action {
            prop_assert_eq!(voided_by, user_id);
            prop_assert_eq!(void_reason, reason);
        } else {
            prop_assert!(false, "Expected Void action");
        }
    }

    /// Every operation succeeds exactly when the transition table allows it,
    /// and otherwise reports the attempted transition.
    #[test]
    fn prop_operations_follow_transition_table(
        status in arb_status(),
        user_id in arb_user(),
        reason in arb_reason(),
    ) {
        let attempts = [
            (EntryStatus::PendingApproval, WorkflowService::submit(status, user_id)),
            (EntryStatus::Approved, WorkflowService::approve(status, user_id, None)),
            (EntryStatus::Posted, WorkflowService::post(status, user_id)),
            (EntryStatus::Void, WorkflowService::void(status, user_id, reason.clone())),
        ];

        for (target, result) in attempts {
            if status.can_transition_to(target) {
                prop_assert_eq!(result.unwrap().new_status(), target);
            } else {
                prop_assert_eq!(
                    result.unwrap_err(),
                    WorkflowError::InvalidTransition { from: status, to: target }
                );
            }
        }
    }

    /// Blank void reasons are rejected on posted entries.
    #[test]
    fn prop_blank_void_reason_rejected(user_id in arb_user(), spaces in " {0,10}") {
        let result = WorkflowService::void(EntryStatus::Posted, user_id, spaces);
        prop_assert_eq!(result.unwrap_err(), WorkflowError::VoidReasonRequired);
    }

    /// Immutable entries are never editable or deletable, and report ENTRY_ALREADY_POSTED.
    #[test]
    fn prop_immutable_entries_locked(status in arb_status()) {
        if status.is_immutable() {
            prop_assert_eq!(
                WorkflowService::ensure_editable(status),
                Err(WorkflowError::EntryAlreadyPosted { status })
            );
            prop_assert_eq!(
                WorkflowService::ensure_deletable(status),
                Err(WorkflowError::EntryAlreadyPosted { status })
            );
        } else {
            prop_assert!(WorkflowService::ensure_editable(status).is_ok());
        }
    }

    /// No transition leads back into Draft.
    #[test]
    fn prop_draft_unreachable(from in arb_status()) {
        prop_assert!(!WorkflowService::is_valid_transition(from, EntryStatus::Draft));
    }
}
