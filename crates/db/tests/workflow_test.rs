//! Integration tests for the workflow repository.
//!
//! Covers the approval chain, posting and its balance effects, voiding with a
//! reversing entry, and rejection of out-of-order transitions.

#![allow(clippy::uninlined_format_args)]

mod common;

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use trestle_core::ledger::{JournalLine, LedgerError};
use trestle_core::workflow::{EntryStatus, ReversalService, WorkflowError};
use trestle_db::audit::{AuditAction, MemoryAuditRecorder};
use trestle_db::repositories::OpenAccountInput;
use trestle_db::{AccountRepository, JournalRepository, SequenceRepository, WorkflowRepository};
use trestle_shared::types::{AccountId, JournalEntryId, UserId};

use common::{date, entry, open_chart, setup};

struct Repos {
    accounts: AccountRepository,
    journal: JournalRepository,
    workflow: WorkflowRepository,
}

fn repos(db: &sea_orm::DatabaseConnection) -> Repos {
    Repos {
        accounts: AccountRepository::new(db.clone()),
        journal: JournalRepository::new(db.clone()),
        workflow: WorkflowRepository::new(db.clone()),
    }
}

async fn balance(accounts: &AccountRepository, id: AccountId) -> Decimal {
    accounts.get_account(id).await.unwrap().balance
}

// ============================================================================
// Approval chain
// ============================================================================

#[tokio::test]
async fn test_full_approval_chain_posts_balances() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let (clerk, manager, controller) = (UserId::new(), UserId::new(), UserId::new());

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), clerk))
        .await
        .unwrap();

    let submitted = r.workflow.submit_for_approval(created.id, clerk).await.unwrap();
    assert_eq!(submitted.status, EntryStatus::PendingApproval);
    assert_eq!(submitted.submitted_by, Some(clerk));
    assert!(submitted.submitted_at.is_some());

    let approved = r
        .workflow
        .approve(created.id, manager, Some("Matches pay application 7".to_string()))
        .await
        .unwrap();
    assert_eq!(approved.status, EntryStatus::Approved);
    assert_eq!(approved.approved_by, Some(manager));
    assert_eq!(
        approved.approval_notes.as_deref(),
        Some("Matches pay application 7")
    );

    let posted = r.workflow.post(created.id, controller).await.unwrap();
    assert_eq!(posted.status, EntryStatus::Posted);
    assert_eq!(posted.posted_by, Some(controller));
    assert!(posted.posted_at.is_some());

    assert_eq!(balance(&r.accounts, chart.cash).await, dec!(100));
    assert_eq!(balance(&r.accounts, chart.revenue).await, dec!(100));

    let stored = r.journal.get(created.id).await.unwrap();
    assert_eq!(stored.status, EntryStatus::Posted);
    assert_eq!(stored.submitted_by, Some(clerk));
    assert_eq!(stored.approved_by, Some(manager));
    assert_eq!(stored.posted_by, Some(controller));
}

#[tokio::test]
async fn test_draft_can_be_posted_directly() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.expense, chart.payable, dec!(2500.50), user))
        .await
        .unwrap();
    let posted = r.workflow.post(created.id, user).await.unwrap();

    assert_eq!(posted.status, EntryStatus::Posted);
    assert_eq!(posted.submitted_by, None);
    assert_eq!(balance(&r.accounts, chart.expense).await, dec!(2500.50));
    assert_eq!(balance(&r.accounts, chart.payable).await, dec!(2500.50));
}

#[tokio::test]
async fn test_credit_to_debit_normal_account_reduces_balance() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let receipt = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(500), user))
        .await
        .unwrap();
    r.workflow.post(receipt.id, user).await.unwrap();

    let payment = r
        .journal
        .create(entry(chart.payable, chart.cash, dec!(200), user))
        .await
        .unwrap();
    r.workflow.post(payment.id, user).await.unwrap();

    assert_eq!(balance(&r.accounts, chart.cash).await, dec!(300));
    assert_eq!(balance(&r.accounts, chart.payable).await, dec!(-200));
    assert_eq!(balance(&r.accounts, chart.revenue).await, dec!(500));
}

#[tokio::test]
async fn test_out_of_order_transitions_are_rejected() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();

    let result = r.workflow.approve(created.id, user, None).await;
    match result {
        Err(LedgerError::Workflow(WorkflowError::InvalidTransition { from, to })) => {
            assert_eq!(from, EntryStatus::Draft);
            assert_eq!(to, EntryStatus::Approved);
        }
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }

    r.workflow.submit_for_approval(created.id, user).await.unwrap();
    let err = r.workflow.submit_for_approval(created.id, user).await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSITION");

    let err = r.workflow.post(created.id, user).await.unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSITION");

    let stored = r.journal.get(created.id).await.unwrap();
    assert_eq!(stored.status, EntryStatus::PendingApproval);
    assert_eq!(balance(&r.accounts, chart.cash).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_transitions_on_unknown_entry_are_not_found() {
    let db = setup().await;
    let r = repos(&db);
    let id = JournalEntryId::new();
    let user = UserId::new();

    for err in [
        r.workflow.submit_for_approval(id, user).await.unwrap_err(),
        r.workflow.approve(id, user, None).await.unwrap_err(),
        r.workflow.post(id, user).await.unwrap_err(),
        r.workflow.void(id, "typo", user).await.unwrap_err(),
    ] {
        assert!(matches!(err, LedgerError::EntryNotFound(missing) if missing == id));
    }
}

// ============================================================================
// Posting
// ============================================================================

#[tokio::test]
async fn test_posting_twice_applies_balances_once() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();
    r.workflow.post(created.id, user).await.unwrap();

    let result = r.workflow.post(created.id, user).await;
    match result {
        Err(LedgerError::Workflow(WorkflowError::InvalidTransition { from, to })) => {
            assert_eq!(from, EntryStatus::Posted);
            assert_eq!(to, EntryStatus::Posted);
        }
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }

    assert_eq!(balance(&r.accounts, chart.cash).await, dec!(100));
    let cash = r.accounts.get_account(chart.cash).await.unwrap();
    assert_eq!(cash.version, 1);
}

#[tokio::test]
async fn test_posting_to_unknown_account_changes_nothing() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();
    let stray = AccountId::new();

    let created = r
        .journal
        .create(entry(chart.cash, stray, dec!(100), user))
        .await
        .expect("lines are only checked against accounts at posting");

    match r.workflow.post(created.id, user).await {
        Err(LedgerError::AccountNotFound(id)) => assert_eq!(id, stray),
        other => panic!("Expected AccountNotFound, got {:?}", other),
    }

    assert_eq!(r.journal.get(created.id).await.unwrap().status, EntryStatus::Draft);
    assert_eq!(balance(&r.accounts, chart.cash).await, Decimal::ZERO);
}

#[tokio::test]
async fn test_posting_nets_repeated_account_lines() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(trestle_core::ledger::CreateEntryInput {
            date: date(2025, 6, 15),
            description: "Split receipt".to_string(),
            lines: vec![
                JournalLine::debit(chart.cash, dec!(70)),
                JournalLine::debit(chart.cash, dec!(30)),
                JournalLine::credit(chart.revenue, dec!(100)),
            ],
            created_by: user,
        })
        .await
        .unwrap();
    r.workflow.post(created.id, user).await.unwrap();

    let cash = r.accounts.get_account(chart.cash).await.unwrap();
    assert_eq!(cash.balance, dec!(100));
    assert_eq!(cash.version, 1);
}

// ============================================================================
// Void
// ============================================================================

#[tokio::test]
async fn test_void_posts_exact_reversal() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let (clerk, controller) = (UserId::new(), UserId::new());

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), clerk))
        .await
        .unwrap();
    let posted = r.workflow.post(created.id, clerk).await.unwrap();

    let result = r
        .workflow
        .void_on(created.id, "Duplicate entry", controller, date(2025, 6, 30))
        .await
        .unwrap();

    let original = &result.original;
    let reversing = &result.reversing;
    assert_eq!(original.status, EntryStatus::Void);
    assert_eq!(original.voided_by, Some(controller));
    assert_eq!(original.void_reason.as_deref(), Some("Duplicate entry"));
    assert_eq!(original.reversing_entry_id, Some(reversing.id));

    assert_eq!(reversing.status, EntryStatus::Posted);
    assert_eq!(reversing.reverses_entry_id, Some(original.id));
    assert_eq!(reversing.entry_number, "JE-2025-0002");
    assert_eq!(reversing.date, date(2025, 6, 30));
    assert_eq!(
        reversing.description,
        ReversalService::description(&posted.entry_number, "Duplicate entry")
    );
    assert!(ReversalService::is_exact_reversal(&posted.lines, &reversing.lines));
    assert_eq!(reversing.total_debit, posted.total_credit);

    assert_eq!(balance(&r.accounts, chart.cash).await, Decimal::ZERO);
    assert_eq!(balance(&r.accounts, chart.revenue).await, Decimal::ZERO);

    let stored_original = r.journal.get(original.id).await.unwrap();
    assert_eq!(stored_original.status, EntryStatus::Void);
    assert_eq!(stored_original.reversing_entry_id, Some(reversing.id));
    let stored_reversing = r.journal.get(reversing.id).await.unwrap();
    assert_eq!(stored_reversing.status, EntryStatus::Posted);
    assert_eq!(stored_reversing.lines, reversing.lines);
}

#[tokio::test]
async fn test_void_twice_is_rejected() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();
    r.workflow.post(created.id, user).await.unwrap();
    r.workflow
        .void_on(created.id, "Wrong project", user, date(2025, 6, 30))
        .await
        .unwrap();

    let result = r
        .workflow
        .void_on(created.id, "Wrong project", user, date(2025, 6, 30))
        .await;
    match result {
        Err(LedgerError::Workflow(WorkflowError::InvalidTransition { from, to })) => {
            assert_eq!(from, EntryStatus::Void);
            assert_eq!(to, EntryStatus::Void);
        }
        other => panic!("Expected InvalidTransition, got {:?}", other),
    }

    assert_eq!(balance(&r.accounts, chart.cash).await, Decimal::ZERO);
    let sequences = SequenceRepository::new(db);
    assert_eq!(sequences.current("2025").await.unwrap(), Some(2));
}

#[tokio::test]
async fn test_void_requires_reason() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();
    r.workflow.post(created.id, user).await.unwrap();

    let err = r
        .workflow
        .void_on(created.id, "   ", user, date(2025, 6, 30))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LedgerError::Workflow(WorkflowError::VoidReasonRequired)
    ));

    assert_eq!(r.journal.get(created.id).await.unwrap().status, EntryStatus::Posted);
    assert_eq!(balance(&r.accounts, chart.cash).await, dec!(100));
    let sequences = SequenceRepository::new(db);
    assert_eq!(sequences.current("2025").await.unwrap(), Some(1));
}

#[tokio::test]
async fn test_void_before_posting_is_rejected() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();

    let err = r
        .workflow
        .void_on(created.id, "Not needed", user, date(2025, 6, 30))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_TRANSITION");
    assert_eq!(r.journal.get(created.id).await.unwrap().status, EntryStatus::Draft);
}

#[tokio::test]
async fn test_reversing_entry_cannot_be_edited_or_deleted() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);
    let user = UserId::new();

    let created = r
        .journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();
    r.workflow.post(created.id, user).await.unwrap();
    let voided = r
        .workflow
        .void_on(created.id, "Posted twice", user, date(2025, 6, 30))
        .await
        .unwrap();

    for id in [voided.original.id, voided.reversing.id] {
        let err = r.journal.delete(id, user).await.unwrap_err();
        assert_eq!(err.error_code(), "ENTRY_ALREADY_POSTED");
    }
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_open_account_is_idempotent_and_numbers_are_unique() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let r = repos(&db);

    let again = r
        .accounts
        .open_account(OpenAccountInput {
            id: chart.cash,
            number: "1000".to_string(),
            name: "Cash".to_string(),
            account_type: trestle_core::ledger::AccountType::Asset,
        })
        .await
        .unwrap();
    assert_eq!(again.id, chart.cash);

    let err = r
        .accounts
        .open_account(OpenAccountInput {
            id: AccountId::new(),
            number: "1000".to_string(),
            name: "Petty Cash".to_string(),
            account_type: trestle_core::ledger::AccountType::Asset,
        })
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "DUPLICATE_ACCOUNT_NUMBER");

    let numbers: Vec<_> = r
        .accounts
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.number)
        .collect();
    assert_eq!(numbers, vec!["1000", "2000", "4000", "5000"]);

    let err = r.accounts.get_account(AccountId::new()).await.unwrap_err();
    assert_eq!(err.error_code(), "ACCOUNT_NOT_FOUND");
}

// ============================================================================
// Audit
// ============================================================================

#[tokio::test]
async fn test_audit_trail_records_each_transition() {
    let db = setup().await;
    let chart = open_chart(&db).await;
    let audit = Arc::new(MemoryAuditRecorder::new());
    let journal = JournalRepository::new(db.clone()).with_audit(audit.clone());
    let workflow = WorkflowRepository::new(db).with_audit(audit.clone());
    let user = UserId::new();

    let created = journal
        .create(entry(chart.cash, chart.revenue, dec!(100), user))
        .await
        .unwrap();
    workflow.submit_for_approval(created.id, user).await.unwrap();
    workflow.approve(created.id, user, None).await.unwrap();
    workflow.post(created.id, user).await.unwrap();
    let voided = workflow
        .void_on(created.id, "Billed to wrong client", user, date(2025, 6, 30))
        .await
        .unwrap();

    assert_eq!(
        audit.actions_for(created.id.into_inner()).await,
        vec![
            AuditAction::Create,
            AuditAction::Update,
            AuditAction::Approval,
            AuditAction::Post,
            AuditAction::Void,
        ]
    );
    assert_eq!(
        audit.actions_for(voided.reversing.id.into_inner()).await,
        vec![AuditAction::Create, AuditAction::Post]
    );

    let rejected = workflow.post(created.id, user).await;
    assert!(rejected.is_err());
    assert_eq!(audit.actions_for(created.id.into_inner()).await.len(), 5);
}
