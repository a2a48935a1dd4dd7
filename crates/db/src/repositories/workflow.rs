//! Workflow repository for journal entry state transitions.
//!
//! Every transition runs in its own transaction: the entry is re-read inside
//! it, the workflow service decides whether the move is allowed, the stored
//! lines are re-validated, and the status is flipped with a guarded write.
//! Posting and voiding also apply balance deltas in the same transaction.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};

use trestle_core::ledger::{
    JournalEntry, LedgerError, PostingPlan, format_entry_number, period_key,
};
use trestle_core::workflow::{ReversalService, WorkflowAction, WorkflowService};
use trestle_shared::ResilienceConfig;
use trestle_shared::types::{JournalEntryId, UserId};

use crate::audit::{AuditAction, AuditEvent, AuditRecorder, TracingAuditRecorder, record_quietly};
use crate::resilience::{storage_error, with_retry, with_timeout};

use super::journal::{AUDIT_ENTITY, insert_entry, load_entry};
use super::mutation::system_status_mutation;
use super::posting;
use super::sequence::SequenceRepository;

/// Void operation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoidResult {
    /// Original entry (now Void).
    pub original: JournalEntry,
    /// Reversing entry (Posted).
    pub reversing: JournalEntry,
}

/// Workflow repository for journal entry state transitions.
#[derive(Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
    audit: Arc<dyn AuditRecorder>,
    resilience: ResilienceConfig,
    sequences: SequenceRepository,
}

impl WorkflowRepository {
    /// Creates a new workflow repository that audits to the tracing log.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            sequences: SequenceRepository::new(db.clone()),
            db,
            audit: Arc::new(TracingAuditRecorder),
            resilience: ResilienceConfig::default(),
        }
    }

    /// Replaces the audit recorder.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<dyn AuditRecorder>) -> Self {
        self.audit = audit;
        self
    }

    /// Replaces the retry and timeout policy.
    #[must_use]
    pub fn with_resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.sequences = self.sequences.with_resilience(resilience.clone());
        self.resilience = resilience;
        self
    }

    /// Submits a Draft entry for approval.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Entry is not found
    /// - Entry is not in Draft status
    /// - Stored lines no longer validate
    pub async fn submit_for_approval(
        &self,
        entry_id: JournalEntryId,
        submitted_by: UserId,
    ) -> Result<JournalEntry, LedgerError> {
        let entry = with_timeout(&self.resilience, async {
            let txn = self.db.begin().await.map_err(storage_error)?;
            let mut entry = load_entry(&txn, entry_id).await?;

            let action = WorkflowService::submit(entry.status, submitted_by)?;
            entry.revalidate()?;
            system_status_mutation(&txn, entry_id, entry.status, &action, None).await?;
            entry.apply_action(&action);

            txn.commit().await.map_err(storage_error)?;
            Ok(entry)
        })
        .await?;

        self.audit_transition(&entry, AuditAction::Update, submitted_by, json!({ "status": entry.status }))
            .await;
        info!(entry_id = %entry_id, entry_number = %entry.entry_number, "Journal entry submitted");
        Ok(entry)
    }

    /// Approves an entry waiting for approval.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Entry is not found
    /// - Entry is not in PendingApproval status
    /// - Stored lines no longer validate
    pub async fn approve(
        &self,
        entry_id: JournalEntryId,
        approved_by: UserId,
        approval_notes: Option<String>,
    ) -> Result<JournalEntry, LedgerError> {
        let entry = with_timeout(&self.resilience, async {
            let txn = self.db.begin().await.map_err(storage_error)?;
            let mut entry = load_entry(&txn, entry_id).await?;

            let action = WorkflowService::approve(entry.status, approved_by, approval_notes)?;
            entry.revalidate()?;
            system_status_mutation(&txn, entry_id, entry.status, &action, None).await?;
            entry.apply_action(&action);

            txn.commit().await.map_err(storage_error)?;
            Ok(entry)
        })
        .await?;

        self.audit_transition(
            &entry,
            AuditAction::Approval,
            approved_by,
            json!({ "notes": entry.approval_notes }),
        )
        .await;
        info!(entry_id = %entry_id, entry_number = %entry.entry_number, "Journal entry approved");
        Ok(entry)
    }

    /// Posts an Approved (or Draft) entry, applying its balance deltas.
    ///
    /// Posting the same entry twice is rejected with `INVALID_TRANSITION` and
    /// never applies the deltas a second time.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Entry is not found, or is not Approved or Draft
    /// - Stored lines no longer validate
    /// - An account is unknown (`ACCOUNT_NOT_FOUND`)
    /// - An account changed concurrently (`CONCURRENT_MODIFICATION`)
    /// - Applying a later delta failed (`POSTING_PARTIAL_FAILURE`); nothing is kept
    pub async fn post(
        &self,
        entry_id: JournalEntryId,
        posted_by: UserId,
    ) -> Result<JournalEntry, LedgerError> {
        let (entry, plan) = with_timeout(&self.resilience, async {
            let txn = self.db.begin().await.map_err(storage_error)?;
            let mut entry = load_entry(&txn, entry_id).await?;

            let action = WorkflowService::post(entry.status, posted_by)?;
            entry.revalidate()?;
            let plan = apply_posting(txn, &entry, &action).await?;
            entry.apply_action(&action);
            Ok((entry, plan))
        })
        .await?;

        self.audit_transition(
            &entry,
            AuditAction::Post,
            posted_by,
            json!({ "accounts": plan.deltas.len() }),
        )
        .await;
        info!(
            entry_id = %entry_id,
            entry_number = %entry.entry_number,
            accounts = plan.deltas.len(),
            "Journal entry posted"
        );
        Ok(entry)
    }

    /// Voids a Posted entry by creating and posting its reversing entry,
    /// dated today.
    ///
    /// # Errors
    ///
    /// See [`Self::void_on`].
    pub async fn void(
        &self,
        entry_id: JournalEntryId,
        void_reason: &str,
        voided_by: UserId,
    ) -> Result<VoidResult, LedgerError> {
        self.void_on(entry_id, void_reason, voided_by, Utc::now().date_naive())
            .await
    }

    /// Voids a Posted entry with a reversing entry dated `date`.
    ///
    /// The reversing entry is created, posted, and the original flipped to
    /// Void in one transaction. If any step fails the original stays Posted.
    ///
    /// The reversing entry's number is allocated before that transaction once
    /// the pre-checks pass. A failure while posting the reversal leaves that
    /// number unused.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Entry is not found
    /// - Entry is not Posted (`INVALID_TRANSITION`, also when already Void)
    /// - Void reason is blank (`VOID_REASON_REQUIRED`)
    /// - Posting the reversal fails
    pub async fn void_on(
        &self,
        entry_id: JournalEntryId,
        void_reason: &str,
        voided_by: UserId,
        date: NaiveDate,
    ) -> Result<VoidResult, LedgerError> {
        let result = with_timeout(&self.resilience, async {
            // Check before allocating so a rejected void does not use up a number.
            let original = with_retry(&self.resilience, "get_entry", || {
                load_entry(&self.db, entry_id)
            })
            .await?;
            ReversalService::build(&original, void_reason, voided_by, date)?;

            let key = period_key(date);
            let sequence = self.sequences.next(&key).await?;

            let txn = self.db.begin().await.map_err(storage_error)?;
            let mut original = load_entry(&txn, entry_id).await?;
            let plan = ReversalService::build(&original, void_reason, voided_by, date)?;

            let mut reversing = JournalEntry::new_draft(
                JournalEntryId::new(),
                format_entry_number(&key, sequence),
                plan.input,
                Utc::now(),
            )?;
            reversing.reverses_entry_id = Some(original.id);
            insert_entry(&txn, &reversing).await?;

            let post = WorkflowService::post(reversing.status, voided_by)?;
            let void = WorkflowService::void(original.status, voided_by, plan.reason)?;

            let posted = posting::apply(&txn, &reversing, &post).await;
            let flipped = match posted {
                Ok(_) => {
                    system_status_mutation(&txn, original.id, original.status, &void, Some(reversing.id))
                        .await
                }
                Err(e) => Err(e),
            };
            if let Err(e) = flipped {
                return Err(rollback(txn, e).await);
            }
            txn.commit().await.map_err(storage_error)?;

            reversing.apply_action(&post);
            original.apply_action(&void);
            original.reversing_entry_id = Some(reversing.id);
            Ok(VoidResult {
                original,
                reversing,
            })
        })
        .await?;

        self.audit_transition(
            &result.reversing,
            AuditAction::Create,
            voided_by,
            json!({ "reverses_entry_id": entry_id }),
        )
        .await;
        self.audit_transition(
            &result.reversing,
            AuditAction::Post,
            voided_by,
            json!({ "accounts": result.reversing.lines.len() }),
        )
        .await;
        self.audit_transition(
            &result.original,
            AuditAction::Void,
            voided_by,
            json!({
                "reason": result.original.void_reason,
                "reversing_entry_id": result.reversing.id,
            }),
        )
        .await;
        info!(
            entry_id = %entry_id,
            reversing_entry_id = %result.reversing.id,
            reversing_entry_number = %result.reversing.entry_number,
            "Journal entry voided"
        );
        Ok(result)
    }

    async fn audit_transition(
        &self,
        entry: &JournalEntry,
        action: AuditAction,
        actor: UserId,
        metadata: serde_json::Value,
    ) {
        record_quietly(
            self.audit.as_ref(),
            AuditEvent::new(AUDIT_ENTITY, entry.id.into_inner(), action, actor, metadata),
        )
        .await;
    }
}

/// Applies a posting and commits, or rolls back and reports.
async fn apply_posting(
    txn: DatabaseTransaction,
    entry: &JournalEntry,
    action: &WorkflowAction,
) -> Result<PostingPlan, LedgerError> {
    match posting::apply(&txn, entry, action).await {
        Ok(plan) => {
            txn.commit().await.map_err(storage_error)?;
            Ok(plan)
        }
        Err(e) => Err(rollback(txn, e).await),
    }
}

/// Rolls back `txn` and returns `cause`, logging integrity failures once the
/// rollback is done.
async fn rollback(txn: DatabaseTransaction, cause: LedgerError) -> LedgerError {
    // The pool discards an unfinished transaction when the connection returns.
    if let Err(e) = txn.rollback().await {
        error!(error = %e, cause = %cause, "Rollback failed");
    }
    if let LedgerError::PostingPartialFailure {
        entry_id,
        account_id,
        reason,
    } = &cause
    {
        error!(
            entry_id = %entry_id,
            account_id = %account_id,
            reason = %reason,
            "Posting failed after balances changed; transaction rolled back"
        );
    }
    cause
}
