//! Journal entry store: create, read, list, edit and delete entries.
//!
//! Entries and their ordered lines are written together in one transaction.
//! Workflow transitions live in the workflow repository; this module only
//! touches content fields.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use trestle_core::ledger::{
    CreateEntryInput, JournalEntry, JournalLine, LedgerError, UpdateEntryInput,
    format_entry_number, period_key, validate,
};
use trestle_core::workflow::{EntryStatus, WorkflowError, WorkflowService};
use trestle_shared::ResilienceConfig;
use trestle_shared::types::{AccountId, JournalEntryId, PageRequest, PageResponse, UserId};

use crate::audit::{AuditAction, AuditEvent, AuditRecorder, TracingAuditRecorder, record_quietly};
use crate::entities::{journal_entries, journal_lines, sea_orm_active_enums};
use crate::resilience::{storage_error, with_retry, with_timeout};

use super::mutation::current_status;
use super::parse_decimal;
use super::sequence::SequenceRepository;

/// Entity type recorded in the audit trail.
pub(crate) const AUDIT_ENTITY: &str = "journal_entry";

/// Repository for journal entries.
#[derive(Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    audit: Arc<dyn AuditRecorder>,
    resilience: ResilienceConfig,
    sequences: SequenceRepository,
}

impl JournalRepository {
    /// Creates a new journal repository that audits to the tracing log.
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

    /// Creates a Draft entry.
    ///
    /// The lines are validated before a number is allocated, so a rejected
    /// entry does not consume one.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the lines break a double-entry rule.
    pub async fn create(&self, input: CreateEntryInput) -> Result<JournalEntry, LedgerError> {
        let entry = with_timeout(&self.resilience, async {
            validate(&input.lines)?;

            let key = period_key(input.date);
            let sequence = self.sequences.next(&key).await?;
            let entry = JournalEntry::new_draft(
                JournalEntryId::new(),
                format_entry_number(&key, sequence),
                input,
                Utc::now(),
            )?;

            let txn = self.db.begin().await.map_err(storage_error)?;
            insert_entry(&txn, &entry).await?;
            txn.commit().await.map_err(storage_error)?;
            Ok(entry)
        })
        .await?;

        // Committed from here on; the audit write is outside the deadline.
        record_quietly(
            self.audit.as_ref(),
            AuditEvent::new(
                AUDIT_ENTITY,
                entry.id.into_inner(),
                AuditAction::Create,
                entry.created_by,
                json!({
                    "entry_number": entry.entry_number,
                    "total_debit": entry.total_debit,
                    "total_credit": entry.total_credit,
                }),
            ),
        )
        .await;

        info!(
            entry_id = %entry.id,
            entry_number = %entry.entry_number,
            total_debit = %entry.total_debit,
            "Journal entry created"
        );
        Ok(entry)
    }

    /// Gets an entry with its lines.
    ///
    /// # Errors
    ///
    /// Returns `ENTRY_NOT_FOUND` if the entry does not exist.
    pub async fn get(&self, id: JournalEntryId) -> Result<JournalEntry, LedgerError> {
        with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "get_entry", || load_entry(&self.db, id)),
        )
        .await
    }

    /// Lists entries in one status, ordered by date then entry number.
    pub async fn list_by_status(
        &self,
        status: EntryStatus,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        with_timeout(
            &self.resilience,
            with_retry(&self.resilience, "list_entries", || {
                self.fetch_page(status, page)
            }),
        )
        .await
    }

    async fn fetch_page(
        &self,
        status: EntryStatus,
        page: PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        let query = journal_entries::Entity::find()
            .filter(
                journal_entries::Column::Status.eq(sea_orm_active_enums::EntryStatus::from(status)),
            )
            .order_by_asc(journal_entries::Column::EntryDate)
            .order_by_asc(journal_entries::Column::EntryNumber);

        let total = query.clone().count(&self.db).await.map_err(storage_error)?;
        let headers = query
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(storage_error)?;

        let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
        let mut lines_by_entry: HashMap<Uuid, Vec<journal_lines::Model>> = HashMap::new();
        for line in journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.is_in(ids))
            .order_by_asc(journal_lines::Column::LineNumber)
            .all(&self.db)
            .await
            .map_err(storage_error)?
        {
            lines_by_entry.entry(line.entry_id).or_default().push(line);
        }

        let entries = headers
            .into_iter()
            .map(|header| {
                let lines = lines_by_entry.remove(&header.id).unwrap_or_default();
                to_domain(header, lines)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PageResponse::new(entries, page, total))
    }

    /// Edits an entry that has not been posted.
    ///
    /// Replacing the lines re-validates them and recomputes the totals. The
    /// status is never changed by an edit.
    ///
    /// # Errors
    ///
    /// Returns `ENTRY_ALREADY_POSTED` once the entry is Posted or Void.
    pub async fn update(
        &self,
        id: JournalEntryId,
        patch: UpdateEntryInput,
        updated_by: UserId,
    ) -> Result<JournalEntry, LedgerError> {
        let touches_lines = patch.touches_lines();
        let entry = with_timeout(&self.resilience, async {

            let txn = self.db.begin().await.map_err(storage_error)?;
            let mut entry = load_entry(&txn, id).await?;
            let status = entry.status;
            entry.apply_update(patch, Utc::now())?;

            let result = journal_entries::Entity::update_many()
                .set(journal_entries::ActiveModel {
                    entry_date: Set(entry.date),
                    description: Set(entry.description.clone()),
                    total_debit: Set(entry.total_debit.to_string()),
                    total_credit: Set(entry.total_credit.to_string()),
                    updated_at: Set(entry.updated_at),
                    ..Default::default()
                })
                .filter(journal_entries::Column::Id.eq(id.into_inner()))
                .filter(journal_entries::Column::Status.eq(sea_orm_active_enums::EntryStatus::from(status)))
                .exec(&txn)
                .await
                .map_err(storage_error)?;
            if result.rows_affected == 0 {
                return Err(changed_underneath(&txn, id, WorkflowService::ensure_editable).await);
            }

            if touches_lines {
                journal_lines::Entity::delete_many()
                    .filter(journal_lines::Column::EntryId.eq(id.into_inner()))
                    .exec(&txn)
                    .await
                    .map_err(storage_error)?;
                insert_lines(&txn, &entry).await?;
            }
            txn.commit().await.map_err(storage_error)?;
            Ok(entry)
        })
        .await?;

        record_quietly(
            self.audit.as_ref(),
            AuditEvent::new(
                AUDIT_ENTITY,
                id.into_inner(),
                AuditAction::Update,
                updated_by,
                json!({ "lines_replaced": touches_lines }),
            ),
        )
        .await;

        info!(entry_id = %id, lines_replaced = touches_lines, "Journal entry updated");
        Ok(entry)
    }

    /// Deletes a Draft entry and its lines.
    ///
    /// # Errors
    ///
    /// - `ENTRY_ALREADY_POSTED` for Posted or Void entries
    /// - `CAN_ONLY_DELETE_DRAFT` for entries in approval
    pub async fn delete(&self, id: JournalEntryId, deleted_by: UserId) -> Result<(), LedgerError> {
        let entry = with_timeout(&self.resilience, async {
            let txn = self.db.begin().await.map_err(storage_error)?;
            let entry = load_entry(&txn, id).await?;
            WorkflowService::ensure_deletable(entry.status)?;

            journal_lines::Entity::delete_many()
                .filter(journal_lines::Column::EntryId.eq(id.into_inner()))
                .exec(&txn)
                .await
                .map_err(storage_error)?;
            let result = journal_entries::Entity::delete_many()
                .filter(journal_entries::Column::Id.eq(id.into_inner()))
                .filter(
                    journal_entries::Column::Status
                        .eq(sea_orm_active_enums::EntryStatus::Draft),
                )
                .exec(&txn)
                .await
                .map_err(storage_error)?;
            if result.rows_affected == 0 {
                return Err(changed_underneath(&txn, id, WorkflowService::ensure_deletable).await);
            }
            txn.commit().await.map_err(storage_error)?;
            Ok(entry)
        })
        .await?;

        record_quietly(
            self.audit.as_ref(),
            AuditEvent::new(
                AUDIT_ENTITY,
                id.into_inner(),
                AuditAction::Delete,
                deleted_by,
                json!({ "entry_number": entry.entry_number }),
            ),
        )
        .await;

        info!(entry_id = %id, entry_number = %entry.entry_number, "Journal entry deleted");
        Ok(())
    }
}

/// The error for an edit or delete whose status guard matched no row.
///
/// `allowed` is the check the operation made against the status it read.
async fn changed_underneath<C: ConnectionTrait>(
    conn: &C,
    id: JournalEntryId,
    allowed: fn(EntryStatus) -> Result<(), WorkflowError>,
) -> LedgerError {
    match current_status(conn, id).await {
        Ok(Some(status)) => match allowed(status) {
            Err(e) => e.into(),
            Ok(()) => LedgerError::Transient(format!("journal entry {id} changed concurrently")),
        },
        Ok(None) => LedgerError::EntryNotFound(id),
        Err(e) => e,
    }
}

/// Inserts an entry header followed by its lines.
pub(crate) async fn insert_entry<C: ConnectionTrait>(
    conn: &C,
    entry: &JournalEntry,
) -> Result<(), LedgerError> {
    let header = journal_entries::ActiveModel {
        id: Set(entry.id.into_inner()),
        entry_number: Set(entry.entry_number.clone()),
        entry_date: Set(entry.date),
        description: Set(entry.description.clone()),
        total_debit: Set(entry.total_debit.to_string()),
        total_credit: Set(entry.total_credit.to_string()),
        status: Set(entry.status.into()),
        created_by: Set(entry.created_by.into_inner()),
        submitted_by: Set(entry.submitted_by.map(UserId::into_inner)),
        approved_by: Set(entry.approved_by.map(UserId::into_inner)),
        posted_by: Set(entry.posted_by.map(UserId::into_inner)),
        voided_by: Set(entry.voided_by.map(UserId::into_inner)),
        approval_notes: Set(entry.approval_notes.clone()),
        void_reason: Set(entry.void_reason.clone()),
        reversing_entry_id: Set(entry.reversing_entry_id.map(JournalEntryId::into_inner)),
        reverses_entry_id: Set(entry.reverses_entry_id.map(JournalEntryId::into_inner)),
        created_at: Set(entry.created_at),
        updated_at: Set(entry.updated_at),
        submitted_at: Set(entry.submitted_at),
        approved_at: Set(entry.approved_at),
        posted_at: Set(entry.posted_at),
        voided_at: Set(entry.voided_at),
    };
    header.insert(conn).await.map_err(storage_error)?;
    insert_lines(conn, entry).await
}

async fn insert_lines<C: ConnectionTrait>(conn: &C, entry: &JournalEntry) -> Result<(), LedgerError> {
    let lines: Vec<journal_lines::ActiveModel> = entry
        .lines
        .iter()
        .zip(1_i32..)
        .map(|(line, line_number)| journal_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            entry_id: Set(entry.id.into_inner()),
            line_number: Set(line_number),
            account_id: Set(line.account_id.into_inner()),
            debit: Set(line.debit.to_string()),
            credit: Set(line.credit.to_string()),
            description: Set(line.description.clone()),
        })
        .collect();

    journal_lines::Entity::insert_many(lines)
        .exec(conn)
        .await
        .map_err(storage_error)?;
    Ok(())
}

/// Loads an entry with its lines, `None` if it does not exist.
pub(crate) async fn find_entry<C: ConnectionTrait>(
    conn: &C,
    id: JournalEntryId,
) -> Result<Option<JournalEntry>, LedgerError> {
    let Some(header) = journal_entries::Entity::find_by_id(id.into_inner())
        .one(conn)
        .await
        .map_err(storage_error)?
    else {
        return Ok(None);
    };

    let lines = journal_lines::Entity::find()
        .filter(journal_lines::Column::EntryId.eq(header.id))
        .order_by_asc(journal_lines::Column::LineNumber)
        .all(conn)
        .await
        .map_err(storage_error)?;

    to_domain(header, lines).map(Some)
}

/// Loads an entry with its lines.
///
/// # Errors
///
/// Returns `ENTRY_NOT_FOUND` if the entry does not exist.
pub(crate) async fn load_entry<C: ConnectionTrait>(
    conn: &C,
    id: JournalEntryId,
) -> Result<JournalEntry, LedgerError> {
    find_entry(conn, id)
        .await?
        .ok_or(LedgerError::EntryNotFound(id))
}

fn to_domain(
    header: journal_entries::Model,
    lines: Vec<journal_lines::Model>,
) -> Result<JournalEntry, LedgerError> {
    let lines = lines
        .into_iter()
        .map(|line| {
            Ok(JournalLine {
                account_id: AccountId::from_uuid(line.account_id),
                debit: parse_decimal("journal_lines.debit", &line.debit)?,
                credit: parse_decimal("journal_lines.credit", &line.credit)?,
                description: line.description,
            })
        })
        .collect::<Result<Vec<_>, LedgerError>>()?;

    Ok(JournalEntry {
        id: JournalEntryId::from_uuid(header.id),
        entry_number: header.entry_number,
        date: header.entry_date,
        description: header.description,
        lines,
        total_debit: parse_decimal("journal_entries.total_debit", &header.total_debit)?,
        total_credit: parse_decimal("journal_entries.total_credit", &header.total_credit)?,
        status: header.status.into(),
        created_by: UserId::from_uuid(header.created_by),
        submitted_by: header.submitted_by.map(UserId::from_uuid),
        approved_by: header.approved_by.map(UserId::from_uuid),
        posted_by: header.posted_by.map(UserId::from_uuid),
        voided_by: header.voided_by.map(UserId::from_uuid),
        approval_notes: header.approval_notes,
        void_reason: header.void_reason,
        reversing_entry_id: header.reversing_entry_id.map(JournalEntryId::from_uuid),
        reverses_entry_id: header.reverses_entry_id.map(JournalEntryId::from_uuid),
        created_at: header.created_at,
        updated_at: header.updated_at,
        submitted_at: header.submitted_at,
        approved_at: header.approved_at,
        posted_at: header.posted_at,
        voided_at: header.voided_at,
    })
}
