//! Initial ledger schema.
//!
//! Creates accounts, journal entries and lines, the entry number sequences and
//! the EVM snapshot log. The SQL is kept to the subset PostgreSQL and SQLite
//! share: amounts are TEXT, enums are TEXT with CHECK constraints, and every
//! value is supplied by the application rather than a column default.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: CHART OF ACCOUNTS
        // ============================================================
        db.execute_unprepared(ACCOUNTS_SQL).await?;

        // ============================================================
        // PART 2: JOURNAL
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_ENTRIES_STATUS_INDEX_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_ACCOUNT_INDEX_SQL).await?;
        db.execute_unprepared(ENTRY_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 3: EARNED VALUE
        // ============================================================
        db.execute_unprepared(EVM_SNAPSHOTS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            "evm_snapshots",
            "entry_sequences",
            "journal_lines",
            "journal_entries",
            "accounts",
        ] {
            manager
                .drop_table(Table::drop().table(Alias::new(table)).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id              UUID PRIMARY KEY,
    number          TEXT NOT NULL UNIQUE,
    name            TEXT NOT NULL,
    account_type    TEXT NOT NULL
        CHECK (account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')),
    balance         TEXT NOT NULL,
    version         BIGINT NOT NULL,
    created_at      TIMESTAMPTZ NOT NULL,
    updated_at      TIMESTAMPTZ NOT NULL
)
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id                  UUID PRIMARY KEY,
    entry_number        TEXT NOT NULL UNIQUE,
    entry_date          DATE NOT NULL,
    description         TEXT NOT NULL,
    total_debit         TEXT NOT NULL,
    total_credit        TEXT NOT NULL,
    status              TEXT NOT NULL
        CHECK (status IN ('draft', 'pending_approval', 'approved', 'posted', 'void')),
    created_by          UUID NOT NULL,
    submitted_by        UUID,
    approved_by         UUID,
    posted_by           UUID,
    voided_by           UUID,
    approval_notes      TEXT,
    void_reason         TEXT,
    reversing_entry_id  UUID REFERENCES journal_entries (id),
    reverses_entry_id   UUID REFERENCES journal_entries (id),
    created_at          TIMESTAMPTZ NOT NULL,
    updated_at          TIMESTAMPTZ NOT NULL,
    submitted_at        TIMESTAMPTZ,
    approved_at         TIMESTAMPTZ,
    posted_at           TIMESTAMPTZ,
    voided_at           TIMESTAMPTZ
)
";

const JOURNAL_ENTRIES_STATUS_INDEX_SQL: &str = r"
CREATE INDEX idx_journal_entries_status_date
    ON journal_entries (status, entry_date, entry_number)
";

// Lines deliberately carry no foreign key to accounts: an unknown account is
// reported as ACCOUNT_NOT_FOUND when the entry is posted.
const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id              UUID PRIMARY KEY,
    entry_id        UUID NOT NULL REFERENCES journal_entries (id),
    line_number     INTEGER NOT NULL,
    account_id      UUID NOT NULL,
    debit           TEXT NOT NULL,
    credit          TEXT NOT NULL,
    description     TEXT,
    UNIQUE (entry_id, line_number)
)
";

const JOURNAL_LINES_ACCOUNT_INDEX_SQL: &str = r"
CREATE INDEX idx_journal_lines_account ON journal_lines (account_id)
";

const ENTRY_SEQUENCES_SQL: &str = r"
CREATE TABLE entry_sequences (
    period_key      TEXT PRIMARY KEY,
    last_value      BIGINT NOT NULL,
    version         BIGINT NOT NULL
)
";

const EVM_SNAPSHOTS_SQL: &str = r"
CREATE TABLE evm_snapshots (
    id                  UUID PRIMARY KEY,
    project_id          UUID NOT NULL,
    as_of               DATE NOT NULL,
    bac                 TEXT NOT NULL,
    pv                  TEXT NOT NULL,
    ev                  TEXT NOT NULL,
    ac                  TEXT NOT NULL,
    cpi                 TEXT NOT NULL,
    spi                 TEXT NOT NULL,
    cv                  TEXT NOT NULL,
    sv                  TEXT NOT NULL,
    eac                 TEXT NOT NULL,
    etc                 TEXT NOT NULL,
    vac                 TEXT NOT NULL,
    tcpi                TEXT,
    performance_status  TEXT NOT NULL
        CHECK (performance_status IN ('on-track', 'at-risk', 'critical')),
    health_score        TEXT NOT NULL,
    forecast_cost       TEXT NOT NULL,
    forecast_date       DATE,
    forecast            TEXT NOT NULL,
    confidence_level    TEXT NOT NULL,
    critical_tasks      TEXT NOT NULL,
    recorded_at         TIMESTAMPTZ NOT NULL,
    UNIQUE (project_id, as_of)
)
";
