//! Enums stored as text columns.
//!
//! Values are plain strings rather than native database enums so the same
//! schema runs on PostgreSQL and SQLite.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use trestle_core::ledger::AccountType as LedgerAccountType;
use trestle_core::workflow::EntryStatus as WorkflowStatus;

/// Persisted journal entry status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum EntryStatus {
    /// Being prepared.
    #[sea_orm(string_value = "draft")]
    Draft,
    /// Waiting for an approver.
    #[sea_orm(string_value = "pending_approval")]
    PendingApproval,
    /// Approved, not yet posted.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Applied to account balances.
    #[sea_orm(string_value = "posted")]
    Posted,
    /// Cancelled by a reversing entry.
    #[sea_orm(string_value = "void")]
    Void,
}

impl From<EntryStatus> for WorkflowStatus {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::PendingApproval => Self::PendingApproval,
            EntryStatus::Approved => Self::Approved,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Void => Self::Void,
        }
    }
}

impl From<WorkflowStatus> for EntryStatus {
    fn from(status: WorkflowStatus) -> Self {
        match status {
            WorkflowStatus::Draft => Self::Draft,
            WorkflowStatus::PendingApproval => Self::PendingApproval,
            WorkflowStatus::Approved => Self::Approved,
            WorkflowStatus::Posted => Self::Posted,
            WorkflowStatus::Void => Self::Void,
        }
    }
}

/// Persisted account type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum AccountType {
    /// Asset account.
    #[sea_orm(string_value = "asset")]
    Asset,
    /// Liability account.
    #[sea_orm(string_value = "liability")]
    Liability,
    /// Equity account.
    #[sea_orm(string_value = "equity")]
    Equity,
    /// Revenue account.
    #[sea_orm(string_value = "revenue")]
    Revenue,
    /// Expense account.
    #[sea_orm(string_value = "expense")]
    Expense,
}

impl From<AccountType> for LedgerAccountType {
    fn from(kind: AccountType) -> Self {
        match kind {
            AccountType::Asset => Self::Asset,
            AccountType::Liability => Self::Liability,
            AccountType::Equity => Self::Equity,
            AccountType::Revenue => Self::Revenue,
            AccountType::Expense => Self::Expense,
        }
    }
}

impl From<LedgerAccountType> for AccountType {
    fn from(kind: LedgerAccountType) -> Self {
        match kind {
            LedgerAccountType::Asset => Self::Asset,
            LedgerAccountType::Liability => Self::Liability,
            LedgerAccountType::Equity => Self::Equity,
            LedgerAccountType::Revenue => Self::Revenue,
            LedgerAccountType::Expense => Self::Expense,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_core() {
        for status in WorkflowStatus::ALL {
            let stored = EntryStatus::from(status);
            assert_eq!(WorkflowStatus::from(stored), status);
            assert_eq!(stored.to_value(), status.as_str());
        }
    }

    #[test]
    fn test_account_type_strings_match_core() {
        for kind in [
            LedgerAccountType::Asset,
            LedgerAccountType::Liability,
            LedgerAccountType::Equity,
            LedgerAccountType::Revenue,
            LedgerAccountType::Expense,
        ] {
            assert_eq!(AccountType::from(kind).to_value(), kind.as_str());
        }
    }
}
