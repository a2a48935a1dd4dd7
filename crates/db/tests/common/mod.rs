//! Shared fixtures for repository integration tests.
//!
//! Every test gets its own in-memory SQLite database with migrations applied.
//! The pool holds a single connection because each in-memory connection is a
//! separate database.

#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use trestle_core::ledger::{AccountType, CreateEntryInput, JournalLine};
use trestle_db::AccountRepository;
use trestle_db::migration::{Migrator, MigratorTrait};
use trestle_db::repositories::OpenAccountInput;
use trestle_shared::config::DatabaseConfig;
use trestle_shared::types::{AccountId, UserId};

pub async fn setup() -> DatabaseConnection {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    };
    let db = trestle_db::connect(&config)
        .await
        .expect("Failed to open in-memory database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

/// A small chart of accounts with ids in a fixed order.
pub struct Chart {
    pub cash: AccountId,
    pub revenue: AccountId,
    pub expense: AccountId,
    pub payable: AccountId,
}

pub async fn open_chart(db: &DatabaseConnection) -> Chart {
    let repo = AccountRepository::new(db.clone());
    let chart = Chart {
        cash: AccountId::from_uuid(Uuid::from_u128(1)),
        revenue: AccountId::from_uuid(Uuid::from_u128(2)),
        expense: AccountId::from_uuid(Uuid::from_u128(3)),
        payable: AccountId::from_uuid(Uuid::from_u128(4)),
    };

    for (id, number, name, account_type) in [
        (chart.cash, "1000", "Cash", AccountType::Asset),
        (chart.revenue, "4000", "Contract Revenue", AccountType::Revenue),
        (chart.expense, "5000", "Site Materials", AccountType::Expense),
        (chart.payable, "2000", "Accounts Payable", AccountType::Liability),
    ] {
        repo.open_account(OpenAccountInput {
            id,
            number: number.to_string(),
            name: name.to_string(),
            account_type,
        })
        .await
        .expect("Failed to open account");
    }
    chart
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

pub fn entry(
    debit: AccountId,
    credit: AccountId,
    amount: Decimal,
    created_by: UserId,
) -> CreateEntryInput {
    CreateEntryInput {
        date: date(2025, 6, 15),
        description: "Progress billing".to_string(),
        lines: vec![
            JournalLine::debit(debit, amount),
            JournalLine::credit(credit, amount),
        ],
        created_by,
    }
}
