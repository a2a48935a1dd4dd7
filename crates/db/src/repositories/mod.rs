//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod account;
pub mod evm_snapshot;
pub mod journal;
pub(crate) mod mutation;
pub(crate) mod posting;
pub mod sequence;
pub mod workflow;

pub use account::{AccountRepository, OpenAccountInput};
pub use evm_snapshot::{EvmSnapshotRepository, EvmStoreError, StoredSnapshot};
pub use journal::JournalRepository;
pub use sequence::SequenceRepository;
pub use workflow::{VoidResult, WorkflowRepository};

use std::str::FromStr;

use rust_decimal::Decimal;

use trestle_core::ledger::LedgerError;

#[cfg(test)]
pub(crate) async fn memory_db() -> sea_orm::DatabaseConnection {
    use crate::migration::{Migrator, MigratorTrait};

    let config = trestle_shared::config::DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
    };
    let db = crate::connect(&config).await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

/// Parses a stored decimal column.
pub(crate) fn parse_decimal(column: &str, value: &str) -> Result<Decimal, LedgerError> {
    Decimal::from_str(value)
        .map_err(|e| LedgerError::Storage(format!("unreadable {column} '{value}': {e}")))
}
