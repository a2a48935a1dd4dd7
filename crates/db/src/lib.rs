//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories for journal entries, workflow, accounts, numbering and EVM snapshots
//! - Database migrations
//! - Retry and timeout policy for storage calls
//! - The audit recorder collaborator

pub mod audit;
pub mod entities;
pub mod migration;
pub mod repositories;
pub mod resilience;

pub use audit::{AuditAction, AuditEvent, AuditRecorder, MemoryAuditRecorder, TracingAuditRecorder};
pub use repositories::{
    AccountRepository, EvmSnapshotRepository, EvmStoreError, JournalRepository,
    SequenceRepository, StoredSnapshot, VoidResult, WorkflowRepository,
};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use trestle_shared::config::DatabaseConfig;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);
    Database::connect(options).await
}
