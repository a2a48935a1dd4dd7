//! Audit trail collaborator.
//!
//! Repositories record an event after each committed ledger change. Recording
//! is best effort: a failing recorder is logged and never undoes or fails the
//! ledger operation that produced the event.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use trestle_shared::types::UserId;

/// What happened to the audited entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Entity created.
    Create,
    /// Entity edited or advanced in its workflow.
    Update,
    /// Entity removed.
    Delete,
    /// Entry approved.
    Approval,
    /// Entry posted to the ledger.
    Post,
    /// Entry voided.
    Void,
}

impl AuditAction {
    /// Returns the string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Approval => "approval",
            Self::Post => "post",
            Self::Void => "void",
        }
    }
}

/// One audit trail record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Kind of entity, e.g. `journal_entry`.
    pub entity_type: String,
    /// Id of the entity.
    pub entity_id: Uuid,
    /// What happened.
    pub action: AuditAction,
    /// Action specific details.
    pub metadata: serde_json::Value,
    /// Who did it.
    pub actor_id: UserId,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl AuditEvent {
    /// Builds an event stamped with the current time.
    #[must_use]
    pub fn new(
        entity_type: impl Into<String>,
        entity_id: Uuid,
        action: AuditAction,
        actor_id: UserId,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
            action,
            metadata,
            actor_id,
            timestamp: Utc::now(),
        }
    }
}

/// Audit sink failures.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink could not accept the event.
    #[error("Audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Destination for audit events.
#[async_trait]
pub trait AuditRecorder: Send + Sync {
    /// Records one event.
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Writes events to the `audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditRecorder;

#[async_trait]
impl AuditRecorder for TracingAuditRecorder {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        info!(
            target: "audit",
            entity_type = %event.entity_type,
            entity_id = %event.entity_id,
            action = event.action.as_str(),
            actor_id = %event.actor_id,
            timestamp = %event.timestamp,
            metadata = %event.metadata,
            "audit event"
        );
        Ok(())
    }
}

/// Keeps events in memory. Useful in tests and for embedding callers that
/// ship the trail elsewhere.
#[derive(Debug, Default)]
pub struct MemoryAuditRecorder {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditRecorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every event recorded so far, oldest first.
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    /// Returns the actions recorded for one entity, oldest first.
    pub async fn actions_for(&self, entity_id: Uuid) -> Vec<AuditAction> {
        self.events
            .lock()
            .await
            .iter()
            .filter(|e| e.entity_id == entity_id)
            .map(|e| e.action)
            .collect()
    }
}

#[async_trait]
impl AuditRecorder for MemoryAuditRecorder {
    async fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Records an event, logging instead of returning a failure.
pub(crate) async fn record_quietly(recorder: &dyn AuditRecorder, event: AuditEvent) {
    let entity_id = event.entity_id;
    let action = event.action;
    if let Err(e) = recorder.record(event).await {
        warn!(
            entity_id = %entity_id,
            action = action.as_str(),
            error = %e,
            "Failed to record audit event"
        );
    }
}
