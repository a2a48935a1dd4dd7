//! Journal entry workflow management.
//!
//! This module implements the entry lifecycle state machine and the
//! builder for reversing entries used when voiding.
//!
//! # Modules
//!
//! - `types` - Workflow domain types (EntryStatus, WorkflowAction)
//! - `error` - Workflow-specific error types
//! - `service` - State transition logic
//! - `reversal` - Reversing entry construction

pub mod error;
pub mod reversal;
pub mod service;
pub mod types;

#[cfg(test)]
mod reversal_props;
#[cfg(test)]
mod service_props;

pub use error::WorkflowError;
pub use reversal::{ReversalPlan, ReversalService};
pub use service::WorkflowService;
pub use types::{EntryStatus, WorkflowAction};
