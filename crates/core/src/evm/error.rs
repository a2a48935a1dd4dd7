//! EVM input errors.

use rust_decimal::Decimal;
use thiserror::Error;
use trestle_shared::types::TaskId;

/// Invalid EVM input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvmError {
    /// Progress outside [0, 1].
    #[error("Task {task_id} progress {progress} is outside [0, 1]")]
    ProgressOutOfRange {
        /// The offending task.
        task_id: TaskId,
        /// The reported progress.
        progress: Decimal,
    },

    /// Planned end before planned start.
    #[error("Task {task_id} ends before it starts")]
    InvalidSchedule {
        /// The offending task.
        task_id: TaskId,
    },

    /// Negative planned or actual cost.
    #[error("Task {task_id} has a negative cost")]
    NegativeCost {
        /// The offending task.
        task_id: TaskId,
    },
}

impl EvmError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ProgressOutOfRange { .. } => "PROGRESS_OUT_OF_RANGE",
            Self::InvalidSchedule { .. } => "INVALID_SCHEDULE",
            Self::NegativeCost { .. } => "NEGATIVE_COST",
        }
    }
}
