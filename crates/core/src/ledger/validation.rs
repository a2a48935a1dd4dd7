//! Double-entry validation rules.

use rust_decimal::Decimal;
use thiserror::Error;

use super::entry::JournalLine;
use super::types::EntryTotals;

/// Largest debit/credit difference still treated as balanced (0.01).
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Minimum number of lines in a journal entry.
pub const MIN_LINES: usize = 2;

/// Validation errors for proposed journal entries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Fewer than two lines.
    #[error("Journal entry must have at least 2 lines, got {count}")]
    InsufficientLines {
        /// Number of lines supplied.
        count: usize,
    },

    /// A line carries both a debit and a credit.
    #[error("Line {line_number} has both a debit and a credit amount")]
    DualPostingLine {
        /// 1-based position of the offending line.
        line_number: usize,
    },

    /// A line carries a negative amount.
    #[error("Line {line_number} has a negative amount")]
    NegativeAmount {
        /// 1-based position of the offending line.
        line_number: usize,
    },

    /// Debits and credits differ by more than the tolerance.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },
}

impl ValidationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines { .. } => "INSUFFICIENT_LINES",
            Self::DualPostingLine { .. } => "DUAL_POSTING_LINE",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
        }
    }
}

/// Validates a proposed set of journal lines.
///
/// Checks, in order: line count, dual-posting lines, negative amounts, balance.
/// The first failing check wins. Returns the totals on success.
pub fn validate(lines: &[JournalLine]) -> Result<EntryTotals, ValidationError> {
    if lines.len() < MIN_LINES {
        return Err(ValidationError::InsufficientLines { count: lines.len() });
    }

    if let Some(index) = lines.iter().position(JournalLine::is_dual_posting) {
        return Err(ValidationError::DualPostingLine {
            line_number: index + 1,
        });
    }

    if let Some(index) = lines.iter().position(JournalLine::has_negative_amount) {
        return Err(ValidationError::NegativeAmount {
            line_number: index + 1,
        });
    }

    let totals = EntryTotals::from_lines(lines);
    if !totals.is_balanced() {
        return Err(ValidationError::UnbalancedEntry {
            debit: totals.total_debit,
            credit: totals.total_credit,
        });
    }

    Ok(totals)
}
