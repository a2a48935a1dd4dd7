//! Ledger input types for entry creation and editing.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trestle_shared::types::UserId;

use super::entry::JournalLine;
use super::validation::BALANCE_TOLERANCE;

/// Input for creating a new journal entry.
///
/// The entry number is allocated by the number generator, not supplied here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEntryInput {
    /// Accounting date of the entry.
    pub date: NaiveDate,
    /// What the entry records.
    pub description: String,
    /// Ordered debit/credit lines (at least 2).
    pub lines: Vec<JournalLine>,
    /// The user creating the entry.
    pub created_by: UserId,
}

/// Partial update of a non-posted entry.
///
/// `None` leaves the field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateEntryInput {
    /// New accounting date.
    pub date: Option<NaiveDate>,
    /// New description.
    pub description: Option<String>,
    /// Replacement line set.
    pub lines: Option<Vec<JournalLine>>,
}

impl UpdateEntryInput {
    /// Returns true if the update replaces the lines.
    #[must_use]
    pub fn touches_lines(&self) -> bool {
        self.lines.is_some()
    }

    /// Returns true if the update changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.description.is_none() && self.lines.is_none()
    }
}

/// Debit and credit totals of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of all debit amounts.
    pub total_debit: Decimal,
    /// Sum of all credit amounts.
    pub total_credit: Decimal,
}

impl EntryTotals {
    /// Sums the lines.
    #[must_use]
    pub fn from_lines(lines: &[JournalLine]) -> Self {
        Self {
            total_debit: lines.iter().map(|l| l.debit).sum(),
            total_credit: lines.iter().map(|l| l.credit).sum(),
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.total_debit - self.total_credit
    }

    /// Returns true if debits and credits agree within the balance tolerance.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.difference().abs() <= BALANCE_TOLERANCE
    }
}
