//! Double-entry journal logic.
//!
//! This module implements the core ledger functionality:
//! - Journal entries and their ordered debit/credit lines
//! - Input types for creating and editing entries
//! - The validation engine enforcing the double-entry invariants
//! - Account-type sign conventions and versioned balances
//! - Posting plans (per-account balance deltas)
//! - Entry numbering
//! - Error types for ledger operations

pub mod balance;
pub mod entry;
pub mod error;
pub mod numbering;
pub mod posting;
pub mod types;
pub mod validation;

#[cfg(test)]
mod posting_props;
#[cfg(test)]
mod validation_props;

pub use balance::{AccountType, NormalBalance, VersionedBalance};
pub use entry::{JournalEntry, JournalLine};
pub use error::{ErrorKind, LedgerError};
pub use numbering::{format_entry_number, parse_entry_number, period_key};
pub use posting::{BalanceDelta, PostingPlan};
pub use types::{CreateEntryInput, EntryTotals, UpdateEntryInput};
pub use validation::{BALANCE_TOLERANCE, ValidationError, validate};
