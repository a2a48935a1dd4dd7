//! Posting plan: the per-account balance deltas an entry produces.
//!
//! The plan is computed up front so that an unknown account is reported before
//! any balance is touched. Deltas are aggregated per account and ordered by
//! account id, which gives concurrent postings a consistent lock order.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use trestle_shared::types::{AccountId, JournalEntryId};

use super::balance::AccountType;
use super::entry::JournalLine;
use super::error::LedgerError;

/// Signed change to one account's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceDelta {
    /// The account affected.
    pub account_id: AccountId,
    /// Type of that account.
    pub account_type: AccountType,
    /// Signed change to apply.
    pub delta: Decimal,
}

/// All balance changes for posting one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingPlan {
    /// The entry being posted.
    pub entry_id: JournalEntryId,
    /// Non-zero deltas, ascending by account id.
    pub deltas: Vec<BalanceDelta>,
}

impl PostingPlan {
    /// Builds the plan for `lines`.
    ///
    /// `account_type` resolves an account id; `None` means the account does not
    /// exist and yields `ACCOUNT_NOT_FOUND`. Accounts whose lines cancel out are
    /// omitted from the plan.
    pub fn build<F>(
        entry_id: JournalEntryId,
        lines: &[JournalLine],
        account_type: F,
    ) -> Result<Self, LedgerError>
    where
        F: Fn(AccountId) -> Option<AccountType>,
    {
        let mut per_account: BTreeMap<AccountId, (AccountType, Decimal)> = BTreeMap::new();

        for line in lines {
            let kind = account_type(line.account_id)
                .ok_or(LedgerError::AccountNotFound(line.account_id))?;
            let change = kind.balance_change(line.debit, line.credit);
            per_account
                .entry(line.account_id)
                .and_modify(|(_, total)| *total += change)
                .or_insert((kind, change));
        }

        let deltas = per_account
            .into_iter()
            .filter(|(_, (_, delta))| !delta.is_zero())
            .map(|(account_id, (account_type, delta))| BalanceDelta {
                account_id,
                account_type,
                delta,
            })
            .collect();

        Ok(Self { entry_id, deltas })
    }

    /// Returns the delta for one account, zero if untouched.
    #[must_use]
    pub fn delta_for(&self, account_id: AccountId) -> Decimal {
        self.deltas
            .iter()
            .find(|d| d.account_id == account_id)
            .map_or(Decimal::ZERO, |d| d.delta)
    }

    /// Returns true if posting changes no balance.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}
