//! Property-based tests for posting plans.

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use trestle_shared::types::{AccountId, JournalEntryId};

use super::balance::AccountType;
use super::entry::JournalLine;
use super::posting::PostingPlan;

fn account_type() -> impl Strategy<Value = AccountType> {
    prop_oneof![
        Just(AccountType::Asset),
        Just(AccountType::Liability),
        Just(AccountType::Equity),
        Just(AccountType::Revenue),
        Just(AccountType::Expense),
    ]
}

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// A chart of 2..6 accounts and 2..10 lines drawn against it.
fn chart_and_lines()
-> impl Strategy<Value = (HashMap<AccountId, AccountType>, Vec<JournalLine>)> {
    prop::collection::vec(account_type(), 2..6).prop_flat_map(|types| {
        let accounts: Vec<(AccountId, AccountType)> =
            types.into_iter().map(|t| (AccountId::new(), t)).collect();
        let ids: Vec<AccountId> = accounts.iter().map(|(id, _)| *id).collect();
        let chart: HashMap<AccountId, AccountType> = accounts.into_iter().collect();
        let line = (prop::sample::select(ids), amount(), any::<bool>()).prop_map(
            |(account_id, amount, is_debit)| {
                if is_debit {
                    JournalLine::debit(account_id, amount)
                } else {
                    JournalLine::credit(account_id, amount)
                }
            },
        );
        (Just(chart), prop::collection::vec(line, 2..10))
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Deltas are strictly ascending by account id and never zero.
    #[test]
    fn prop_deltas_ordered_and_non_zero((chart, lines) in chart_and_lines()) {
        let plan = PostingPlan::build(JournalEntryId::new(), &lines, |id| chart.get(&id).copied())
            .unwrap();
        for pair in plan.deltas.windows(2) {
            prop_assert!(pair[0].account_id < pair[1].account_id);
        }
        prop_assert!(plan.deltas.iter().all(|d| !d.delta.is_zero()));
    }

    /// Each account's delta equals the sum of its lines' signed changes.
    #[test]
    fn prop_delta_matches_line_sum((chart, lines) in chart_and_lines()) {
        let plan = PostingPlan::build(JournalEntryId::new(), &lines, |id| chart.get(&id).copied())
            .unwrap();
        for (account_id, kind) in &chart {
            let expected: Decimal = lines
                .iter()
                .filter(|l| l.account_id == *account_id)
                .map(|l| kind.balance_change(l.debit, l.credit))
                .sum();
            prop_assert_eq!(plan.delta_for(*account_id), expected);
        }
    }

    /// Posting the swapped lines undoes every delta.
    #[test]
    fn prop_swapped_lines_negate_plan((chart, lines) in chart_and_lines()) {
        let reversed: Vec<JournalLine> = lines.iter().map(JournalLine::swapped).collect();
        let forward = PostingPlan::build(JournalEntryId::new(), &lines, |id| chart.get(&id).copied())
            .unwrap();
        let backward =
            PostingPlan::build(JournalEntryId::new(), &reversed, |id| chart.get(&id).copied())
                .unwrap();
        for account_id in chart.keys() {
            prop_assert_eq!(
                forward.delta_for(*account_id) + backward.delta_for(*account_id),
                Decimal::ZERO
            );
        }
    }
}
