//! Property-based tests for ReversalService.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use trestle_shared::types::{AccountId, JournalEntryId, UserId};

use crate::ledger::{CreateEntryInput, JournalEntry, JournalLine, validate};
use crate::workflow::reversal::ReversalService;
use crate::workflow::types::EntryStatus;

fn amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Balanced lines: debits of the given amounts and one offsetting credit.
fn arb_balanced_lines() -> impl Strategy<Value = Vec<JournalLine>> {
    (
        prop::collection::vec(amount(), 1..6),
        prop::option::of("[a-z ]{1,20}"),
    )
        .prop_map(|(debits, memo)| {
            let total: Decimal = debits.iter().copied().sum();
            let mut lines: Vec<JournalLine> = debits
                .into_iter()
                .map(|d| JournalLine {
                    description: memo.clone(),
                    ..JournalLine::debit(AccountId::new(), d)
                })
                .collect();
            lines.push(JournalLine::credit(AccountId::new(), total));
            lines
        })
}

fn posted(lines: Vec<JournalLine>) -> JournalEntry {
    let mut entry = JournalEntry::new_draft(
        JournalEntryId::new(),
        "JE-2025-0100".to_string(),
        CreateEntryInput {
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            description: "Subcontractor invoice".to_string(),
            lines,
            created_by: UserId::new(),
        },
        Utc::now(),
    )
    .unwrap();
    entry.status = EntryStatus::Posted;
    entry
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Reversing lines are the exact per-line swap of the original lines.
    #[test]
    fn prop_reversal_is_exact_swap(lines in arb_balanced_lines()) {
        let original = posted(lines);
        let plan = ReversalService::build(
            &original,
            "Duplicate",
            UserId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        )
        .unwrap();

        prop_assert_eq!(plan.input.lines.len(), original.lines.len());
        for (o, r) in original.lines.iter().zip(&plan.input.lines) {
            prop_assert_eq!(o.account_id, r.account_id);
            prop_assert_eq!(o.debit, r.credit);
            prop_assert_eq!(o.credit, r.debit);
            prop_assert_eq!(&o.description, &r.description);
        }
    }

    /// The reversing entry passes validation and mirrors the original totals.
    #[test]
    fn prop_reversal_is_balanced(lines in arb_balanced_lines()) {
        let original = posted(lines);
        let plan = ReversalService::build(
            &original,
            "Wrong project",
            UserId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        )
        .unwrap();

        let totals = validate(&plan.input.lines).unwrap();
        prop_assert_eq!(totals.total_debit, original.total_credit);
        prop_assert_eq!(totals.total_credit, original.total_debit);
    }

    /// Only Posted entries can be reversed.
    #[test]
    fn prop_only_posted_reversible(
        lines in arb_balanced_lines(),
        status in prop::sample::select(EntryStatus::ALL.to_vec()),
    ) {
        let mut original = posted(lines);
        original.status = status;
        let result = ReversalService::build(
            &original,
            "reason",
            UserId::new(),
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
        );
        prop_assert_eq!(result.is_ok(), status == EntryStatus::Posted);
    }
}
