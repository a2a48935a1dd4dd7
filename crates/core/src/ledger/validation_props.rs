//! Property-based tests for journal line validation rules.

use proptest::prelude::*;
use rust_decimal::Decimal;
use trestle_shared::types::AccountId;

use super::entry::JournalLine;
use super::validation::{BALANCE_TOLERANCE, ValidationError, validate};

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a negative amount.
fn negative_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// Strategy for a list of positive amounts.
fn amounts(max_len: usize) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(positive_amount(), 1..=max_len)
}

fn line(debit: Decimal, credit: Decimal) -> JournalLine {
    JournalLine {
        account_id: AccountId::new(),
        debit,
        credit,
        description: None,
    }
}

/// Debits from `debits`, plus one credit line for their sum.
fn balanced_lines(debits: &[Decimal]) -> Vec<JournalLine> {
    let total: Decimal = debits.iter().copied().sum();
    let mut lines: Vec<JournalLine> = debits.iter().map(|d| line(*d, Decimal::ZERO)).collect();
    lines.push(line(Decimal::ZERO, total));
    lines
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any set of debits offset by one credit of the same total is accepted,
    /// and the returned totals match the line sums.
    #[test]
    fn prop_balanced_entry_accepted(debits in amounts(8)) {
        let lines = balanced_lines(&debits);
        let totals = validate(&lines);
        prop_assert!(totals.is_ok(), "balanced entry rejected: {:?}", totals);
        let totals = totals.unwrap();
        prop_assert_eq!(totals.total_debit, totals.total_credit);
        prop_assert_eq!(totals.total_debit, debits.iter().copied().sum::<Decimal>());
    }

    /// Any imbalance larger than the tolerance is rejected as unbalanced.
    #[test]
    fn prop_imbalance_beyond_tolerance_rejected(
        debits in amounts(6),
        excess in positive_amount(),
    ) {
        let skew = excess + BALANCE_TOLERANCE;
        let mut lines = balanced_lines(&debits);
        lines[0].debit += skew;

        let result = validate(&lines);
        prop_assert!(
            matches!(result, Err(ValidationError::UnbalancedEntry { .. })),
            "expected UNBALANCED_ENTRY, got {:?}",
            result
        );
    }

    /// Imbalances up to one cent are tolerated.
    #[test]
    fn prop_rounding_within_tolerance_accepted(
        debits in amounts(6),
        skew_thousandths in 0i64..=10,
    ) {
        let mut lines = balanced_lines(&debits);
        lines[0].debit += Decimal::new(skew_thousandths, 3);
        prop_assert!(validate(&lines).is_ok());
    }

    /// A negative amount anywhere is rejected, and the reported line is 1-based.
    #[test]
    fn prop_negative_amount_rejected(
        debits in amounts(6),
        neg in negative_amount(),
        position in any::<prop::sample::Index>(),
    ) {
        let mut lines = balanced_lines(&debits);
        let index = position.index(lines.len());
        lines[index] = line(neg, Decimal::ZERO);

        prop_assert_eq!(
            validate(&lines),
            Err(ValidationError::NegativeAmount { line_number: index + 1 })
        );
    }

    /// A line with both sides positive is rejected before the balance check.
    #[test]
    fn prop_dual_posting_rejected(
        debits in amounts(6),
        a in positive_amount(),
        b in positive_amount(),
        position in any::<prop::sample::Index>(),
    ) {
        let mut lines = balanced_lines(&debits);
        let index = position.index(lines.len());
        lines[index] = line(a, b);

        prop_assert_eq!(
            validate(&lines),
            Err(ValidationError::DualPostingLine { line_number: index + 1 })
        );
    }

    /// Fewer than two lines is always rejected, whatever the amounts.
    #[test]
    fn prop_single_line_rejected(amount in positive_amount()) {
        let lines = vec![line(amount, Decimal::ZERO)];
        prop_assert_eq!(
            validate(&lines),
            Err(ValidationError::InsufficientLines { count: 1 })
        );
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_empty_entry_rejected() {
        assert_eq!(
            validate(&[]),
            Err(ValidationError::InsufficientLines { count: 0 })
        );
    }

    #[test]
    fn test_zero_amount_lines_allowed_when_balanced() {
        let lines = vec![
            line(Decimal::new(100, 2), Decimal::ZERO),
            line(Decimal::ZERO, Decimal::ZERO),
            line(Decimal::ZERO, Decimal::new(100, 2)),
        ];
        assert!(validate(&lines).is_ok());
    }
}
