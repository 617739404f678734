//! Finance calculation tests
//!
//! Tests for profitability and ledgers:
//! - Break-even units always cover fixed costs
//! - Gross profit and margin
//! - Ledger running balance equals the opening balance plus invoiced minus paid

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::metrics::{
    break_even, gross_profit, invoice_totals, running_ledger, LedgerMovement, ProfitAndLoss,
};
use shared::models::InvoiceLine;

fn money(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn day(offset: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 1).unwrap() + Duration::days(offset)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Selling the break-even quantity covers fixed costs, one unit fewer does not
    #[test]
    fn prop_break_even_covers_fixed_costs(
        fixed in 0i64..100_000_000,
        price in 1i64..1_000_000,
        variable in 0i64..1_000_000,
    ) {
        let result = break_even(money(fixed), money(price), money(variable));
        let margin = money(price) - money(variable);

        match result.break_even_units {
            Some(units) => {
                prop_assert!(margin > Decimal::ZERO);
                prop_assert!(units * margin >= money(fixed));
                if units > Decimal::ZERO {
                    prop_assert!((units - Decimal::ONE) * margin < money(fixed));
                }
                prop_assert!(result.reason.is_none());
            }
            None => {
                prop_assert!(margin <= Decimal::ZERO);
                prop_assert!(result.reason.is_some());
            }
        }
    }

    #[test]
    fn prop_gross_profit(revenue in 0i64..100_000_000, cogs in 0i64..100_000_000) {
        let result = gross_profit(money(revenue), money(cogs));
        prop_assert_eq!(result.gross_profit, money(revenue) - money(cogs));
        if revenue == 0 {
            prop_assert_eq!(result.margin_percent, Decimal::ZERO);
        } else if cogs <= revenue {
            prop_assert!(result.margin_percent >= Decimal::ZERO);
            prop_assert!(result.margin_percent <= Decimal::ONE_HUNDRED);
        }
    }

    #[test]
    fn prop_ledger_balance(
        opening in 0i64..10_000_000,
        movements in prop::collection::vec((0i64..60, 0i64..1_000_000, any::<bool>()), 0..30),
    ) {
        let opening = money(opening);
        let movements: Vec<LedgerMovement> = movements
            .into_iter()
            .enumerate()
            .map(|(i, (offset, cents, is_invoice))| LedgerMovement {
                date: day(offset),
                reference: format!("REF-{}", i),
                counterparty: "Acme Castings".to_string(),
                debit: if is_invoice { money(cents) } else { Decimal::ZERO },
                credit: if is_invoice { Decimal::ZERO } else { money(cents) },
            })
            .collect();
        let invoiced: Decimal = movements.iter().map(|m| m.debit).sum();
        let paid: Decimal = movements.iter().map(|m| m.credit).sum();

        let entries = running_ledger(opening, movements);
        let closing = entries.last().map_or(opening, |e| e.balance);
        prop_assert_eq!(closing, opening + invoiced - paid);

        let mut balance = opening;
        for pair in entries.windows(2) {
            prop_assert!(pair[0].date <= pair[1].date);
        }
        for entry in &entries {
            balance += entry.debit - entry.credit;
            prop_assert_eq!(entry.balance, balance);
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_break_even_rounds_up() {
        let result = break_even(money(10_000_000), money(25_000), money(17_500));
        assert_eq!(result.contribution_margin_per_unit, money(7_500));
        assert_eq!(result.break_even_units, Some(Decimal::from(1334)));
        assert_eq!(result.break_even_revenue, Some(money(33_350_000)));
    }

    #[test]
    fn test_break_even_undefined_without_margin() {
        let result = break_even(money(100_000), money(1_000), money(1_200));
        assert_eq!(result.break_even_units, None);
        assert_eq!(result.break_even_revenue, None);
        assert_eq!(
            result.reason.as_deref(),
            Some("Selling price does not exceed variable cost per unit")
        );
    }

    #[test]
    fn test_profit_and_loss() {
        let statement = ProfitAndLoss::new(money(500_000), money(300_000), money(80_000), money(20_000));
        assert_eq!(statement.gross_profit, money(200_000));
        assert_eq!(statement.net_profit, money(100_000));
        assert_eq!(statement.net_margin_percent, Decimal::from(20));
    }

    #[test]
    fn test_invoice_totals() {
        let lines = vec![
            InvoiceLine {
                description: "Gear housing".to_string(),
                quantity: Decimal::from(10),
                unit_price: money(45_000),
                tax_rate_percent: Decimal::from(18),
            },
            InvoiceLine {
                description: "Freight".to_string(),
                quantity: Decimal::ONE,
                unit_price: money(120_000),
                tax_rate_percent: Decimal::ZERO,
            },
        ];
        let totals = invoice_totals(&lines).unwrap();
        assert_eq!(totals.subtotal, money(570_000));
        assert_eq!(totals.tax_amount, money(81_000));
        assert_eq!(totals.total_amount, money(651_000));
    }

    #[test]
    fn test_ledger_keeps_same_day_order() {
        let entries = running_ledger(Decimal::ZERO, vec![
            LedgerMovement {
                date: day(3),
                reference: "INV-2".to_string(),
                counterparty: "Acme".to_string(),
                debit: money(5_000),
                credit: Decimal::ZERO,
            },
            LedgerMovement {
                date: day(1),
                reference: "INV-1".to_string(),
                counterparty: "Acme".to_string(),
                debit: money(10_000),
                credit: Decimal::ZERO,
            },
            LedgerMovement {
                date: day(3),
                reference: "PAY-1".to_string(),
                counterparty: "Acme".to_string(),
                debit: Decimal::ZERO,
                credit: money(10_000),
            },
        ]);
        let references: Vec<&str> = entries.iter().map(|e| e.reference.as_str()).collect();
        assert_eq!(references, vec!["INV-1", "INV-2", "PAY-1"]);
        assert_eq!(entries[2].balance, money(5_000));
    }
}
