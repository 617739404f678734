//! Derived metrics shared by the server and the browser
//!
//! Every figure the API reports (stock intake cost, remaining quantity, OEE,
//! gross profit, break-even, bottleneck ranking, scrap Pareto, ledger
//! balance) is computed here so both sides agree to the last decimal.

use std::cmp::Ordering;
use std::iter::Sum;
use std::ops::Add;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{InvoiceLine, OrderStatus};

const RATIO_DP: u32 = 4;
const MONEY_DP: u32 = 2;

// ============================================================================
// Quantities and costs
// ============================================================================

/// Formula: quantity × price per unit, `None` when the product overflows
pub fn total_cost(quantity: Decimal, price_per_unit: Decimal) -> Option<Decimal> {
    quantity.checked_mul(price_per_unit)
}

/// Formula: ordered - delivered, never below zero
pub fn remaining_quantity(quantity_ordered: Decimal, quantity_delivered: Decimal) -> Decimal {
    (quantity_ordered - quantity_delivered).max(Decimal::ZERO)
}

/// Cost of `minutes` of machine time at an hourly operating cost
pub fn machine_time_cost(minutes: Decimal, hourly_cost: Decimal) -> Decimal {
    minutes * hourly_cost / Decimal::from(60)
}

/// Units that passed first time: total - scrap - rework, never below zero
pub fn good_count(total_output: Decimal, scrap: Decimal, rework: Decimal) -> Decimal {
    (total_output - scrap - rework).max(Decimal::ZERO)
}

/// `part / whole` as a fraction, 0 when `whole` is not positive
pub fn ratio(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (part / whole).round_dp(RATIO_DP)
}

/// `part / whole × 100`, 0 when `whole` is not positive
pub fn percent(part: Decimal, whole: Decimal) -> Decimal {
    if whole <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    (part / whole * Decimal::ONE_HUNDRED).round_dp(MONEY_DP)
}

// ============================================================================
// Deliveries
// ============================================================================

/// Why a delivery against an order cannot be accepted
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Delivered quantity must be greater than zero")]
    NonPositiveQuantity,

    #[error("Order is {0} and cannot take deliveries")]
    OrderNotOpen(OrderStatus),

    #[error("Delivered quantity {requested} exceeds remaining quantity {remaining}")]
    ExceedsRemaining {
        requested: Decimal,
        remaining: Decimal,
    },

    #[error("Payment amount must be greater than zero")]
    NonPositivePayment,

    #[error("Payment {amount} exceeds outstanding balance {outstanding}")]
    PaymentExceedsBalance {
        amount: Decimal,
        outstanding: Decimal,
    },
}

/// Whether `quantity` may be delivered against an order in `status` with
/// `remaining` units left
pub fn check_delivery(
    status: OrderStatus,
    remaining: Decimal,
    quantity: Decimal,
) -> Result<(), DeliveryError> {
    if quantity <= Decimal::ZERO {
        return Err(DeliveryError::NonPositiveQuantity);
    }
    if status != OrderStatus::InProgress {
        return Err(DeliveryError::OrderNotOpen(status));
    }
    if quantity > remaining {
        return Err(DeliveryError::ExceedsRemaining {
            requested: quantity,
            remaining,
        });
    }
    Ok(())
}

/// Whether a payment of `amount` may be recorded against `outstanding`
pub fn check_payment(outstanding: Decimal, amount: Decimal) -> Result<(), DeliveryError> {
    if amount <= Decimal::ZERO {
        return Err(DeliveryError::NonPositivePayment);
    }
    if amount > outstanding {
        return Err(DeliveryError::PaymentExceedsBalance {
            amount,
            outstanding,
        });
    }
    Ok(())
}

/// Status of an open order once `remaining` units are left
pub fn status_after_delivery(remaining: Decimal) -> OrderStatus {
    if remaining <= Decimal::ZERO {
        OrderStatus::Completed
    } else {
        OrderStatus::InProgress
    }
}

// ============================================================================
// OEE
// ============================================================================

/// Summable OEE inputs for one run or many
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OeeInputs {
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    /// Σ ideal cycle seconds × total output
    pub ideal_output_seconds: Decimal,
    pub total_output: Decimal,
    pub good_output: Decimal,
}

impl OeeInputs {
    pub fn for_run(
        planned_minutes: Decimal,
        run_minutes: Decimal,
        ideal_cycle_time_seconds: Decimal,
        total_output: Decimal,
        scrap: Decimal,
        rework: Decimal,
    ) -> Self {
        Self {
            planned_minutes,
            run_minutes,
            ideal_output_seconds: ideal_cycle_time_seconds * total_output,
            total_output,
            good_output: good_count(total_output, scrap, rework),
        }
    }
}

impl Add for OeeInputs {
    type Output = OeeInputs;

    fn add(self, other: OeeInputs) -> OeeInputs {
        OeeInputs {
            planned_minutes: self.planned_minutes + other.planned_minutes,
            run_minutes: self.run_minutes + other.run_minutes,
            ideal_output_seconds: self.ideal_output_seconds + other.ideal_output_seconds,
            total_output: self.total_output + other.total_output,
            good_output: self.good_output + other.good_output,
        }
    }
}

impl Sum for OeeInputs {
    fn sum<I: Iterator<Item = OeeInputs>>(iter: I) -> Self {
        iter.fold(OeeInputs::default(), Add::add)
    }
}

/// OEE and its three factors, each a fraction in [0, 1]
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OeeBreakdown {
    pub availability: Decimal,
    pub performance: Decimal,
    pub quality: Decimal,
    pub oee: Decimal,
}

/// Availability × performance × quality
pub fn oee(inputs: &OeeInputs) -> OeeBreakdown {
    let availability = ratio(inputs.run_minutes, inputs.planned_minutes).min(Decimal::ONE);
    let performance = ratio(
        inputs.ideal_output_seconds,
        inputs.run_minutes * Decimal::from(60),
    )
    .min(Decimal::ONE);
    let quality = ratio(inputs.good_output, inputs.total_output).min(Decimal::ONE);

    OeeBreakdown {
        availability,
        performance,
        quality,
        oee: (availability * performance * quality).round_dp(RATIO_DP),
    }
}

// ============================================================================
// Profitability
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GrossProfit {
    pub revenue: Decimal,
    pub cost_of_goods_sold: Decimal,
    pub gross_profit: Decimal,
    pub margin_percent: Decimal,
}

/// Formula: revenue - COGS; margin = gross / revenue × 100
pub fn gross_profit(revenue: Decimal, cost_of_goods_sold: Decimal) -> GrossProfit {
    let gross = revenue - cost_of_goods_sold;
    GrossProfit {
        revenue,
        cost_of_goods_sold,
        gross_profit: gross,
        margin_percent: if revenue.is_zero() {
            Decimal::ZERO
        } else {
            (gross / revenue * Decimal::ONE_HUNDRED).round_dp(MONEY_DP)
        },
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BreakEven {
    pub fixed_costs: Decimal,
    pub selling_price: Decimal,
    pub variable_cost_per_unit: Decimal,
    pub contribution_margin_per_unit: Decimal,
    /// None when each unit sold does not cover its own variable cost
    pub break_even_units: Option<Decimal>,
    pub break_even_revenue: Option<Decimal>,
    pub reason: Option<String>,
}

/// Formula: ceil(fixed costs / (price - variable cost per unit))
pub fn break_even(
    fixed_costs: Decimal,
    selling_price: Decimal,
    variable_cost_per_unit: Decimal,
) -> BreakEven {
    let margin = selling_price - variable_cost_per_unit;
    let mut result = BreakEven {
        fixed_costs,
        selling_price,
        variable_cost_per_unit,
        contribution_margin_per_unit: margin,
        ..Default::default()
    };

    if margin <= Decimal::ZERO {
        result.reason =
            Some("Selling price does not exceed variable cost per unit".to_string());
        return result;
    }

    let units = (fixed_costs.max(Decimal::ZERO) / margin).ceil();
    result.break_even_units = Some(units);
    result.break_even_revenue = Some((units * selling_price).round_dp(MONEY_DP));
    result
}

/// Monthly profit and loss statement
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfitAndLoss {
    pub revenue: Decimal,
    pub cost_of_goods_sold: Decimal,
    pub gross_profit: Decimal,
    pub fixed_costs: Decimal,
    pub variable_costs: Decimal,
    pub net_profit: Decimal,
    pub net_margin_percent: Decimal,
}

impl ProfitAndLoss {
    pub fn new(
        revenue: Decimal,
        cost_of_goods_sold: Decimal,
        fixed_costs: Decimal,
        variable_costs: Decimal,
    ) -> Self {
        let gross = gross_profit(revenue, cost_of_goods_sold);
        let net = gross.gross_profit - fixed_costs - variable_costs;
        Self {
            revenue,
            cost_of_goods_sold,
            gross_profit: gross.gross_profit,
            fixed_costs,
            variable_costs,
            net_profit: net,
            net_margin_percent: if revenue.is_zero() {
                Decimal::ZERO
            } else {
                (net / revenue * Decimal::ONE_HUNDRED).round_dp(MONEY_DP)
            },
        }
    }
}

// ============================================================================
// Production analysis
// ============================================================================

/// Run time against planned time, capped at 1
pub fn utilisation(run_minutes: Decimal, planned_minutes: Decimal) -> Decimal {
    ratio(run_minutes, planned_minutes).min(Decimal::ONE)
}

/// Load of one machine over a window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MachineLoad {
    pub machine_id: Uuid,
    pub machine_name: String,
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    pub downtime_minutes: Decimal,
    pub utilisation: Decimal,
    pub rank: usize,
}

impl MachineLoad {
    pub fn new(
        machine_id: Uuid,
        machine_name: String,
        planned_minutes: Decimal,
        run_minutes: Decimal,
    ) -> Self {
        Self {
            machine_id,
            machine_name,
            planned_minutes,
            run_minutes,
            downtime_minutes: (planned_minutes - run_minutes).max(Decimal::ZERO),
            utilisation: utilisation(run_minutes, planned_minutes),
            rank: 0,
        }
    }
}

/// Busiest machines first; ties go to the one with more downtime
pub fn rank_bottlenecks(mut loads: Vec<MachineLoad>) -> Vec<MachineLoad> {
    loads.sort_by(|a, b| {
        b.utilisation
            .cmp(&a.utilisation)
            .then_with(|| b.downtime_minutes.cmp(&a.downtime_minutes))
            .then_with(|| a.machine_name.cmp(&b.machine_name))
    });
    for (i, load) in loads.iter_mut().enumerate() {
        load.rank = i + 1;
    }
    loads
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParetoEntry {
    pub reason: String,
    pub quantity: Decimal,
    pub share_percent: Decimal,
    pub cumulative_percent: Decimal,
}

/// Scrap per reason, largest first, with share and cumulative share
pub fn pareto(totals: Vec<(String, Decimal)>) -> Vec<ParetoEntry> {
    let mut totals: Vec<_> = totals
        .into_iter()
        .filter(|(_, q)| *q > Decimal::ZERO)
        .collect();
    totals.sort_by(|a, b| match b.1.cmp(&a.1) {
        Ordering::Equal => a.0.cmp(&b.0),
        other => other,
    });

    let grand_total: Decimal = totals.iter().map(|(_, q)| *q).sum();
    let mut running = Decimal::ZERO;
    totals
        .into_iter()
        .map(|(reason, quantity)| {
            running += quantity;
            ParetoEntry {
                reason,
                quantity,
                share_percent: percent(quantity, grand_total),
                cumulative_percent: percent(running, grand_total),
            }
        })
        .collect()
}

/// Produced against planned quantity, as a percentage
pub fn plan_progress_percent(produced: Decimal, planned: Decimal) -> Decimal {
    percent(produced, planned)
}

// ============================================================================
// Invoices and ledger
// ============================================================================

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
}

/// Sums of the line subtotals and taxes; `None` when a figure overflows
pub fn invoice_totals(lines: &[InvoiceLine]) -> Option<InvoiceTotals> {
    let mut subtotal = Decimal::ZERO;
    let mut tax_amount = Decimal::ZERO;
    for line in lines {
        subtotal = subtotal.checked_add(line.subtotal()?)?;
        tax_amount = tax_amount.checked_add(line.tax()?)?;
    }
    Some(InvoiceTotals {
        subtotal: subtotal.round_dp(MONEY_DP),
        tax_amount,
        total_amount: subtotal.checked_add(tax_amount)?.round_dp(MONEY_DP),
    })
}

/// An invoice (debit) or payment (credit) against a counterparty
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerMovement {
    pub date: NaiveDate,
    pub reference: String,
    pub counterparty: String,
    pub debit: Decimal,
    pub credit: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LedgerEntry {
    pub date: NaiveDate,
    pub reference: String,
    pub counterparty: String,
    pub debit: Decimal,
    pub credit: Decimal,
    pub balance: Decimal,
}

/// Date-ordered movements with a running balance (debits minus credits),
/// starting from the balance brought forward from before the first movement.
/// Movements on the same date keep their input order.
pub fn running_ledger(
    opening_balance: Decimal,
    mut movements: Vec<LedgerMovement>,
) -> Vec<LedgerEntry> {
    movements.sort_by_key(|m| m.date);
    let mut balance = opening_balance;
    movements
        .into_iter()
        .map(|m| {
            balance += m.debit - m.credit;
            LedgerEntry {
                date: m.date,
                reference: m.reference,
                counterparty: m.counterparty,
                debit: m.debit,
                credit: m.credit,
                balance,
            }
        })
        .collect()
}

/// Convert a fraction to f64 for charting clients
pub fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_total_cost() {
        assert_eq!(total_cost(dec("120.5"), dec("42")), Some(dec("5061")));
        assert_eq!(total_cost(Decimal::ZERO, dec("42")), Some(Decimal::ZERO));
    }

    #[test]
    fn test_total_cost_overflow() {
        assert_eq!(total_cost(Decimal::MAX, dec("2")), None);
        let line = InvoiceLine {
            description: "Bulk".into(),
            quantity: Decimal::MAX,
            unit_price: dec("2"),
            tax_rate_percent: Decimal::ZERO,
        };
        assert_eq!(invoice_totals(&[line]), None);
    }

    #[test]
    fn test_remaining_quantity() {
        assert_eq!(remaining_quantity(dec("100"), dec("35")), dec("65"));
        assert_eq!(remaining_quantity(dec("100"), dec("120")), Decimal::ZERO);
    }

    #[test]
    fn test_check_delivery() {
        let open = OrderStatus::InProgress;
        assert!(check_delivery(open, dec("10"), dec("10")).is_ok());
        assert_eq!(
            check_delivery(open, dec("10"), dec("10.5")),
            Err(DeliveryError::ExceedsRemaining {
                requested: dec("10.5"),
                remaining: dec("10"),
            })
        );
        assert_eq!(
            check_delivery(open, dec("10"), Decimal::ZERO),
            Err(DeliveryError::NonPositiveQuantity)
        );
        assert_eq!(
            check_delivery(OrderStatus::Cancelled, dec("10"), dec("1")),
            Err(DeliveryError::OrderNotOpen(OrderStatus::Cancelled))
        );
    }

    #[test]
    fn test_check_payment() {
        assert!(check_payment(dec("500"), dec("500")).is_ok());
        assert!(check_payment(dec("500"), dec("500.01")).is_err());
        assert_eq!(
            check_payment(dec("500"), Decimal::ZERO),
            Err(DeliveryError::NonPositivePayment)
        );
    }

    #[test]
    fn test_status_after_delivery() {
        assert_eq!(status_after_delivery(Decimal::ZERO), OrderStatus::Completed);
        assert_eq!(status_after_delivery(dec("1")), OrderStatus::InProgress);
    }

    #[test]
    fn test_oee_single_run() {
        // 480 planned, 400 run, 30s cycle, 700 made, 21 scrap, 14 rework
        let inputs = OeeInputs::for_run(
            dec("480"),
            dec("400"),
            dec("30"),
            dec("700"),
            dec("21"),
            dec("14"),
        );
        let result = oee(&inputs);
        assert_eq!(result.availability, dec("0.8333"));
        assert_eq!(result.performance, dec("0.875"));
        assert_eq!(result.quality, dec("0.95"));
        assert_eq!(
            result.oee,
            (result.availability * result.performance * result.quality).round_dp(4)
        );
    }

    #[test]
    fn test_oee_zero_denominators() {
        let result = oee(&OeeInputs::default());
        assert_eq!(result, OeeBreakdown::default());
    }

    #[test]
    fn test_oee_performance_capped() {
        let inputs = OeeInputs::for_run(
            dec("60"),
            dec("10"),
            dec("60"),
            dec("100"),
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert_eq!(oee(&inputs).performance, Decimal::ONE);
    }

    #[test]
    fn test_oee_inputs_sum() {
        let a = OeeInputs::for_run(dec("60"), dec("50"), dec("10"), dec("200"), dec("5"), dec("0"));
        let b = OeeInputs::for_run(dec("60"), dec("40"), dec("20"), dec("100"), dec("0"), dec("5"));
        let total: OeeInputs = vec![a, b].into_iter().sum();
        assert_eq!(total.planned_minutes, dec("120"));
        assert_eq!(total.ideal_output_seconds, dec("4000"));
        assert_eq!(total.good_output, dec("290"));
    }

    #[test]
    fn test_gross_profit() {
        let result = gross_profit(dec("200000"), dec("150000"));
        assert_eq!(result.gross_profit, dec("50000"));
        assert_eq!(result.margin_percent, dec("25"));
        assert_eq!(gross_profit(Decimal::ZERO, dec("10")).margin_percent, Decimal::ZERO);
    }

    #[test]
    fn test_break_even() {
        let result = break_even(dec("100000"), dec("250"), dec("175"));
        assert_eq!(result.contribution_margin_per_unit, dec("75"));
        assert_eq!(result.break_even_units, Some(dec("1334")));
        assert_eq!(result.break_even_revenue, Some(dec("333500")));
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_break_even_without_margin() {
        let result = break_even(dec("100000"), dec("150"), dec("150"));
        assert!(result.break_even_units.is_none());
        assert!(result.reason.is_some());
    }

    #[test]
    fn test_profit_and_loss() {
        let pnl = ProfitAndLoss::new(dec("500000"), dec("300000"), dec("80000"), dec("20000"));
        assert_eq!(pnl.gross_profit, dec("200000"));
        assert_eq!(pnl.net_profit, dec("100000"));
        assert_eq!(pnl.net_margin_percent, dec("20"));
    }

    #[test]
    fn test_rank_bottlenecks() {
        let loads = vec![
            MachineLoad::new(Uuid::new_v4(), "Press".into(), dec("480"), dec("300")),
            MachineLoad::new(Uuid::new_v4(), "Lathe".into(), dec("480"), dec("470")),
            MachineLoad::new(Uuid::new_v4(), "Mill".into(), dec("960"), dec("600")),
        ];
        let ranked = rank_bottlenecks(loads);
        let names: Vec<&str> = ranked.iter().map(|l| l.machine_name.as_str()).collect();
        // Press and Mill share 0.625 utilisation; Mill has more downtime
        assert_eq!(names, vec!["Lathe", "Mill", "Press"]);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[2].downtime_minutes, dec("180"));
    }

    #[test]
    fn test_pareto() {
        let entries = pareto(vec![
            ("Burr".to_string(), dec("10")),
            ("Crack".to_string(), dec("60")),
            ("Unused".to_string(), Decimal::ZERO),
            ("Dent".to_string(), dec("30")),
        ]);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].reason, "Crack");
        assert_eq!(entries[0].share_percent, dec("60"));
        assert_eq!(entries[1].cumulative_percent, dec("90"));
        assert_eq!(entries[2].cumulative_percent, dec("100"));
    }

    #[test]
    fn test_invoice_totals() {
        let lines = vec![
            InvoiceLine {
                description: "Bracket".into(),
                quantity: dec("100"),
                unit_price: dec("12.50"),
                tax_rate_percent: dec("18"),
            },
            InvoiceLine {
                description: "Freight".into(),
                quantity: dec("1"),
                unit_price: dec("500"),
                tax_rate_percent: Decimal::ZERO,
            },
        ];
        let totals = invoice_totals(&lines).unwrap();
        assert_eq!(totals.subtotal, dec("1750"));
        assert_eq!(totals.tax_amount, dec("225"));
        assert_eq!(totals.total_amount, dec("1975"));
    }

    #[test]
    fn test_running_ledger() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
        let movement = |d, debit: &str, credit: &str| LedgerMovement {
            date: day(d),
            reference: format!("REF-{}", d),
            counterparty: "Acme Castings".into(),
            debit: dec(debit),
            credit: dec(credit),
        };
        let ledger = running_ledger(
            Decimal::ZERO,
            vec![
                movement(9, "0", "400"),
                movement(2, "1000", "0"),
                movement(15, "250", "0"),
            ],
        );
        let balances: Vec<Decimal> = ledger.iter().map(|e| e.balance).collect();
        assert_eq!(balances, vec![dec("1000"), dec("600"), dec("850")]);
    }

    #[test]
    fn test_running_ledger_brings_balance_forward() {
        let paid = LedgerMovement {
            date: NaiveDate::from_ymd_opt(2026, 3, 20).unwrap(),
            reference: "Payment INV-7".into(),
            counterparty: "Acme Castings".into(),
            debit: Decimal::ZERO,
            credit: dec("400"),
        };
        let ledger = running_ledger(dec("1000"), vec![paid]);
        assert_eq!(ledger[0].balance, dec("600"));
    }
}
