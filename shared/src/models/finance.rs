//! Costs, invoices and ledger models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Fixed costs recur regardless of volume; variable costs scale with it
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum CostKind {
    #[default]
    Fixed,
    Variable,
}

/// A monthly cost entry (rent, salaries, power...)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct FinanceCostInput {
    pub kind: CostKind,
    #[validate(length(min = 1, max = 60, message = "Category is required"))]
    pub category: String,
    #[validate(custom = "crate::validation::positive")]
    pub amount: Decimal,
    #[validate(custom = "crate::validation::month")]
    pub month: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
}

/// Whether the invoice was issued to a customer or received from a supplier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceKind {
    #[default]
    Sales,
    Purchase,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl InvoiceStatus {
    pub fn from_amounts(total: Decimal, paid: Decimal) -> Self {
        if paid <= Decimal::ZERO {
            InvoiceStatus::Unpaid
        } else if paid < total {
            InvoiceStatus::PartiallyPaid
        } else {
            InvoiceStatus::Paid
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct InvoiceLine {
    #[validate(length(min = 1, max = 200, message = "Description is required"))]
    pub description: String,
    #[validate(custom = "crate::validation::positive")]
    pub quantity: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub unit_price: Decimal,
    #[validate(custom = "crate::validation::percentage")]
    pub tax_rate_percent: Decimal,
}

impl InvoiceLine {
    pub fn subtotal(&self) -> Option<Decimal> {
        crate::metrics::total_cost(self.quantity, self.unit_price)
    }

    pub fn tax(&self) -> Option<Decimal> {
        let taxed = self.subtotal()?.checked_mul(self.tax_rate_percent)?;
        Some((taxed / Decimal::ONE_HUNDRED).round_dp(2))
    }
}

/// Input for raising or recording an invoice
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_invoice"))]
pub struct CreateInvoiceInput {
    pub kind: InvoiceKind,
    #[validate(length(min = 1, max = 60, message = "Invoice number is required"))]
    pub invoice_number: String,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    #[validate(required(message = "Invoice date is required"))]
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    #[validate]
    pub line_items: Vec<InvoiceLine>,
}

fn validate_invoice(input: &CreateInvoiceInput) -> Result<(), ValidationError> {
    if input.line_items.is_empty() {
        return Err(crate::validation::field_error(
            "line_items",
            "At least one line item is required",
        ));
    }
    match input.kind {
        InvoiceKind::Sales if input.customer_id.is_none() => {
            return Err(crate::validation::field_error(
                "customer_id",
                "Sales invoices need a customer",
            ))
        }
        InvoiceKind::Purchase if input.supplier_id.is_none() => {
            return Err(crate::validation::field_error(
                "supplier_id",
                "Purchase invoices need a supplier",
            ))
        }
        _ => {}
    }
    if let (Some(issued), Some(due)) = (input.invoice_date, input.due_date) {
        if due < issued {
            return Err(crate::validation::field_error(
                "due_date",
                "Due date cannot be before the invoice date",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::field_errors;

    fn line() -> InvoiceLine {
        InvoiceLine {
            description: "Gear housing".to_string(),
            quantity: Decimal::from(10),
            unit_price: Decimal::from(250),
            tax_rate_percent: Decimal::from(18),
        }
    }

    #[test]
    fn test_line_tax() {
        assert_eq!(line().subtotal(), Some(Decimal::from(2500)));
        assert_eq!(line().tax(), Some(Decimal::from(450)));
    }

    #[test]
    fn test_invoice_status_from_amounts() {
        let total = Decimal::from(100);
        assert_eq!(InvoiceStatus::from_amounts(total, Decimal::ZERO), InvoiceStatus::Unpaid);
        assert_eq!(
            InvoiceStatus::from_amounts(total, Decimal::from(40)),
            InvoiceStatus::PartiallyPaid
        );
        assert_eq!(InvoiceStatus::from_amounts(total, total), InvoiceStatus::Paid);
    }

    #[test]
    fn test_sales_invoice_needs_customer() {
        let input = CreateInvoiceInput {
            invoice_number: "INV-0001".to_string(),
            invoice_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            line_items: vec![line()],
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "customer_id");
    }

    #[test]
    fn test_invoice_needs_lines() {
        let input = CreateInvoiceInput {
            kind: InvoiceKind::Purchase,
            invoice_number: "PB-77".to_string(),
            supplier_id: Some(Uuid::new_v4()),
            invoice_date: NaiveDate::from_ymd_opt(2026, 4, 1),
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "line_items");
    }

    #[test]
    fn test_cost_month_format() {
        let input = FinanceCostInput {
            category: "Rent".to_string(),
            amount: Decimal::from(45000),
            month: "2026-13".to_string(),
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "month");
    }
}
