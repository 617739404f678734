//! Sales and purchase invoices, their payments and the counterparty ledger

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use crate::error::{AppError, AppResult};
use shared::metrics::{self, LedgerEntry, LedgerMovement};
use shared::models::{
    CreateInvoiceInput, InvoiceKind, InvoiceLine, InvoiceStatus, PaymentInput, PaymentMethod,
};
use shared::types::{DateRange, PaginatedResponse, Pagination};
use shared::validation;

#[derive(Clone)]
pub struct InvoiceService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub kind: InvoiceKind,
    pub invoice_number: String,
    pub customer_id: Option<Uuid>,
    pub supplier_id: Option<Uuid>,
    pub order_id: Option<Uuid>,
    pub counterparty_name: String,
    pub invoice_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub line_items: Json<Vec<InvoiceLine>>,
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub status: InvoiceStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct InvoicePayment {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct InvoiceDetail {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub payments: Vec<InvoicePayment>,
}

/// Invoices and payments over a window. Balances start from everything
/// invoiced minus paid before `from`; without a counterparty they cover
/// every counterparty of the kind (`all_counterparties`).
#[derive(Debug, Serialize)]
pub struct Ledger {
    pub kind: InvoiceKind,
    pub counterparty_id: Option<Uuid>,
    pub all_counterparties: bool,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub opening_balance: Decimal,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub closing_balance: Decimal,
    pub entries: Vec<LedgerEntry>,
}

impl Ledger {
    pub fn build(
        kind: InvoiceKind,
        counterparty_id: Option<Uuid>,
        range: &DateRange,
        opening_balance: Decimal,
        movements: Vec<LedgerMovement>,
    ) -> Self {
        let entries = metrics::running_ledger(opening_balance, movements);
        let total_debit = entries.iter().map(|e| e.debit).sum();
        let total_credit = entries.iter().map(|e| e.credit).sum();
        Self {
            kind,
            counterparty_id,
            all_counterparties: counterparty_id.is_none(),
            from: range.start,
            to: range.end,
            opening_balance,
            total_debit,
            total_credit,
            closing_balance: entries.last().map_or(opening_balance, |e| e.balance),
            entries,
        }
    }
}

const INVOICE_SELECT: &str = r#"
    SELECT i.id, i.kind, i.invoice_number, i.customer_id, i.supplier_id, i.order_id,
           COALESCE(c.name, s.name, '') AS counterparty_name, i.invoice_date, i.due_date,
           i.line_items, i.subtotal, i.tax_amount, i.total_amount, i.amount_paid,
           (i.total_amount - i.amount_paid) AS balance_due, i.status, i.created_at, i.updated_at
    FROM invoices i
    LEFT JOIN business_customers c ON c.id = i.customer_id
    LEFT JOIN suppliers s ON s.id = i.supplier_id
"#;

impl InvoiceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        kind: Option<InvoiceKind>,
        status: Option<InvoiceStatus>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Invoice>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE company_id = $1
              AND ($2::VARCHAR IS NULL OR kind = $2)
              AND ($3::VARCHAR IS NULL OR status = $3)
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        let invoices = sqlx::query_as::<_, Invoice>(&format!(
            r#"
            {}
            WHERE i.company_id = $1
              AND ($2::VARCHAR IS NULL OR i.kind = $2)
              AND ($3::VARCHAR IS NULL OR i.status = $3)
            ORDER BY i.invoice_date DESC, i.created_at DESC
            LIMIT $4 OFFSET $5
            "#,
            INVOICE_SELECT
        ))
        .bind(company_id)
        .bind(kind)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(invoices, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, invoice_id: Uuid) -> AppResult<InvoiceDetail> {
        let invoice = sqlx::query_as::<_, Invoice>(&format!(
            "{} WHERE i.id = $1 AND i.company_id = $2",
            INVOICE_SELECT
        ))
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        let payments = sqlx::query_as::<_, InvoicePayment>(
            r#"
            SELECT id, invoice_id, amount, method, reference, paid_on, created_at
            FROM invoice_payments
            WHERE invoice_id = $1 AND company_id = $2
            ORDER BY paid_on ASC, created_at ASC
            "#,
        )
        .bind(invoice_id)
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(InvoiceDetail { invoice, payments })
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        input: CreateInvoiceInput,
    ) -> AppResult<InvoiceDetail> {
        input.validate()?;

        // Only the counterparty matching the kind is kept
        let (customer_id, supplier_id) = match input.kind {
            InvoiceKind::Sales => (input.customer_id, None),
            InvoiceKind::Purchase => (None, input.supplier_id),
        };
        if let Some(customer_id) = customer_id {
            ensure_owned(&self.db, "business_customers", "Business customer", company_id, customer_id)
                .await?;
        }
        if let Some(supplier_id) = supplier_id {
            ensure_owned(&self.db, "suppliers", "Supplier", company_id, supplier_id).await?;
        }
        if let Some(order_id) = input.order_id {
            let order_customer = sqlx::query_scalar::<_, Uuid>(
                "SELECT customer_id FROM orders WHERE id = $1 AND company_id = $2",
            )
            .bind(order_id)
            .bind(company_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
            if customer_id.is_some_and(|c| c != order_customer) {
                return Err(AppError::validation(
                    "order_id",
                    "Order belongs to a different customer",
                ));
            }
        }

        let totals = metrics::invoice_totals(&input.line_items)
            .filter(|t| validation::within_total_limit(&t.total_amount))
            .ok_or_else(|| AppError::validation("line_items", "Invoice total is too large"))?;

        let invoice_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO invoices (
                company_id, kind, invoice_number, customer_id, supplier_id, order_id,
                invoice_date, due_date, line_items, subtotal, tax_amount, total_amount, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.kind)
        .bind(input.invoice_number.trim())
        .bind(customer_id)
        .bind(supplier_id)
        .bind(input.order_id)
        .bind(input.invoice_date)
        .bind(input.due_date)
        .bind(Json(&input.line_items))
        .bind(totals.subtotal)
        .bind(totals.tax_amount)
        .bind(totals.total_amount)
        .bind(InvoiceStatus::Unpaid)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(
            %invoice_id,
            kind = ?input.kind,
            total = %totals.total_amount,
            "Invoice created"
        );
        self.get(company_id, invoice_id).await
    }

    pub async fn record_payment(
        &self,
        company_id: Uuid,
        invoice_id: Uuid,
        input: PaymentInput,
    ) -> AppResult<InvoiceDetail> {
        input.validate()?;
        let paid_on = input.paid_on.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let (total, paid) = sqlx::query_as::<_, (Decimal, Decimal)>(
            "SELECT total_amount, amount_paid FROM invoices WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(invoice_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Invoice".to_string()))?;

        metrics::check_payment(total - paid, input.amount)?;
        let amount_paid = paid + input.amount;

        sqlx::query(
            r#"
            INSERT INTO invoice_payments (company_id, invoice_id, amount, method, reference, paid_on)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(company_id)
        .bind(invoice_id)
        .bind(input.amount)
        .bind(input.method)
        .bind(&input.reference)
        .bind(paid_on)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE invoices SET amount_paid = $2, status = $3, updated_at = NOW() WHERE id = $1",
        )
        .bind(invoice_id)
        .bind(amount_paid)
        .bind(InvoiceStatus::from_amounts(total, amount_paid))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%invoice_id, amount = %input.amount, "Invoice payment recorded");
        self.get(company_id, invoice_id).await
    }

    /// Invoices as debits and their payments as credits, with a running
    /// balance, for one kind and optionally one counterparty
    pub async fn ledger(
        &self,
        company_id: Uuid,
        kind: InvoiceKind,
        counterparty_id: Option<Uuid>,
        range: &DateRange,
    ) -> AppResult<Ledger> {
        let opening_balance = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT
                COALESCE((
                    SELECT SUM(i.total_amount) FROM invoices i
                    WHERE i.company_id = $1 AND i.kind = $2
                      AND ($3::UUID IS NULL OR i.customer_id = $3 OR i.supplier_id = $3)
                      AND i.invoice_date < $4
                ), 0)
                - COALESCE((
                    SELECT SUM(p.amount) FROM invoice_payments p
                    JOIN invoices i ON i.id = p.invoice_id
                    WHERE p.company_id = $1 AND i.kind = $2
                      AND ($3::UUID IS NULL OR i.customer_id = $3 OR i.supplier_id = $3)
                      AND p.paid_on < $4
                ), 0)
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .bind(counterparty_id)
        .bind(range.start)
        .fetch_one(&self.db)
        .await?;

        let invoices = sqlx::query_as::<_, (NaiveDate, String, String, Decimal)>(
            r#"
            SELECT i.invoice_date, i.invoice_number, COALESCE(c.name, s.name, ''), i.total_amount
            FROM invoices i
            LEFT JOIN business_customers c ON c.id = i.customer_id
            LEFT JOIN suppliers s ON s.id = i.supplier_id
            WHERE i.company_id = $1 AND i.kind = $2
              AND ($3::UUID IS NULL OR i.customer_id = $3 OR i.supplier_id = $3)
              AND i.invoice_date BETWEEN $4 AND $5
            ORDER BY i.invoice_date ASC, i.created_at ASC
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .bind(counterparty_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let payments = sqlx::query_as::<_, (NaiveDate, String, Option<String>, String, Decimal)>(
            r#"
            SELECT p.paid_on, i.invoice_number, p.reference, COALESCE(c.name, s.name, ''), p.amount
            FROM invoice_payments p
            JOIN invoices i ON i.id = p.invoice_id
            LEFT JOIN business_customers c ON c.id = i.customer_id
            LEFT JOIN suppliers s ON s.id = i.supplier_id
            WHERE p.company_id = $1 AND i.kind = $2
              AND ($3::UUID IS NULL OR i.customer_id = $3 OR i.supplier_id = $3)
              AND p.paid_on BETWEEN $4 AND $5
            ORDER BY p.paid_on ASC, p.created_at ASC
            "#,
        )
        .bind(company_id)
        .bind(kind)
        .bind(counterparty_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let movements = invoices
            .into_iter()
            .map(|(date, number, counterparty, total)| LedgerMovement {
                date,
                reference: number,
                counterparty,
                debit: total,
                credit: Decimal::ZERO,
            })
            .chain(payments.into_iter().map(
                |(date, number, reference, counterparty, amount)| LedgerMovement {
                    date,
                    reference: payment_reference(&number, reference.as_deref()),
                    counterparty,
                    debit: Decimal::ZERO,
                    credit: amount,
                },
            ))
            .collect();

        Ok(Ledger::build(kind, counterparty_id, range, opening_balance, movements))
    }
}

fn payment_reference(invoice_number: &str, reference: Option<&str>) -> String {
    match reference {
        Some(r) if !r.trim().is_empty() => format!("Payment {} ({})", invoice_number, r.trim()),
        _ => format!("Payment {}", invoice_number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, d).unwrap()
    }

    #[test]
    fn test_ledger_balance() {
        let range = DateRange {
            start: day(1),
            end: day(30),
        };
        let movements = vec![
            LedgerMovement {
                date: day(3),
                reference: "INV-001".to_string(),
                counterparty: "Acme".to_string(),
                debit: Decimal::from(11800),
                credit: Decimal::ZERO,
            },
            LedgerMovement {
                date: day(10),
                reference: "INV-002".to_string(),
                counterparty: "Acme".to_string(),
                debit: Decimal::from(5900),
                credit: Decimal::ZERO,
            },
            LedgerMovement {
                date: day(5),
                reference: payment_reference("INV-001", Some("UTR123")),
                counterparty: "Acme".to_string(),
                debit: Decimal::ZERO,
                credit: Decimal::from(8000),
            },
        ];

        let ledger = Ledger::build(InvoiceKind::Sales, None, &range, Decimal::ZERO, movements);
        assert_eq!(ledger.total_debit, Decimal::from(17700));
        assert_eq!(ledger.total_credit, Decimal::from(8000));
        assert_eq!(ledger.closing_balance, Decimal::from(9700));
        assert_eq!(ledger.entries[1].reference, "Payment INV-001 (UTR123)");
        assert_eq!(ledger.entries[1].balance, Decimal::from(3800));
    }

    #[test]
    fn test_empty_ledger() {
        let range = DateRange {
            start: day(1),
            end: day(2),
        };
        let ledger = Ledger::build(InvoiceKind::Purchase, None, &range, Decimal::ZERO, vec![]);
        assert_eq!(ledger.closing_balance, Decimal::ZERO);
        assert!(ledger.entries.is_empty());
        assert!(ledger.all_counterparties);
    }

    #[test]
    fn test_payment_for_earlier_invoice() {
        // INV-031 for 1000 was raised in May; 400 is paid inside the June window
        let range = DateRange {
            start: day(1),
            end: day(30),
        };
        let counterparty = Uuid::new_v4();
        let payment = LedgerMovement {
            date: day(12),
            reference: payment_reference("INV-031", None),
            counterparty: "Acme".to_string(),
            debit: Decimal::ZERO,
            credit: Decimal::from(400),
        };

        let ledger = Ledger::build(
            InvoiceKind::Sales,
            Some(counterparty),
            &range,
            Decimal::from(1000),
            vec![payment],
        );
        assert!(!ledger.all_counterparties);
        assert_eq!(ledger.opening_balance, Decimal::from(1000));
        assert_eq!(ledger.entries[0].balance, Decimal::from(600));
        assert_eq!(ledger.closing_balance, Decimal::from(600));

        let quiet = Ledger::build(
            InvoiceKind::Sales,
            Some(counterparty),
            &range,
            Decimal::from(600),
            vec![],
        );
        assert_eq!(quiet.closing_balance, Decimal::from(600));
    }

    #[test]
    fn test_payment_reference() {
        assert_eq!(payment_reference("PB-7", None), "Payment PB-7");
        assert_eq!(payment_reference("PB-7", Some("  ")), "Payment PB-7");
    }
}
