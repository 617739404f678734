//! Sales orders: creation, edits, deliveries, payments and cancellation
//!
//! Deliveries, single or bulk, go through one path: every referenced order
//! is locked, every line is checked against the running state of its order,
//! and the whole batch is written only if every line passes.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use crate::error::{AppError, AppResult, RejectedItem};
use shared::metrics::{self, DeliveryError};
use shared::models::{
    BulkDeliveryInput, CreateOrderInput, DeliveryUpdate, OrderStatus, PaymentMethod,
    PaymentTerms, SingleDeliveryInput, UpdateOrderInput,
};
use shared::types::{PaginatedResponse, Pagination};
use shared::validation;

#[derive(Clone)]
pub struct OrderService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub customer_id: Uuid,
    pub customer_name: String,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_ordered: Decimal,
    pub quantity_delivered: Decimal,
    pub remaining_quantity: Decimal,
    pub price_per_unit: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub balance_due: Decimal,
    pub payment_terms: PaymentTerms,
    pub advance_payment: Decimal,
    pub order_date: NaiveDate,
    pub expected_delivery_date: Option<NaiveDate>,
    pub status: OrderStatus,
    pub po_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderDelivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub quantity_delivered: Decimal,
    pub delivered_on: NaiveDate,
    pub challan_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderPayment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub reference: Option<String>,
    pub paid_on: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub deliveries: Vec<OrderDelivery>,
    pub payments: Vec<OrderPayment>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeliveryResult {
    pub deliveries_recorded: usize,
    pub payments_recorded: usize,
    pub orders: Vec<Order>,
}

/// Filters for the order list
#[derive(Debug, Default)]
pub struct OrderFilter<'a> {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub search: Option<&'a str>,
}

/// Mutable fulfilment state of a locked order
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FulfilmentState {
    pub id: Uuid,
    pub status: OrderStatus,
    pub quantity_delivered: Decimal,
    pub remaining_quantity: Decimal,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
}

impl FulfilmentState {
    fn apply(&mut self, update: &DeliveryUpdate) -> Result<(), DeliveryError> {
        metrics::check_delivery(self.status, self.remaining_quantity, update.quantity_delivered)?;
        let payment = update.payment.as_ref().map(|p| p.amount).unwrap_or_default();
        if update.payment.is_some() {
            metrics::check_payment(self.total_amount - self.amount_paid, payment)?;
        }

        self.quantity_delivered += update.quantity_delivered;
        self.remaining_quantity =
            metrics::remaining_quantity(self.quantity_ordered(), self.quantity_delivered);
        self.amount_paid += payment;
        self.status = metrics::status_after_delivery(self.remaining_quantity);
        Ok(())
    }

    fn quantity_ordered(&self) -> Decimal {
        self.quantity_delivered + self.remaining_quantity
    }
}

/// Why one delivery line was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineRejection {
    OrderNotFound,
    Delivery(DeliveryError),
}

impl fmt::Display for LineRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineRejection::OrderNotFound => write!(f, "Order not found"),
            LineRejection::Delivery(err) => write!(f, "{}", err),
        }
    }
}

impl From<LineRejection> for AppError {
    fn from(rejection: LineRejection) -> Self {
        match rejection {
            LineRejection::OrderNotFound => AppError::NotFound("Order".to_string()),
            LineRejection::Delivery(err) => err.into(),
        }
    }
}

/// Check every line against the running state of its order. Lines for the
/// same order are cumulative: each sees the quantities the earlier accepted
/// lines left behind. Returns the final states, or every refused line.
pub fn plan_deliveries(
    updates: &[DeliveryUpdate],
    mut states: HashMap<Uuid, FulfilmentState>,
) -> Result<HashMap<Uuid, FulfilmentState>, Vec<(usize, Uuid, LineRejection)>> {
    let mut rejected = Vec::new();
    for (index, update) in updates.iter().enumerate() {
        let outcome = match states.get_mut(&update.order_id) {
            None => Err(LineRejection::OrderNotFound),
            Some(state) => state.apply(update).map_err(LineRejection::Delivery),
        };
        if let Err(rejection) = outcome {
            rejected.push((index, update.order_id, rejection));
        }
    }

    if rejected.is_empty() {
        Ok(states)
    } else {
        Err(rejected)
    }
}

/// Order value rounded to paise; a validation error when it overflows the
/// stored total
pub fn order_total(quantity_ordered: Decimal, price_per_unit: Decimal) -> AppResult<Decimal> {
    metrics::total_cost(quantity_ordered, price_per_unit)
        .map(|total| total.round_dp(2))
        .filter(validation::within_total_limit)
        .ok_or_else(|| AppError::validation("quantity_ordered", "Order total is too large"))
}

/// "ORD-202605-0042"
pub fn format_order_number(order_date: NaiveDate, sequence: i64) -> String {
    format!(
        "ORD-{:04}{:02}-{:04}",
        order_date.year(),
        order_date.month(),
        sequence
    )
}

const ORDER_SELECT: &str = r#"
    SELECT o.id, o.order_number, o.customer_id, c.name AS customer_name, o.product_id,
           p.name AS product_name, o.quantity_ordered, o.quantity_delivered,
           o.remaining_quantity, o.price_per_unit, o.total_amount, o.amount_paid,
           (o.total_amount - o.amount_paid) AS balance_due, o.payment_terms, o.advance_payment,
           o.order_date, o.expected_delivery_date, o.status, o.po_number, o.notes,
           o.created_at, o.updated_at
    FROM orders o
    JOIN business_customers c ON c.id = o.customer_id
    JOIN products p ON p.id = o.product_id
"#;

impl OrderService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        filter: OrderFilter<'_>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Order>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM orders o
            WHERE o.company_id = $1
              AND ($2::VARCHAR IS NULL OR o.status = $2)
              AND ($3::UUID IS NULL OR o.customer_id = $3)
              AND ($4::TEXT IS NULL OR o.order_number ILIKE '%' || $4 || '%'
                   OR o.po_number ILIKE '%' || $4 || '%')
            "#,
        )
        .bind(company_id)
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(filter.search)
        .fetch_one(&self.db)
        .await?;

        let orders = sqlx::query_as::<_, Order>(&format!(
            r#"
            {}
            WHERE o.company_id = $1
              AND ($2::VARCHAR IS NULL OR o.status = $2)
              AND ($3::UUID IS NULL OR o.customer_id = $3)
              AND ($4::TEXT IS NULL OR o.order_number ILIKE '%' || $4 || '%'
                   OR o.po_number ILIKE '%' || $4 || '%')
            ORDER BY o.order_date DESC, o.created_at DESC
            LIMIT $5 OFFSET $6
            "#,
            ORDER_SELECT
        ))
        .bind(company_id)
        .bind(filter.status)
        .bind(filter.customer_id)
        .bind(filter.search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(orders, pagination, total as u64))
    }

    async fn find(&self, company_id: Uuid, order_id: Uuid) -> AppResult<Order> {
        sqlx::query_as::<_, Order>(&format!(
            "{} WHERE o.id = $1 AND o.company_id = $2",
            ORDER_SELECT
        ))
        .bind(order_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))
    }

    pub async fn get(&self, company_id: Uuid, order_id: Uuid) -> AppResult<OrderDetail> {
        let order = self.find(company_id, order_id).await?;

        let deliveries = sqlx::query_as::<_, OrderDelivery>(
            r#"
            SELECT id, order_id, quantity_delivered, delivered_on, challan_number, created_at
            FROM order_deliveries
            WHERE order_id = $1 AND company_id = $2
            ORDER BY delivered_on ASC, created_at ASC
            "#,
        )
        .bind(order_id)
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        let payments = sqlx::query_as::<_, OrderPayment>(
            r#"
            SELECT id, order_id, amount, method, reference, paid_on, created_at
            FROM order_payments
            WHERE order_id = $1 AND company_id = $2
            ORDER BY paid_on ASC, created_at ASC
            "#,
        )
        .bind(order_id)
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(OrderDetail {
            order,
            deliveries,
            payments,
        })
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: CreateOrderInput,
    ) -> AppResult<OrderDetail> {
        input.validate()?;
        ensure_owned(
            &self.db,
            "business_customers",
            "Business customer",
            company_id,
            input.customer_id,
        )
        .await?;
        ensure_owned(&self.db, "products", "Product", company_id, input.product_id).await?;

        let order_date = input.order_date.unwrap_or_else(|| Utc::now().date_naive());
        let total_amount = order_total(input.quantity_ordered, input.price_per_unit)?;

        let mut tx = self.db.begin().await?;

        // Serialise numbering per company
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1::TEXT))")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;
        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM orders WHERE company_id = $1")
            .bind(company_id)
            .fetch_one(&mut *tx)
            .await?;
        let order_number = format_order_number(order_date, existing + 1);

        let order_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO orders (
                company_id, order_number, customer_id, product_id, quantity_ordered,
                quantity_delivered, remaining_quantity, price_per_unit, total_amount, amount_paid,
                payment_terms, advance_payment, order_date, expected_delivery_date, status,
                po_number, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, 0, $5, $6, $7, $8, $9, $8, $10, $11, $12, $13, $14, $15)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(&order_number)
        .bind(input.customer_id)
        .bind(input.product_id)
        .bind(input.quantity_ordered)
        .bind(input.price_per_unit)
        .bind(total_amount)
        .bind(input.advance_payment)
        .bind(input.payment_terms)
        .bind(order_date)
        .bind(input.expected_delivery_date)
        .bind(OrderStatus::InProgress)
        .bind(&input.po_number)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        if input.advance_payment > Decimal::ZERO {
            insert_payment(
                &mut tx,
                company_id,
                order_id,
                input.advance_payment,
                PaymentMethod::default(),
                Some("Advance"),
                order_date,
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            %order_id,
            %order_number,
            total = %total_amount,
            advance = %input.advance_payment,
            "Order created"
        );
        self.get(company_id, order_id).await
    }

    /// Edit an in-progress order. Quantity cannot drop below what has been
    /// delivered, and the total cannot drop below what has been paid.
    pub async fn update(
        &self,
        company_id: Uuid,
        order_id: Uuid,
        input: UpdateOrderInput,
    ) -> AppResult<OrderDetail> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let current = sqlx::query_as::<_, (OrderStatus, Decimal, Decimal, Decimal, Decimal)>(
            r#"
            SELECT status, quantity_ordered, quantity_delivered, price_per_unit, amount_paid
            FROM orders WHERE id = $1 AND company_id = $2
            FOR UPDATE
            "#,
        )
        .bind(order_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;
        let (status, ordered, delivered, price, paid) = current;

        if status != OrderStatus::InProgress {
            return Err(AppError::InvalidStateTransition(format!(
                "Order is {} and can no longer be edited",
                status
            )));
        }

        let quantity_ordered = input.quantity_ordered.unwrap_or(ordered);
        if quantity_ordered < delivered {
            return Err(AppError::validation(
                "quantity_ordered",
                format!(
                    "Quantity cannot be less than the {} already delivered",
                    delivered.normalize()
                ),
            ));
        }
        let price_per_unit = input.price_per_unit.unwrap_or(price);
        let total_amount = order_total(quantity_ordered, price_per_unit)?;
        if total_amount < paid {
            return Err(AppError::validation(
                "price_per_unit",
                "Order total cannot be less than the amount already paid",
            ));
        }
        let remaining = metrics::remaining_quantity(quantity_ordered, delivered);

        sqlx::query(
            r#"
            UPDATE orders
            SET quantity_ordered = $3, remaining_quantity = $4, price_per_unit = $5,
                total_amount = $6, payment_terms = COALESCE($7, payment_terms),
                expected_delivery_date = COALESCE($8, expected_delivery_date),
                po_number = COALESCE($9, po_number), notes = COALESCE($10, notes),
                status = $11, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(order_id)
        .bind(company_id)
        .bind(quantity_ordered)
        .bind(remaining)
        .bind(price_per_unit)
        .bind(total_amount)
        .bind(input.payment_terms)
        .bind(input.expected_delivery_date)
        .bind(&input.po_number)
        .bind(&input.notes)
        .bind(metrics::status_after_delivery(remaining))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.get(company_id, order_id).await
    }

    /// Record a delivery against one order; refusals surface as the
    /// specific error rather than a batch rejection
    pub async fn deliver(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        order_id: Uuid,
        input: SingleDeliveryInput,
    ) -> AppResult<OrderDetail> {
        input.validate()?;
        let updates = vec![input.into_update(order_id)];

        let mut tx = self.db.begin().await?;
        let states = lock_orders(&mut tx, company_id, &updates).await?;
        let states = plan_deliveries(&updates, states).map_err(|mut rejected| {
            let (_, _, rejection) = rejected.remove(0);
            AppError::from(rejection)
        })?;
        write_deliveries(&mut tx, company_id, user_id, &updates, &states).await?;
        tx.commit().await?;

        tracing::info!(%order_id, quantity = %updates[0].quantity_delivered, "Delivery recorded");
        self.get(company_id, order_id).await
    }

    /// Apply a batch of deliveries and payments all-or-nothing
    pub async fn bulk_delivery(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: BulkDeliveryInput,
    ) -> AppResult<BulkDeliveryResult> {
        input.validate()?;
        let updates = input.updates;

        let mut tx = self.db.begin().await?;
        let states = lock_orders(&mut tx, company_id, &updates).await?;

        let states = match plan_deliveries(&updates, states) {
            Ok(states) => states,
            Err(rejected) => {
                tracing::warn!(
                    %company_id,
                    submitted = updates.len(),
                    rejected = rejected.len(),
                    "Bulk delivery rejected"
                );
                return Err(AppError::BatchRejected(
                    rejected
                        .into_iter()
                        .map(|(index, order_id, rejection)| RejectedItem {
                            index,
                            order_id,
                            reason: rejection.to_string(),
                        })
                        .collect(),
                ));
            }
        };

        write_deliveries(&mut tx, company_id, user_id, &updates, &states).await?;
        tx.commit().await?;

        let payments_recorded = updates.iter().filter(|u| u.payment.is_some()).count();
        tracing::info!(
            %company_id,
            deliveries = updates.len(),
            payments = payments_recorded,
            orders = states.len(),
            "Bulk delivery applied"
        );

        let order_ids: Vec<Uuid> = states.keys().copied().collect();
        let orders = sqlx::query_as::<_, Order>(&format!(
            "{} WHERE o.company_id = $1 AND o.id = ANY($2) ORDER BY o.order_number ASC",
            ORDER_SELECT
        ))
        .bind(company_id)
        .bind(&order_ids)
        .fetch_all(&self.db)
        .await?;

        Ok(BulkDeliveryResult {
            deliveries_recorded: updates.len(),
            payments_recorded,
            orders,
        })
    }

    pub async fn cancel(&self, company_id: Uuid, order_id: Uuid) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;

        let status = sqlx::query_scalar::<_, OrderStatus>(
            "SELECT status FROM orders WHERE id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(order_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Order".to_string()))?;

        if status != OrderStatus::InProgress {
            return Err(AppError::InvalidStateTransition(format!(
                "Order is {} and cannot be cancelled",
                status
            )));
        }

        sqlx::query("UPDATE orders SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(order_id)
            .bind(OrderStatus::Cancelled)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%order_id, "Order cancelled");
        self.get(company_id, order_id).await
    }
}

/// Lock every order the updates reference, in id order
async fn lock_orders(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    updates: &[DeliveryUpdate],
) -> AppResult<HashMap<Uuid, FulfilmentState>> {
    let mut order_ids: Vec<Uuid> = updates.iter().map(|u| u.order_id).collect();
    order_ids.sort();
    order_ids.dedup();

    let rows = sqlx::query_as::<_, FulfilmentState>(
        r#"
        SELECT id, status, quantity_delivered, remaining_quantity, total_amount, amount_paid
        FROM orders
        WHERE company_id = $1 AND id = ANY($2)
        ORDER BY id
        FOR UPDATE
        "#,
    )
    .bind(company_id)
    .bind(&order_ids)
    .fetch_all(&mut **tx)
    .await?;

    Ok(rows.into_iter().map(|state| (state.id, state)).collect())
}

async fn write_deliveries(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    user_id: Uuid,
    updates: &[DeliveryUpdate],
    states: &HashMap<Uuid, FulfilmentState>,
) -> AppResult<()> {
    let today = Utc::now().date_naive();

    for update in updates {
        let delivered_on = update.delivered_on.unwrap_or(today);
        sqlx::query(
            r#"
            INSERT INTO order_deliveries (
                company_id, order_id, quantity_delivered, delivered_on, challan_number, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(company_id)
        .bind(update.order_id)
        .bind(update.quantity_delivered)
        .bind(delivered_on)
        .bind(&update.challan_number)
        .bind(user_id)
        .execute(&mut **tx)
        .await?;

        if let Some(payment) = &update.payment {
            insert_payment(
                tx,
                company_id,
                update.order_id,
                payment.amount,
                payment.method,
                payment.reference.as_deref(),
                payment.paid_on.unwrap_or(delivered_on),
            )
            .await?;
        }
    }

    for state in states.values() {
        sqlx::query(
            r#"
            UPDATE orders
            SET quantity_delivered = $2, remaining_quantity = $3, amount_paid = $4,
                status = $5, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(state.id)
        .bind(state.quantity_delivered)
        .bind(state.remaining_quantity)
        .bind(state.amount_paid)
        .bind(state.status)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

async fn insert_payment(
    tx: &mut Transaction<'_, Postgres>,
    company_id: Uuid,
    order_id: Uuid,
    amount: Decimal,
    method: PaymentMethod,
    reference: Option<&str>,
    paid_on: NaiveDate,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO order_payments (company_id, order_id, amount, method, reference, paid_on)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(company_id)
    .bind(order_id)
    .bind(amount)
    .bind(method)
    .bind(reference)
    .bind(paid_on)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::PaymentInput;

    #[test]
    fn test_order_total_bounds() {
        assert_eq!(
            order_total(Decimal::from(250), Decimal::new(1875, 2)).unwrap(),
            Decimal::new(468750, 2)
        );
        assert!(matches!(
            order_total(Decimal::MAX, Decimal::from(2)),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            order_total(Decimal::from(9_999_999_999i64), Decimal::from(9_999_999_999i64)),
            Err(AppError::Validation { .. })
        ));
    }

    fn state(remaining: i64, delivered: i64) -> FulfilmentState {
        FulfilmentState {
            id: Uuid::new_v4(),
            status: OrderStatus::InProgress,
            quantity_delivered: Decimal::from(delivered),
            remaining_quantity: Decimal::from(remaining),
            total_amount: Decimal::from((remaining + delivered) * 100),
            amount_paid: Decimal::ZERO,
        }
    }

    fn update(order_id: Uuid, quantity: i64) -> DeliveryUpdate {
        DeliveryUpdate {
            order_id,
            quantity_delivered: Decimal::from(quantity),
            ..Default::default()
        }
    }

    fn states_of(list: Vec<FulfilmentState>) -> HashMap<Uuid, FulfilmentState> {
        list.into_iter().map(|s| (s.id, s)).collect()
    }

    #[test]
    fn test_plan_completes_order() {
        let order = state(10, 0);
        let id = order.id;
        let planned = plan_deliveries(&[update(id, 4), update(id, 6)], states_of(vec![order]))
            .unwrap();
        let final_state = &planned[&id];
        assert_eq!(final_state.quantity_delivered, Decimal::from(10));
        assert_eq!(final_state.remaining_quantity, Decimal::ZERO);
        assert_eq!(final_state.status, OrderStatus::Completed);
    }

    #[test]
    fn test_plan_cumulative_over_delivery_rejected() {
        let order = state(10, 0);
        let id = order.id;
        let rejected =
            plan_deliveries(&[update(id, 7), update(id, 5)], states_of(vec![order])).unwrap_err();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].0, 1);
        assert_eq!(
            rejected[0].2,
            LineRejection::Delivery(DeliveryError::ExceedsRemaining {
                requested: Decimal::from(5),
                remaining: Decimal::from(3),
            })
        );
    }

    #[test]
    fn test_plan_reports_every_bad_line() {
        let open = state(5, 0);
        let mut closed = state(0, 5);
        closed.status = OrderStatus::Completed;
        let (open_id, closed_id) = (open.id, closed.id);
        let stranger = Uuid::new_v4();

        let rejected = plan_deliveries(
            &[update(open_id, 2), update(closed_id, 1), update(stranger, 1)],
            states_of(vec![open, closed]),
        )
        .unwrap_err();

        let indexes: Vec<usize> = rejected.iter().map(|r| r.0).collect();
        assert_eq!(indexes, vec![1, 2]);
        assert_eq!(rejected[1].2, LineRejection::OrderNotFound);
        assert_eq!(rejected[1].2.to_string(), "Order not found");
    }

    #[test]
    fn test_plan_payment_limits() {
        let order = state(10, 0);
        let id = order.id;
        let mut paid = update(id, 2);
        paid.payment = Some(PaymentInput {
            amount: Decimal::from(600),
            ..Default::default()
        });
        let mut overpaid = update(id, 2);
        overpaid.payment = Some(PaymentInput {
            amount: Decimal::from(500),
            ..Default::default()
        });

        let rejected =
            plan_deliveries(&[paid.clone(), overpaid], states_of(vec![order.clone()])).unwrap_err();
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0].2,
            LineRejection::Delivery(DeliveryError::PaymentExceedsBalance { .. })
        ));

        let planned = plan_deliveries(&[paid], states_of(vec![order])).unwrap();
        assert_eq!(planned[&id].amount_paid, Decimal::from(600));
    }

    #[test]
    fn test_format_order_number() {
        let date = NaiveDate::from_ymd_opt(2026, 5, 17).unwrap();
        assert_eq!(format_order_number(date, 42), "ORD-202605-0042");
    }

    #[test]
    fn test_single_rejection_maps_to_specific_error() {
        let err: AppError = LineRejection::Delivery(DeliveryError::ExceedsRemaining {
            requested: Decimal::from(3),
            remaining: Decimal::from(1),
        })
        .into();
        assert!(matches!(err, AppError::OverDelivery(_)));
        let missing: AppError = LineRejection::OrderNotFound.into();
        assert!(matches!(missing, AppError::NotFound(_)));
    }
}
