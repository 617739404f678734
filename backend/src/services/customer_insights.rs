//! Customer rankings, receivables and per-customer history

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::customer::{BusinessCustomer, CustomerService, OrderedProduct};
use crate::error::AppResult;
use shared::metrics;
use shared::types::DateRange;

#[derive(Clone)]
pub struct CustomerInsightsService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct TopCustomer {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub order_count: i64,
    pub order_value: Decimal,
    pub amount_paid: Decimal,
    pub quantity_delivered: Decimal,
    #[sqlx(skip)]
    pub share_percent: Decimal,
}

#[derive(Debug, Serialize)]
pub struct TopCustomers {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_order_value: Decimal,
    pub customers: Vec<TopCustomer>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OutstandingBalance {
    pub customer_id: Uuid,
    pub customer_name: String,
    pub open_orders: i64,
    pub total_amount: Decimal,
    pub amount_paid: Decimal,
    pub outstanding: Decimal,
    pub oldest_order_date: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct CustomerOrderStats {
    pub total_orders: i64,
    pub open_orders: i64,
    pub completed_orders: i64,
    pub cancelled_orders: i64,
    pub order_value: Decimal,
    pub amount_paid: Decimal,
    pub quantity_ordered: Decimal,
    pub quantity_delivered: Decimal,
    pub first_order_date: Option<NaiveDate>,
    pub last_order_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct CustomerInsight {
    pub customer: BusinessCustomer,
    pub stats: CustomerOrderStats,
    pub outstanding: Decimal,
    pub average_order_value: Decimal,
    pub fulfilment_percent: Decimal,
    pub products: Vec<OrderedProduct>,
}

impl CustomerInsight {
    pub fn new(
        customer: BusinessCustomer,
        stats: CustomerOrderStats,
        products: Vec<OrderedProduct>,
    ) -> Self {
        let billable_orders = stats.total_orders - stats.cancelled_orders;
        let average_order_value = if billable_orders > 0 {
            (stats.order_value / Decimal::from(billable_orders)).round_dp(2)
        } else {
            Decimal::ZERO
        };
        Self {
            outstanding: stats.order_value - stats.amount_paid,
            average_order_value,
            fulfilment_percent: metrics::percent(stats.quantity_delivered, stats.quantity_ordered),
            customer,
            stats,
            products,
        }
    }
}

impl CustomerInsightsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Customers by order value in the window, cancelled orders excluded
    pub async fn top_customers(
        &self,
        company_id: Uuid,
        range: &DateRange,
        limit: i64,
    ) -> AppResult<TopCustomers> {
        let mut customers = sqlx::query_as::<_, TopCustomer>(
            r#"
            SELECT c.id AS customer_id, c.name AS customer_name,
                   COUNT(o.id) AS order_count,
                   COALESCE(SUM(o.total_amount), 0) AS order_value,
                   COALESCE(SUM(o.amount_paid), 0) AS amount_paid,
                   COALESCE(SUM(o.quantity_delivered), 0) AS quantity_delivered
            FROM orders o
            JOIN business_customers c ON c.id = o.customer_id
            WHERE o.company_id = $1 AND o.status <> 'cancelled'
              AND o.order_date BETWEEN $2 AND $3
            GROUP BY c.id, c.name
            ORDER BY order_value DESC, c.name ASC
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let total_order_value: Decimal = customers.iter().map(|c| c.order_value).sum();
        for customer in &mut customers {
            customer.share_percent = metrics::percent(customer.order_value, total_order_value);
        }
        customers.truncate(limit.clamp(1, 100) as usize);

        Ok(TopCustomers {
            from: range.start,
            to: range.end,
            total_order_value,
            customers,
        })
    }

    /// Customers who owe money on orders, largest balance first
    pub async fn outstanding(&self, company_id: Uuid) -> AppResult<Vec<OutstandingBalance>> {
        let balances = sqlx::query_as::<_, OutstandingBalance>(
            r#"
            SELECT c.id AS customer_id, c.name AS customer_name,
                   COUNT(o.id) AS open_orders,
                   SUM(o.total_amount) AS total_amount,
                   SUM(o.amount_paid) AS amount_paid,
                   SUM(o.total_amount - o.amount_paid) AS outstanding,
                   MIN(o.order_date) AS oldest_order_date
            FROM orders o
            JOIN business_customers c ON c.id = o.customer_id
            WHERE o.company_id = $1 AND o.status <> 'cancelled'
              AND o.total_amount > o.amount_paid
            GROUP BY c.id, c.name
            ORDER BY outstanding DESC, c.name ASC
            "#,
        )
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(balances)
    }

    pub async fn customer(&self, company_id: Uuid, customer_id: Uuid) -> AppResult<CustomerInsight> {
        let customers = CustomerService::new(self.db.clone());
        let customer = customers.get(company_id, customer_id).await?;

        let stats = sqlx::query_as::<_, CustomerOrderStats>(
            r#"
            SELECT COUNT(*) AS total_orders,
                   COUNT(*) FILTER (WHERE status = 'in_progress') AS open_orders,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed_orders,
                   COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled_orders,
                   COALESCE(SUM(total_amount) FILTER (WHERE status <> 'cancelled'), 0) AS order_value,
                   COALESCE(SUM(amount_paid) FILTER (WHERE status <> 'cancelled'), 0) AS amount_paid,
                   COALESCE(SUM(quantity_ordered) FILTER (WHERE status <> 'cancelled'), 0) AS quantity_ordered,
                   COALESCE(SUM(quantity_delivered), 0) AS quantity_delivered,
                   MIN(order_date) AS first_order_date,
                   MAX(order_date) AS last_order_date
            FROM orders
            WHERE company_id = $1 AND customer_id = $2
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .fetch_one(&self.db)
        .await?;

        let products = customers.ordered_products(company_id, customer_id).await?;
        Ok(CustomerInsight::new(customer, stats, products))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_customer_insight_derived_fields() {
        let customer = BusinessCustomer {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            name: "Shree Auto Components".to_string(),
            contact_person: None,
            email: None,
            phone: None,
            gst_number: None,
            pan_number: None,
            billing_address: None,
            shipping_address: None,
            city: None,
            state: None,
            pincode: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let stats = CustomerOrderStats {
            total_orders: 5,
            cancelled_orders: 1,
            order_value: Decimal::from(200000),
            amount_paid: Decimal::from(150000),
            quantity_ordered: Decimal::from(800),
            quantity_delivered: Decimal::from(600),
            ..Default::default()
        };

        let insight = CustomerInsight::new(customer, stats, vec![]);
        assert_eq!(insight.outstanding, Decimal::from(50000));
        assert_eq!(insight.average_order_value, Decimal::from(50000));
        assert_eq!(insight.fulfilment_percent, Decimal::from(75));
    }
}
