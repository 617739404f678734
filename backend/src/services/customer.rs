//! Business customer service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::BusinessCustomerInput;
use shared::types::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct CustomerService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BusinessCustomer {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gst_number: Option<String>,
    pub pan_number: Option<String>,
    pub billing_address: Option<String>,
    pub shipping_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A product this customer has ordered, with totals across their orders
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderedProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub order_count: i64,
    pub quantity_ordered: Decimal,
    pub quantity_delivered: Decimal,
    pub total_amount: Decimal,
    pub last_order_date: NaiveDate,
}

const CUSTOMER_COLUMNS: &str = r#"
    id, company_id, name, contact_person, email, phone, gst_number, pan_number,
    billing_address, shipping_address, city, state, pincode, created_at, updated_at
"#;

impl CustomerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<BusinessCustomer>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM business_customers
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR gst_number ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let customers = sqlx::query_as::<_, BusinessCustomer>(&format!(
            r#"
            SELECT {}
            FROM business_customers
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR gst_number ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(customers, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, customer_id: Uuid) -> AppResult<BusinessCustomer> {
        sqlx::query_as::<_, BusinessCustomer>(&format!(
            "SELECT {} FROM business_customers WHERE id = $1 AND company_id = $2",
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Business customer".to_string()))
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        input: BusinessCustomerInput,
    ) -> AppResult<BusinessCustomer> {
        input.validate()?;

        let customer = sqlx::query_as::<_, BusinessCustomer>(&format!(
            r#"
            INSERT INTO business_customers (
                company_id, name, contact_person, email, phone, gst_number, pan_number,
                billing_address, shipping_address, city, state, pincode
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.gst_number.as_deref().map(str::to_uppercase))
        .bind(input.pan_number.as_deref().map(str::to_uppercase))
        .bind(&input.billing_address)
        .bind(&input.shipping_address)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(customer_id = %customer.id, %company_id, "Business customer created");
        Ok(customer)
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
        input: BusinessCustomerInput,
    ) -> AppResult<BusinessCustomer> {
        input.validate()?;

        sqlx::query_as::<_, BusinessCustomer>(&format!(
            r#"
            UPDATE business_customers
            SET name = $3, contact_person = $4, email = $5, phone = $6, gst_number = $7,
                pan_number = $8, billing_address = $9, shipping_address = $10,
                city = $11, state = $12, pincode = $13, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            CUSTOMER_COLUMNS
        ))
        .bind(customer_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.gst_number.as_deref().map(str::to_uppercase))
        .bind(input.pan_number.as_deref().map(str::to_uppercase))
        .bind(&input.billing_address)
        .bind(&input.shipping_address)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Business customer".to_string()))
    }

    /// Products the customer has ordered, most recent first
    pub async fn ordered_products(
        &self,
        company_id: Uuid,
        customer_id: Uuid,
    ) -> AppResult<Vec<OrderedProduct>> {
        // 404 for customers outside the caller's company
        self.get(company_id, customer_id).await?;

        let products = sqlx::query_as::<_, OrderedProduct>(
            r#"
            SELECT p.id AS product_id, p.name AS product_name, p.sku,
                   COUNT(o.id) AS order_count,
                   COALESCE(SUM(o.quantity_ordered), 0) AS quantity_ordered,
                   COALESCE(SUM(o.quantity_delivered), 0) AS quantity_delivered,
                   COALESCE(SUM(o.total_amount), 0) AS total_amount,
                   MAX(o.order_date) AS last_order_date
            FROM orders o
            JOIN products p ON p.id = o.product_id
            WHERE o.company_id = $1 AND o.customer_id = $2 AND o.status <> 'cancelled'
            GROUP BY p.id, p.name, p.sku
            ORDER BY last_order_date DESC, p.name ASC
            "#,
        )
        .bind(company_id)
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        Ok(products)
    }
}
