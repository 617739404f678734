//! Supplier service

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::SupplierInput;
use shared::types::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct SupplierService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub contact_person: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub materials_supplied: Vec<String>,
    pub lead_time_days: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const SUPPLIER_COLUMNS: &str = r#"
    id, company_id, name, contact_person, email, phone, gst_number, address,
    materials_supplied, lead_time_days, created_at, updated_at
"#;

impl SupplierService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Supplier>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM suppliers
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let suppliers = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            SELECT {}
            FROM suppliers
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(suppliers, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, supplier_id: Uuid) -> AppResult<Supplier> {
        sqlx::query_as::<_, Supplier>(&format!(
            "SELECT {} FROM suppliers WHERE id = $1 AND company_id = $2",
            SUPPLIER_COLUMNS
        ))
        .bind(supplier_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }

    pub async fn create(&self, company_id: Uuid, input: SupplierInput) -> AppResult<Supplier> {
        input.validate()?;

        let supplier = sqlx::query_as::<_, Supplier>(&format!(
            r#"
            INSERT INTO suppliers (
                company_id, name, contact_person, email, phone, gst_number, address,
                materials_supplied, lead_time_days
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.gst_number.as_deref().map(str::to_uppercase))
        .bind(&input.address)
        .bind(&input.materials_supplied)
        .bind(input.lead_time_days)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(supplier_id = %supplier.id, %company_id, "Supplier created");
        Ok(supplier)
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        supplier_id: Uuid,
        input: SupplierInput,
    ) -> AppResult<Supplier> {
        input.validate()?;

        sqlx::query_as::<_, Supplier>(&format!(
            r#"
            UPDATE suppliers
            SET name = $3, contact_person = $4, email = $5, phone = $6, gst_number = $7,
                address = $8, materials_supplied = $9, lead_time_days = $10, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            SUPPLIER_COLUMNS
        ))
        .bind(supplier_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.contact_person)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(input.gst_number.as_deref().map(str::to_uppercase))
        .bind(&input.address)
        .bind(&input.materials_supplied)
        .bind(input.lead_time_days)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Supplier".to_string()))
    }
}
