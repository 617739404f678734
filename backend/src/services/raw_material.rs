//! Raw material catalogue and stock intake service

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use super::stock::{self, StockKind};
use crate::error::{AppError, AppResult};
use shared::models::{RawMaterialInput, StockIntakeInput};
use shared::types::{PaginatedResponse, Pagination, UnitOfMeasure};
use shared::validation;

#[derive(Clone)]
pub struct RawMaterialService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RawMaterial {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sku: String,
    pub category: Option<String>,
    pub uom: UnitOfMeasure,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub price_per_unit: Decimal,
    pub current_stock: Decimal,
    pub reorder_level: Decimal,
    pub is_low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Goods-received record
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockEntry {
    pub id: Uuid,
    pub raw_material_id: Uuid,
    pub raw_material_name: String,
    pub supplier_id: Option<Uuid>,
    pub supplier_name: Option<String>,
    pub quantity_received: Decimal,
    pub price_per_unit: Decimal,
    pub total_cost: Decimal,
    pub invoice_number: Option<String>,
    pub received_on: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Intake result with the material's stock after receipt
#[derive(Debug, Serialize)]
pub struct StockIntakeResult {
    #[serde(flatten)]
    pub entry: StockEntry,
    pub stock_after: Decimal,
}

const MATERIAL_SELECT: &str = r#"
    SELECT rm.id, rm.company_id, rm.name, rm.sku, rm.category, rm.uom, rm.supplier_id,
           s.name AS supplier_name, rm.price_per_unit, rm.current_stock, rm.reorder_level,
           rm.current_stock <= rm.reorder_level AS is_low_stock,
           rm.created_at, rm.updated_at
    FROM raw_materials rm
    LEFT JOIN suppliers s ON s.id = rm.supplier_id
"#;

const ENTRY_SELECT: &str = r#"
    SELECT e.id, e.raw_material_id, rm.name AS raw_material_name, e.supplier_id,
           s.name AS supplier_name, e.quantity_received, e.price_per_unit, e.total_cost,
           e.invoice_number, e.received_on, e.notes, e.created_at
    FROM raw_material_stock_entries e
    JOIN raw_materials rm ON rm.id = e.raw_material_id
    LEFT JOIN suppliers s ON s.id = e.supplier_id
"#;

impl RawMaterialService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<RawMaterial>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM raw_materials
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR sku ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let materials = sqlx::query_as::<_, RawMaterial>(&format!(
            r#"
            {}
            WHERE rm.company_id = $1
              AND ($2::TEXT IS NULL OR rm.name ILIKE '%' || $2 || '%' OR rm.sku ILIKE '%' || $2 || '%')
            ORDER BY rm.name ASC
            LIMIT $3 OFFSET $4
            "#,
            MATERIAL_SELECT
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(materials, pagination, total as u64))
    }

    /// Materials at or below their reorder level, emptiest first
    pub async fn low_stock(&self, company_id: Uuid) -> AppResult<Vec<RawMaterial>> {
        let materials = sqlx::query_as::<_, RawMaterial>(&format!(
            r#"
            {}
            WHERE rm.company_id = $1 AND rm.current_stock <= rm.reorder_level
            ORDER BY (rm.current_stock - rm.reorder_level) ASC, rm.name ASC
            "#,
            MATERIAL_SELECT
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(materials)
    }

    pub async fn get(&self, company_id: Uuid, material_id: Uuid) -> AppResult<RawMaterial> {
        sqlx::query_as::<_, RawMaterial>(&format!(
            "{} WHERE rm.id = $1 AND rm.company_id = $2",
            MATERIAL_SELECT
        ))
        .bind(material_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Raw material".to_string()))
    }

    pub async fn create(&self, company_id: Uuid, input: RawMaterialInput) -> AppResult<RawMaterial> {
        input.validate()?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_owned(&self.db, "suppliers", "Supplier", company_id, supplier_id).await?;
        }

        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO raw_materials (
                company_id, name, sku, category, uom, supplier_id,
                price_per_unit, current_stock, reorder_level
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(&input.category)
        .bind(input.uom)
        .bind(input.supplier_id)
        .bind(input.price_per_unit)
        .bind(input.current_stock)
        .bind(input.reorder_level)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(raw_material_id = %id, %company_id, "Raw material created");
        self.get(company_id, id).await
    }

    /// Replace a material's details. Stock changes only through intake
    /// and consumption, so `current_stock` in the input is ignored here.
    pub async fn update(
        &self,
        company_id: Uuid,
        material_id: Uuid,
        input: RawMaterialInput,
    ) -> AppResult<RawMaterial> {
        input.validate()?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_owned(&self.db, "suppliers", "Supplier", company_id, supplier_id).await?;
        }

        let updated = sqlx::query(
            r#"
            UPDATE raw_materials
            SET name = $3, sku = $4, category = $5, uom = $6, supplier_id = $7,
                price_per_unit = $8, reorder_level = $9, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(material_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(&input.category)
        .bind(input.uom)
        .bind(input.supplier_id)
        .bind(input.price_per_unit)
        .bind(input.reorder_level)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Raw material".to_string()));
        }
        self.get(company_id, material_id).await
    }

    pub async fn list_entries(
        &self,
        company_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<StockEntry>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM raw_material_stock_entries WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        let entries = sqlx::query_as::<_, StockEntry>(&format!(
            r#"
            {}
            WHERE e.company_id = $1
            ORDER BY e.received_on DESC, e.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            ENTRY_SELECT
        ))
        .bind(company_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(entries, pagination, total as u64))
    }

    /// Intake history of one material
    pub async fn entries_for_material(
        &self,
        company_id: Uuid,
        material_id: Uuid,
    ) -> AppResult<Vec<StockEntry>> {
        ensure_owned(&self.db, "raw_materials", "Raw material", company_id, material_id).await?;

        let entries = sqlx::query_as::<_, StockEntry>(&format!(
            r#"
            {}
            WHERE e.company_id = $1 AND e.raw_material_id = $2
            ORDER BY e.received_on DESC, e.created_at DESC
            "#,
            ENTRY_SELECT
        ))
        .bind(company_id)
        .bind(material_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    /// Record goods received: logs the entry, raises stock and updates the
    /// material's latest purchase price, all in one transaction
    pub async fn record_intake(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: StockIntakeInput,
    ) -> AppResult<StockIntakeResult> {
        input.validate()?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_owned(&self.db, "suppliers", "Supplier", company_id, supplier_id).await?;
        }
        let total_cost = input
            .total_cost()
            .filter(validation::within_total_limit)
            .ok_or_else(|| AppError::validation("quantity_received", "Total cost is too large"))?;
        let received_on = input.received_on.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        let stock_after = stock::receive(
            &mut tx,
            StockKind::RawMaterial,
            company_id,
            input.raw_material_id,
            input.quantity_received,
        )
        .await?;

        sqlx::query("UPDATE raw_materials SET price_per_unit = $2 WHERE id = $1")
            .bind(input.raw_material_id)
            .bind(input.price_per_unit)
            .execute(&mut *tx)
            .await?;

        let entry_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO raw_material_stock_entries (
                company_id, raw_material_id, supplier_id, quantity_received, price_per_unit,
                total_cost, invoice_number, received_on, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.raw_material_id)
        .bind(input.supplier_id)
        .bind(input.quantity_received)
        .bind(input.price_per_unit)
        .bind(total_cost)
        .bind(&input.invoice_number)
        .bind(received_on)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let entry = sqlx::query_as::<_, StockEntry>(&format!("{} WHERE e.id = $1", ENTRY_SELECT))
            .bind(entry_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            raw_material_id = %input.raw_material_id,
            quantity = %input.quantity_received,
            total_cost = %total_cost,
            "Stock intake recorded"
        );

        Ok(StockIntakeResult { entry, stock_after })
    }
}
