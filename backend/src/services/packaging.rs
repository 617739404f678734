//! Packaging raw material service

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use super::stock::{self, StockAdjustment, StockKind};
use crate::error::{AppError, AppResult};
use shared::models::{PackagingRawMaterialInput, PackagingType, StockAdjustmentInput};
use shared::types::{PaginatedResponse, Pagination, UnitOfMeasure};

#[derive(Clone)]
pub struct PackagingService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PackagingRawMaterial {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sku: String,
    pub packaging_type: PackagingType,
    pub material: Option<String>,
    pub dimensions: Option<String>,
    pub uom: UnitOfMeasure,
    pub supplier_id: Option<Uuid>,
    pub price_per_unit: Decimal,
    pub current_stock: Decimal,
    pub reorder_level: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const PACKAGING_COLUMNS: &str = r#"
    id, company_id, name, sku, packaging_type, material, dimensions, uom, supplier_id,
    price_per_unit, current_stock, reorder_level, created_at, updated_at
"#;

impl PackagingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<PackagingRawMaterial>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM packaging_raw_materials
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, PackagingRawMaterial>(&format!(
            r#"
            SELECT {}
            FROM packaging_raw_materials
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            PACKAGING_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, item_id: Uuid) -> AppResult<PackagingRawMaterial> {
        sqlx::query_as::<_, PackagingRawMaterial>(&format!(
            "SELECT {} FROM packaging_raw_materials WHERE id = $1 AND company_id = $2",
            PACKAGING_COLUMNS
        ))
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Packaging raw material".to_string()))
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        input: PackagingRawMaterialInput,
    ) -> AppResult<PackagingRawMaterial> {
        input.validate()?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_owned(&self.db, "suppliers", "Supplier", company_id, supplier_id).await?;
        }

        let item = sqlx::query_as::<_, PackagingRawMaterial>(&format!(
            r#"
            INSERT INTO packaging_raw_materials (
                company_id, name, sku, packaging_type, material, dimensions, uom,
                supplier_id, price_per_unit, current_stock, reorder_level
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            PACKAGING_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(input.packaging_type)
        .bind(&input.material)
        .bind(&input.dimensions)
        .bind(input.uom)
        .bind(input.supplier_id)
        .bind(input.price_per_unit)
        .bind(input.current_stock)
        .bind(input.reorder_level)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(packaging_id = %item.id, %company_id, "Packaging raw material created");
        Ok(item)
    }

    /// Replace details; stock moves only through `adjust_stock`
    pub async fn update(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        input: PackagingRawMaterialInput,
    ) -> AppResult<PackagingRawMaterial> {
        input.validate()?;
        if let Some(supplier_id) = input.supplier_id {
            ensure_owned(&self.db, "suppliers", "Supplier", company_id, supplier_id).await?;
        }

        sqlx::query_as::<_, PackagingRawMaterial>(&format!(
            r#"
            UPDATE packaging_raw_materials
            SET name = $3, sku = $4, packaging_type = $5, material = $6, dimensions = $7,
                uom = $8, supplier_id = $9, price_per_unit = $10, reorder_level = $11,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            PACKAGING_COLUMNS
        ))
        .bind(item_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(input.packaging_type)
        .bind(&input.material)
        .bind(&input.dimensions)
        .bind(input.uom)
        .bind(input.supplier_id)
        .bind(input.price_per_unit)
        .bind(input.reorder_level)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Packaging raw material".to_string()))
    }

    pub async fn adjust_stock(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        user_id: Uuid,
        input: StockAdjustmentInput,
    ) -> AppResult<StockAdjustment> {
        stock::adjust_stock(
            &self.db,
            StockKind::Packaging,
            company_id,
            item_id,
            user_id,
            input,
        )
        .await
    }
}
