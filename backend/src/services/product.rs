//! Finished and semi-finished products, bills of materials and unit costing

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::manual_job::ManualJob;
use super::stock::{self, StockAdjustment, StockKind};
use crate::error::{AppError, AppResult};
use shared::metrics;
use shared::models::{
    BillOfMaterials, CostBreakdown, ProductInput, SemiFinishedProductInput, StockAdjustmentInput,
};
use shared::types::{PaginatedResponse, Pagination, UnitOfMeasure};

#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sku: String,
    pub uom: UnitOfMeasure,
    pub description: Option<String>,
    pub selling_price: Decimal,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub overhead_cost_per_unit: Decimal,
    pub packaging_cost_per_unit: Decimal,
    pub bom: Json<BillOfMaterials>,
    pub cost_breakdown: Json<CostBreakdown>,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SemiFinishedProduct {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub sku: String,
    pub uom: UnitOfMeasure,
    pub description: Option<String>,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    pub overhead_cost_per_unit: Decimal,
    pub bom: Json<BillOfMaterials>,
    pub cost_breakdown: Json<CostBreakdown>,
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Live unit cost of a product against its selling price
#[derive(Debug, Serialize)]
pub struct ProductCostReport {
    pub product_id: Uuid,
    pub product_name: String,
    pub selling_price: Decimal,
    pub cost_breakdown: CostBreakdown,
    pub unit_margin: Decimal,
    pub margin_percent: Decimal,
}

/// Current prices of everything a bill of materials can reference
#[derive(Debug, Default)]
pub struct PriceBook {
    pub raw_material_prices: HashMap<Uuid, Decimal>,
    pub machine_hourly_costs: HashMap<Uuid, Decimal>,
    pub manual_job_unit_costs: HashMap<Uuid, Decimal>,
    pub semi_finished_unit_costs: HashMap<Uuid, Decimal>,
    pub packaging_prices: HashMap<Uuid, Decimal>,
}

/// Why a bill of materials could not be costed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostError {
    /// Resource name of the first line with no price
    MissingPrice(&'static str),
    Overflow,
}

impl From<CostError> for AppError {
    fn from(err: CostError) -> Self {
        match err {
            CostError::MissingPrice(resource) => AppError::NotFound(resource.to_string()),
            CostError::Overflow => AppError::validation("bom", "Bill of materials cost is too large"),
        }
    }
}

/// Unit cost of a bill of materials at the given prices
pub fn cost_bom(
    bom: &BillOfMaterials,
    prices: &PriceBook,
    overhead_per_unit: Decimal,
    packaging_per_unit: Decimal,
) -> Result<CostBreakdown, CostError> {
    let mut raw_material_cost = Decimal::ZERO;
    for line in &bom.raw_materials {
        let price = prices
            .raw_material_prices
            .get(&line.raw_material_id)
            .ok_or(CostError::MissingPrice("Raw material"))?;
        raw_material_cost = metrics::total_cost(line.quantity, *price)
            .and_then(|cost| raw_material_cost.checked_add(cost))
            .ok_or(CostError::Overflow)?;
    }

    let mut machine_cost = Decimal::ZERO;
    for line in &bom.machines {
        let hourly = prices
            .machine_hourly_costs
            .get(&line.machine_id)
            .ok_or(CostError::MissingPrice("Machine"))?;
        machine_cost += metrics::machine_time_cost(line.minutes_per_unit, *hourly);
    }

    let mut labour_cost = Decimal::ZERO;
    for line in &bom.manual_jobs {
        let unit = prices
            .manual_job_unit_costs
            .get(&line.manual_job_id)
            .ok_or(CostError::MissingPrice("Manual job"))?;
        labour_cost += line.quantity * *unit;
    }

    let mut semi_finished_cost = Decimal::ZERO;
    for line in &bom.semi_finished_products {
        let unit = prices
            .semi_finished_unit_costs
            .get(&line.semi_finished_product_id)
            .ok_or(CostError::MissingPrice("Semi-finished product"))?;
        semi_finished_cost += line.quantity * *unit;
    }

    let mut packaging_cost = packaging_per_unit;
    for line in &bom.packaging {
        let price = prices
            .packaging_prices
            .get(&line.packaging_raw_material_id)
            .ok_or(CostError::MissingPrice("Packaging raw material"))?;
        packaging_cost = metrics::total_cost(line.quantity, *price)
            .and_then(|cost| packaging_cost.checked_add(cost))
            .ok_or(CostError::Overflow)?;
    }

    Ok(CostBreakdown::new(
        raw_material_cost,
        machine_cost,
        labour_cost,
        semi_finished_cost,
        overhead_per_unit,
        packaging_cost,
    ))
}

const PRODUCT_COLUMNS: &str = r#"
    id, company_id, name, sku, uom, description, selling_price, current_stock, min_stock_level,
    overhead_cost_per_unit, packaging_cost_per_unit, bom, cost_breakdown, unit_cost,
    created_at, updated_at
"#;

const SEMI_COLUMNS: &str = r#"
    id, company_id, name, sku, uom, description, current_stock, min_stock_level,
    overhead_cost_per_unit, bom, cost_breakdown, unit_cost, created_at, updated_at
"#;

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Load the prices a bill of materials refers to, scoped to the company
    pub async fn price_book(&self, company_id: Uuid, bom: &BillOfMaterials) -> AppResult<PriceBook> {
        let raw_ids: Vec<Uuid> = bom.raw_materials.iter().map(|l| l.raw_material_id).collect();
        let machine_ids: Vec<Uuid> = bom.machines.iter().map(|l| l.machine_id).collect();
        let job_ids: Vec<Uuid> = bom.manual_jobs.iter().map(|l| l.manual_job_id).collect();
        let semi_ids: Vec<Uuid> = bom.semi_finished_ids().collect();
        let packaging_ids: Vec<Uuid> = bom
            .packaging
            .iter()
            .map(|l| l.packaging_raw_material_id)
            .collect();

        let raw_material_prices = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT id, price_per_unit FROM raw_materials WHERE company_id = $1 AND id = ANY($2)",
        )
        .bind(company_id)
        .bind(&raw_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let machine_hourly_costs = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT id, hourly_operating_cost FROM machines WHERE company_id = $1 AND id = ANY($2)",
        )
        .bind(company_id)
        .bind(&machine_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let manual_job_unit_costs = sqlx::query_as::<_, ManualJob>(
            r#"
            SELECT id, company_id, name, description, cost_model, standard_minutes_per_unit,
                   standard_batch_size, material_requirements, created_at, updated_at
            FROM manual_jobs
            WHERE company_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(company_id)
        .bind(&job_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|job| (job.id, job.unit_cost()))
        .collect();

        let semi_finished_unit_costs = sqlx::query_as::<_, (Uuid, Decimal)>(
            "SELECT id, unit_cost FROM semi_finished_products WHERE company_id = $1 AND id = ANY($2)",
        )
        .bind(company_id)
        .bind(&semi_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        let packaging_prices = sqlx::query_as::<_, (Uuid, Decimal)>(
            r#"
            SELECT id, price_per_unit FROM packaging_raw_materials
            WHERE company_id = $1 AND id = ANY($2)
            "#,
        )
        .bind(company_id)
        .bind(&packaging_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .collect();

        Ok(PriceBook {
            raw_material_prices,
            machine_hourly_costs,
            manual_job_unit_costs,
            semi_finished_unit_costs,
            packaging_prices,
        })
    }

    pub(crate) async fn cost(
        &self,
        company_id: Uuid,
        bom: &BillOfMaterials,
        overhead_per_unit: Decimal,
        packaging_per_unit: Decimal,
    ) -> AppResult<CostBreakdown> {
        let prices = self.price_book(company_id, bom).await?;
        Ok(cost_bom(bom, &prices, overhead_per_unit, packaging_per_unit)?)
    }

    // Products

    pub async fn list_products(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Product>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM products
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR sku ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let products = sqlx::query_as::<_, Product>(&format!(
            r#"
            SELECT {}
            FROM products
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR sku ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(products, pagination, total as u64))
    }

    pub async fn get_product(&self, company_id: Uuid, product_id: Uuid) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {} FROM products WHERE id = $1 AND company_id = $2",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn create_product(&self, company_id: Uuid, input: ProductInput) -> AppResult<Product> {
        input.validate()?;
        let breakdown = self
            .cost(
                company_id,
                &input.bom,
                input.overhead_cost_per_unit,
                input.packaging_cost_per_unit,
            )
            .await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                company_id, name, sku, uom, description, selling_price, current_stock,
                min_stock_level, overhead_cost_per_unit, packaging_cost_per_unit, bom,
                cost_breakdown, unit_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(input.uom)
        .bind(&input.description)
        .bind(input.selling_price)
        .bind(input.current_stock)
        .bind(input.min_stock_level)
        .bind(input.overhead_cost_per_unit)
        .bind(input.packaging_cost_per_unit)
        .bind(Json(&input.bom))
        .bind(Json(&breakdown))
        .bind(breakdown.total_cost)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(product_id = %product.id, unit_cost = %product.unit_cost, "Product created");
        Ok(product)
    }

    /// Replace a product's details and re-cost its bill of materials.
    /// Stock moves only through production, deliveries of stock and adjustments.
    pub async fn update_product(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        input: ProductInput,
    ) -> AppResult<Product> {
        input.validate()?;
        let breakdown = self
            .cost(
                company_id,
                &input.bom,
                input.overhead_cost_per_unit,
                input.packaging_cost_per_unit,
            )
            .await?;

        sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $3, sku = $4, uom = $5, description = $6, selling_price = $7,
                min_stock_level = $8, overhead_cost_per_unit = $9, packaging_cost_per_unit = $10,
                bom = $11, cost_breakdown = $12, unit_cost = $13, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(input.uom)
        .bind(&input.description)
        .bind(input.selling_price)
        .bind(input.min_stock_level)
        .bind(input.overhead_cost_per_unit)
        .bind(input.packaging_cost_per_unit)
        .bind(Json(&input.bom))
        .bind(Json(&breakdown))
        .bind(breakdown.total_cost)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".to_string()))
    }

    pub async fn adjust_product_stock(
        &self,
        company_id: Uuid,
        product_id: Uuid,
        user_id: Uuid,
        input: StockAdjustmentInput,
    ) -> AppResult<StockAdjustment> {
        stock::adjust_stock(&self.db, StockKind::Product, company_id, product_id, user_id, input)
            .await
    }

    /// Cost the product at today's prices
    pub async fn cost_report(
        &self,
        company_id: Uuid,
        product_id: Uuid,
    ) -> AppResult<ProductCostReport> {
        let product = self.get_product(company_id, product_id).await?;
        let breakdown = self
            .cost(
                company_id,
                &product.bom,
                product.overhead_cost_per_unit,
                product.packaging_cost_per_unit,
            )
            .await?;

        let unit_margin = product.selling_price - breakdown.total_cost;
        Ok(ProductCostReport {
            product_id: product.id,
            product_name: product.name,
            selling_price: product.selling_price,
            margin_percent: metrics::percent(unit_margin, product.selling_price),
            unit_margin,
            cost_breakdown: breakdown,
        })
    }

    // Semi-finished products

    pub async fn list_semi_finished(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<SemiFinishedProduct>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM semi_finished_products
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR sku ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let items = sqlx::query_as::<_, SemiFinishedProduct>(&format!(
            r#"
            SELECT {}
            FROM semi_finished_products
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR sku ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            SEMI_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(items, pagination, total as u64))
    }

    pub async fn get_semi_finished(
        &self,
        company_id: Uuid,
        item_id: Uuid,
    ) -> AppResult<SemiFinishedProduct> {
        sqlx::query_as::<_, SemiFinishedProduct>(&format!(
            "SELECT {} FROM semi_finished_products WHERE id = $1 AND company_id = $2",
            SEMI_COLUMNS
        ))
        .bind(item_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Semi-finished product".to_string()))
    }

    pub async fn create_semi_finished(
        &self,
        company_id: Uuid,
        input: SemiFinishedProductInput,
    ) -> AppResult<SemiFinishedProduct> {
        input.validate()?;
        let breakdown = self
            .cost(company_id, &input.bom, input.overhead_cost_per_unit, Decimal::ZERO)
            .await?;

        let item = sqlx::query_as::<_, SemiFinishedProduct>(&format!(
            r#"
            INSERT INTO semi_finished_products (
                company_id, name, sku, uom, description, current_stock, min_stock_level,
                overhead_cost_per_unit, bom, cost_breakdown, unit_cost
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            SEMI_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(input.uom)
        .bind(&input.description)
        .bind(input.current_stock)
        .bind(input.min_stock_level)
        .bind(input.overhead_cost_per_unit)
        .bind(Json(&input.bom))
        .bind(Json(&breakdown))
        .bind(breakdown.total_cost)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(semi_finished_id = %item.id, unit_cost = %item.unit_cost, "Semi-finished product created");
        Ok(item)
    }

    pub async fn update_semi_finished(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        input: SemiFinishedProductInput,
    ) -> AppResult<SemiFinishedProduct> {
        input.validate()?;
        if input.bom.semi_finished_ids().any(|id| id == item_id) {
            return Err(AppError::validation(
                "bom.semi_finished_products",
                "A semi-finished product cannot be a component of itself",
            ));
        }
        let breakdown = self
            .cost(company_id, &input.bom, input.overhead_cost_per_unit, Decimal::ZERO)
            .await?;

        sqlx::query_as::<_, SemiFinishedProduct>(&format!(
            r#"
            UPDATE semi_finished_products
            SET name = $3, sku = $4, uom = $5, description = $6, min_stock_level = $7,
                overhead_cost_per_unit = $8, bom = $9, cost_breakdown = $10, unit_cost = $11,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            SEMI_COLUMNS
        ))
        .bind(item_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.sku.trim().to_uppercase())
        .bind(input.uom)
        .bind(&input.description)
        .bind(input.min_stock_level)
        .bind(input.overhead_cost_per_unit)
        .bind(Json(&input.bom))
        .bind(Json(&breakdown))
        .bind(breakdown.total_cost)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Semi-finished product".to_string()))
    }

    pub async fn adjust_semi_finished_stock(
        &self,
        company_id: Uuid,
        item_id: Uuid,
        user_id: Uuid,
        input: StockAdjustmentInput,
    ) -> AppResult<StockAdjustment> {
        stock::adjust_stock(
            &self.db,
            StockKind::SemiFinished,
            company_id,
            item_id,
            user_id,
            input,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{BomMachine, BomManualJob, BomPackaging, BomRawMaterial, BomSemiFinished};
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_cost_bom() {
        let steel = Uuid::new_v4();
        let press = Uuid::new_v4();
        let polish = Uuid::new_v4();
        let bracket = Uuid::new_v4();

        let bom = BillOfMaterials {
            raw_materials: vec![BomRawMaterial {
                raw_material_id: steel,
                quantity: dec("2.5"),
            }],
            machines: vec![BomMachine {
                machine_id: press,
                minutes_per_unit: dec("6"),
            }],
            manual_jobs: vec![BomManualJob {
                manual_job_id: polish,
                quantity: dec("1"),
            }],
            semi_finished_products: vec![BomSemiFinished {
                semi_finished_product_id: bracket,
                quantity: dec("2"),
            }],
            ..Default::default()
        };

        let mut prices = PriceBook::default();
        prices.raw_material_prices.insert(steel, dec("80"));
        prices.machine_hourly_costs.insert(press, dec("450"));
        prices.manual_job_unit_costs.insert(polish, dec("12"));
        prices.semi_finished_unit_costs.insert(bracket, dec("35.5"));

        let cost = cost_bom(&bom, &prices, dec("5"), dec("3")).unwrap();
        assert_eq!(cost.raw_material_cost, dec("200"));
        assert_eq!(cost.machine_cost, dec("45"));
        assert_eq!(cost.labour_cost, dec("12"));
        assert_eq!(cost.semi_finished_cost, dec("71"));
        assert_eq!(cost.total_cost, dec("336"));
    }

    #[test]
    fn test_cost_bom_missing_price() {
        let bom = BillOfMaterials {
            machines: vec![BomMachine {
                machine_id: Uuid::new_v4(),
                minutes_per_unit: dec("1"),
            }],
            ..Default::default()
        };
        assert_eq!(
            cost_bom(&bom, &PriceBook::default(), Decimal::ZERO, Decimal::ZERO),
            Err(CostError::MissingPrice("Machine"))
        );
    }

    #[test]
    fn test_cost_bom_packaging_lines() {
        let carton = Uuid::new_v4();
        let bom = BillOfMaterials {
            packaging: vec![BomPackaging {
                packaging_raw_material_id: carton,
                quantity: dec("0.25"),
            }],
            ..Default::default()
        };
        let mut prices = PriceBook::default();
        prices.packaging_prices.insert(carton, dec("18"));

        let cost = cost_bom(&bom, &prices, Decimal::ZERO, dec("1.5")).unwrap();
        assert_eq!(cost.packaging_cost, dec("6"));
        assert_eq!(cost.total_cost, dec("6"));

        assert_eq!(
            cost_bom(&bom, &PriceBook::default(), Decimal::ZERO, Decimal::ZERO),
            Err(CostError::MissingPrice("Packaging raw material"))
        );
    }

    #[test]
    fn test_cost_bom_overflow() {
        let steel = Uuid::new_v4();
        let bom = BillOfMaterials {
            raw_materials: vec![BomRawMaterial {
                raw_material_id: steel,
                quantity: Decimal::MAX,
            }],
            ..Default::default()
        };
        let mut prices = PriceBook::default();
        prices.raw_material_prices.insert(steel, dec("2"));
        let err = cost_bom(&bom, &prices, Decimal::ZERO, Decimal::ZERO).unwrap_err();
        assert_eq!(err, CostError::Overflow);
        assert!(matches!(AppError::from(err), AppError::Validation { .. }));
    }

    #[test]
    fn test_empty_bom_costs_overheads_only() {
        let cost = cost_bom(
            &BillOfMaterials::default(),
            &PriceBook::default(),
            dec("4.25"),
            dec("1.75"),
        )
        .unwrap();
        assert_eq!(cost.total_cost, dec("6"));
    }
}
