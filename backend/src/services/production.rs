//! Machine production records, finished-goods output and output reports

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use super::product::ProductService;
use super::stock::{self, StockKind};
use crate::error::{AppError, AppResult};
use shared::metrics;
use shared::models::{ProductProductionInput, ProductionRecordInput, Shift};
use shared::types::{DateRange, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductionRecord {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub machine_name: String,
    pub product_id: Option<Uuid>,
    pub semi_finished_product_id: Option<Uuid>,
    pub item_name: Option<String>,
    pub shift: Shift,
    pub produced_on: NaiveDate,
    pub planned_minutes: i32,
    pub run_minutes: i32,
    pub downtime_minutes: i32,
    pub ideal_cycle_time_seconds: Decimal,
    pub total_output: Decimal,
    pub scrap_quantity: Decimal,
    pub rework_quantity: Decimal,
    pub good_output: Decimal,
    pub scrap_reason_id: Option<Uuid>,
    pub scrap_reason: Option<String>,
    pub operator_name: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ProductionRecord {
    pub fn oee(&self) -> metrics::OeeBreakdown {
        metrics::oee(&metrics::OeeInputs::for_run(
            Decimal::from(self.planned_minutes),
            Decimal::from(self.run_minutes),
            self.ideal_cycle_time_seconds,
            self.total_output,
            self.scrap_quantity,
            self.rework_quantity,
        ))
    }
}

/// A production record together with its OEE
#[derive(Debug, Serialize)]
pub struct ProductionRecordDetail {
    #[serde(flatten)]
    pub record: ProductionRecord,
    pub oee: metrics::OeeBreakdown,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductProduction {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity_produced: Decimal,
    pub batch_number: Option<String>,
    pub produced_on: NaiveDate,
    pub unit_cost: Decimal,
    pub total_cost: Decimal,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ProductProductionResult {
    #[serde(flatten)]
    pub production: ProductProduction,
    pub stock_after: Decimal,
}

/// Output totals for one day
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DailyOutput {
    pub date: NaiveDate,
    pub production_runs: i64,
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    pub total_output: Decimal,
    pub good_output: Decimal,
    pub scrap_quantity: Decimal,
    pub rework_quantity: Decimal,
}

/// Output totals for one machine
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MachineOutput {
    pub machine_id: Uuid,
    pub machine_name: String,
    pub production_runs: i64,
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    pub total_output: Decimal,
    pub good_output: Decimal,
    pub scrap_quantity: Decimal,
    #[sqlx(skip)]
    pub utilisation: Decimal,
}

const RECORD_SELECT: &str = r#"
    SELECT r.id, r.machine_id, m.name AS machine_name, r.product_id, r.semi_finished_product_id,
           COALESCE(p.name, s.name) AS item_name, r.shift, r.produced_on, r.planned_minutes,
           r.run_minutes, (r.planned_minutes - r.run_minutes) AS downtime_minutes,
           r.ideal_cycle_time_seconds, r.total_output, r.scrap_quantity, r.rework_quantity,
           r.good_output, r.scrap_reason_id, sr.reason AS scrap_reason, r.operator_name, r.notes,
           r.created_at
    FROM production_records r
    JOIN machines m ON m.id = r.machine_id
    LEFT JOIN products p ON p.id = r.product_id
    LEFT JOIN semi_finished_products s ON s.id = r.semi_finished_product_id
    LEFT JOIN scrap_reasons sr ON sr.id = r.scrap_reason_id
"#;

const OUTPUT_SELECT: &str = r#"
    SELECT pp.id, pp.product_id, p.name AS product_name, pp.quantity_produced, pp.batch_number,
           pp.produced_on, pp.unit_cost, pp.total_cost, pp.notes, pp.created_at
    FROM product_productions pp
    JOIN products p ON p.id = pp.product_id
"#;

impl ProductionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_records(
        &self,
        company_id: Uuid,
        machine_id: Option<Uuid>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ProductionRecord>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM production_records
            WHERE company_id = $1 AND ($2::UUID IS NULL OR machine_id = $2)
            "#,
        )
        .bind(company_id)
        .bind(machine_id)
        .fetch_one(&self.db)
        .await?;

        let records = sqlx::query_as::<_, ProductionRecord>(&format!(
            r#"
            {}
            WHERE r.company_id = $1 AND ($2::UUID IS NULL OR r.machine_id = $2)
            ORDER BY r.produced_on DESC, r.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            RECORD_SELECT
        ))
        .bind(company_id)
        .bind(machine_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(records, pagination, total as u64))
    }

    pub async fn get_record(
        &self,
        company_id: Uuid,
        record_id: Uuid,
    ) -> AppResult<ProductionRecordDetail> {
        let record = sqlx::query_as::<_, ProductionRecord>(&format!(
            "{} WHERE r.id = $1 AND r.company_id = $2",
            RECORD_SELECT
        ))
        .bind(record_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production record".to_string()))?;

        Ok(ProductionRecordDetail {
            oee: record.oee(),
            record,
        })
    }

    pub async fn create_record(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: ProductionRecordInput,
    ) -> AppResult<ProductionRecordDetail> {
        input.validate()?;

        ensure_owned(&self.db, "machines", "Machine", company_id, input.machine_id).await?;
        if let Some(product_id) = input.product_id {
            ensure_owned(&self.db, "products", "Product", company_id, product_id).await?;
        }
        if let Some(semi_id) = input.semi_finished_product_id {
            ensure_owned(
                &self.db,
                "semi_finished_products",
                "Semi-finished product",
                company_id,
                semi_id,
            )
            .await?;
        }
        if let Some(reason_id) = input.scrap_reason_id {
            ensure_owned(&self.db, "scrap_reasons", "Scrap reason", company_id, reason_id).await?;
        }

        let produced_on = input.produced_on.unwrap_or_else(|| Utc::now().date_naive());

        let record_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO production_records (
                company_id, machine_id, product_id, semi_finished_product_id, shift, produced_on,
                planned_minutes, run_minutes, ideal_cycle_time_seconds, total_output,
                scrap_quantity, rework_quantity, good_output, scrap_reason_id, operator_name,
                notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.machine_id)
        .bind(input.product_id)
        .bind(input.semi_finished_product_id)
        .bind(input.shift)
        .bind(produced_on)
        .bind(input.planned_minutes)
        .bind(input.run_minutes)
        .bind(input.ideal_cycle_time_seconds)
        .bind(input.total_output)
        .bind(input.scrap_quantity)
        .bind(input.rework_quantity)
        .bind(input.good_output())
        .bind(input.scrap_reason_id)
        .bind(&input.operator_name)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&self.db)
        .await?;

        let detail = self.get_record(company_id, record_id).await?;

        tracing::info!(
            record_id = %record_id,
            machine_id = %input.machine_id,
            total_output = %input.total_output,
            oee = %detail.oee.oee,
            "Production recorded"
        );
        Ok(detail)
    }

    // Finished-goods output

    pub async fn list_outputs(
        &self,
        company_id: Uuid,
        product_id: Option<Uuid>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ProductProduction>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM product_productions
            WHERE company_id = $1 AND ($2::UUID IS NULL OR product_id = $2)
            "#,
        )
        .bind(company_id)
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;

        let outputs = sqlx::query_as::<_, ProductProduction>(&format!(
            r#"
            {}
            WHERE pp.company_id = $1 AND ($2::UUID IS NULL OR pp.product_id = $2)
            ORDER BY pp.produced_on DESC, pp.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
            OUTPUT_SELECT
        ))
        .bind(company_id)
        .bind(product_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(outputs, pagination, total as u64))
    }

    /// Record finished goods: raw materials, semi-finished components and
    /// packaging in the bill of materials are drawn from stock and the
    /// product's stock increases, all in one transaction
    pub async fn record_output(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: ProductProductionInput,
    ) -> AppResult<ProductProductionResult> {
        input.validate()?;

        let products = ProductService::new(self.db.clone());
        let product = products.get_product(company_id, input.product_id).await?;
        let breakdown = products
            .cost(
                company_id,
                &product.bom,
                product.overhead_cost_per_unit,
                product.packaging_cost_per_unit,
            )
            .await?;

        let quantity = input.quantity_produced;
        let unit_cost = breakdown.total_cost;
        let total_cost = scaled(unit_cost, quantity)?.round_dp(4);
        let produced_on = input.produced_on.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        for line in &product.bom.raw_materials {
            stock::consume(
                &mut tx,
                StockKind::RawMaterial,
                company_id,
                line.raw_material_id,
                scaled(line.quantity, quantity)?,
            )
            .await?;
        }
        for line in &product.bom.semi_finished_products {
            stock::consume(
                &mut tx,
                StockKind::SemiFinished,
                company_id,
                line.semi_finished_product_id,
                scaled(line.quantity, quantity)?,
            )
            .await?;
        }
        for line in &product.bom.packaging {
            stock::consume(
                &mut tx,
                StockKind::Packaging,
                company_id,
                line.packaging_raw_material_id,
                scaled(line.quantity, quantity)?,
            )
            .await?;
        }

        let stock_after =
            stock::receive(&mut tx, StockKind::Product, company_id, product.id, quantity).await?;

        let output_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO product_productions (
                company_id, product_id, quantity_produced, batch_number, produced_on,
                unit_cost, total_cost, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(product.id)
        .bind(quantity)
        .bind(&input.batch_number)
        .bind(produced_on)
        .bind(unit_cost)
        .bind(total_cost)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let production =
            sqlx::query_as::<_, ProductProduction>(&format!("{} WHERE pp.id = $1", OUTPUT_SELECT))
                .bind(output_id)
                .fetch_one(&mut *tx)
                .await?;

        // Keep the stored unit cost in step with current prices
        sqlx::query("UPDATE products SET unit_cost = $2, cost_breakdown = $3 WHERE id = $1")
            .bind(product.id)
            .bind(unit_cost)
            .bind(sqlx::types::Json(&breakdown))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %product.id,
            quantity = %quantity,
            unit_cost = %unit_cost,
            stock_after = %stock_after,
            "Product output recorded"
        );

        Ok(ProductProductionResult {
            production,
            stock_after,
        })
    }

    // Output reports

    pub async fn daily_output(
        &self,
        company_id: Uuid,
        range: &DateRange,
    ) -> AppResult<Vec<DailyOutput>> {
        let rows = sqlx::query_as::<_, DailyOutput>(
            r#"
            SELECT produced_on AS date,
                   COUNT(*) AS production_runs,
                   COALESCE(SUM(planned_minutes), 0)::NUMERIC AS planned_minutes,
                   COALESCE(SUM(run_minutes), 0)::NUMERIC AS run_minutes,
                   COALESCE(SUM(total_output), 0) AS total_output,
                   COALESCE(SUM(good_output), 0) AS good_output,
                   COALESCE(SUM(scrap_quantity), 0) AS scrap_quantity,
                   COALESCE(SUM(rework_quantity), 0) AS rework_quantity
            FROM production_records
            WHERE company_id = $1 AND produced_on BETWEEN $2 AND $3
            GROUP BY produced_on
            ORDER BY produced_on ASC
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows)
    }

    pub async fn machine_output(
        &self,
        company_id: Uuid,
        range: &DateRange,
    ) -> AppResult<Vec<MachineOutput>> {
        let mut rows = sqlx::query_as::<_, MachineOutput>(
            r#"
            SELECT m.id AS machine_id, m.name AS machine_name,
                   COUNT(r.id) AS production_runs,
                   COALESCE(SUM(r.planned_minutes), 0)::NUMERIC AS planned_minutes,
                   COALESCE(SUM(r.run_minutes), 0)::NUMERIC AS run_minutes,
                   COALESCE(SUM(r.total_output), 0) AS total_output,
                   COALESCE(SUM(r.good_output), 0) AS good_output,
                   COALESCE(SUM(r.scrap_quantity), 0) AS scrap_quantity
            FROM machines m
            LEFT JOIN production_records r
                   ON r.machine_id = m.id AND r.produced_on BETWEEN $2 AND $3
            WHERE m.company_id = $1
            GROUP BY m.id, m.name
            ORDER BY total_output DESC, m.name ASC
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        for row in &mut rows {
            row.utilisation = metrics::utilisation(row.run_minutes, row.planned_minutes);
        }
        Ok(rows)
    }
}

/// `per_unit × quantity` for one production run
fn scaled(per_unit: Decimal, quantity: Decimal) -> AppResult<Decimal> {
    per_unit.checked_mul(quantity).ok_or_else(|| {
        AppError::validation("quantity_produced", "Quantity produced is too large")
    })
}
