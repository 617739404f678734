//! Manual (labour) jobs and their production runs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use super::stock::{self, StockKind};
use crate::error::{AppError, AppResult};
use shared::models::{ManualJobCost, ManualJobInput, ManualJobProductionInput, MaterialRequirement};
use shared::types::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct ManualJobService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ManualJob {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub cost_model: Json<ManualJobCost>,
    pub standard_minutes_per_unit: Option<Decimal>,
    pub standard_batch_size: Option<Decimal>,
    pub material_requirements: Json<Vec<MaterialRequirement>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ManualJob {
    /// Standard labour cost of one unit, as used in product costing
    pub fn unit_cost(&self) -> Decimal {
        self.cost_model
            .unit_cost(self.standard_minutes_per_unit, self.standard_batch_size)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ManualJobProduction {
    pub id: Uuid,
    pub manual_job_id: Uuid,
    pub manual_job_name: String,
    pub worker_name: Option<String>,
    pub quantity_produced: Decimal,
    pub hours_worked: Decimal,
    pub scrap_quantity: Decimal,
    pub labour_cost: Decimal,
    pub produced_on: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const JOB_COLUMNS: &str = r#"
    id, company_id, name, description, cost_model, standard_minutes_per_unit,
    standard_batch_size, material_requirements, created_at, updated_at
"#;

const RUN_SELECT: &str = r#"
    SELECT p.id, p.manual_job_id, j.name AS manual_job_name, p.worker_name, p.quantity_produced,
           p.hours_worked, p.scrap_quantity, p.labour_cost, p.produced_on, p.notes, p.created_at
    FROM manual_job_productions p
    JOIN manual_jobs j ON j.id = p.manual_job_id
"#;

impl ManualJobService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ManualJob>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM manual_jobs
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let jobs = sqlx::query_as::<_, ManualJob>(&format!(
            r#"
            SELECT {}
            FROM manual_jobs
            WHERE company_id = $1 AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            JOB_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(jobs, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, job_id: Uuid) -> AppResult<ManualJob> {
        sqlx::query_as::<_, ManualJob>(&format!(
            "SELECT {} FROM manual_jobs WHERE id = $1 AND company_id = $2",
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Manual job".to_string()))
    }

    pub async fn create(&self, company_id: Uuid, input: ManualJobInput) -> AppResult<ManualJob> {
        input.validate()?;
        self.check_requirements(company_id, &input.material_requirements)
            .await?;

        let job = sqlx::query_as::<_, ManualJob>(&format!(
            r#"
            INSERT INTO manual_jobs (
                company_id, name, description, cost_model, standard_minutes_per_unit,
                standard_batch_size, material_requirements
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(Json(input.cost_model))
        .bind(input.standard_minutes_per_unit)
        .bind(input.standard_batch_size)
        .bind(Json(&input.material_requirements))
        .fetch_one(&self.db)
        .await?;

        tracing::info!(manual_job_id = %job.id, %company_id, "Manual job created");
        Ok(job)
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        job_id: Uuid,
        input: ManualJobInput,
    ) -> AppResult<ManualJob> {
        input.validate()?;
        self.check_requirements(company_id, &input.material_requirements)
            .await?;

        sqlx::query_as::<_, ManualJob>(&format!(
            r#"
            UPDATE manual_jobs
            SET name = $3, description = $4, cost_model = $5, standard_minutes_per_unit = $6,
                standard_batch_size = $7, material_requirements = $8, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            JOB_COLUMNS
        ))
        .bind(job_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.description)
        .bind(Json(input.cost_model))
        .bind(input.standard_minutes_per_unit)
        .bind(input.standard_batch_size)
        .bind(Json(&input.material_requirements))
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Manual job".to_string()))
    }

    async fn check_requirements(
        &self,
        company_id: Uuid,
        requirements: &[MaterialRequirement],
    ) -> AppResult<()> {
        for requirement in requirements {
            ensure_owned(
                &self.db,
                "raw_materials",
                "Raw material",
                company_id,
                requirement.raw_material_id,
            )
            .await?;
        }
        Ok(())
    }

    pub async fn list_productions(
        &self,
        company_id: Uuid,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ManualJobProduction>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM manual_job_productions WHERE company_id = $1",
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        let runs = sqlx::query_as::<_, ManualJobProduction>(&format!(
            r#"
            {}
            WHERE p.company_id = $1
            ORDER BY p.produced_on DESC, p.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            RUN_SELECT
        ))
        .bind(company_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(runs, pagination, total as u64))
    }

    pub async fn productions_for_job(
        &self,
        company_id: Uuid,
        job_id: Uuid,
    ) -> AppResult<Vec<ManualJobProduction>> {
        ensure_owned(&self.db, "manual_jobs", "Manual job", company_id, job_id).await?;

        let runs = sqlx::query_as::<_, ManualJobProduction>(&format!(
            r#"
            {}
            WHERE p.company_id = $1 AND p.manual_job_id = $2
            ORDER BY p.produced_on DESC, p.created_at DESC
            "#,
            RUN_SELECT
        ))
        .bind(company_id)
        .bind(job_id)
        .fetch_all(&self.db)
        .await?;

        Ok(runs)
    }

    /// Record a run: labour cost comes from the job's cost model and the
    /// job's raw-material requirements are drawn from stock
    pub async fn record_production(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: ManualJobProductionInput,
    ) -> AppResult<ManualJobProduction> {
        input.validate()?;
        let job = self.get(company_id, input.manual_job_id).await?;

        let labour_cost = job
            .cost_model
            .run_cost(input.quantity_produced, input.hours_worked)
            .round_dp(2);
        let produced_on = input.produced_on.unwrap_or_else(|| Utc::now().date_naive());

        let mut tx = self.db.begin().await?;

        for requirement in job.material_requirements.iter() {
            stock::consume(
                &mut tx,
                StockKind::RawMaterial,
                company_id,
                requirement.raw_material_id,
                requirement.quantity_per_unit * input.quantity_produced,
            )
            .await?;
        }

        let run_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO manual_job_productions (
                company_id, manual_job_id, worker_name, quantity_produced, hours_worked,
                scrap_quantity, labour_cost, produced_on, notes, created_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(job.id)
        .bind(&input.worker_name)
        .bind(input.quantity_produced)
        .bind(input.hours_worked)
        .bind(input.scrap_quantity)
        .bind(labour_cost)
        .bind(produced_on)
        .bind(&input.notes)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        let run = sqlx::query_as::<_, ManualJobProduction>(&format!("{} WHERE p.id = $1", RUN_SELECT))
            .bind(run_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            manual_job_id = %job.id,
            quantity = %input.quantity_produced,
            labour_cost = %labour_cost,
            "Manual job production recorded"
        );
        Ok(run)
    }
}
