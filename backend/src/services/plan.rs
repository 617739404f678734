//! Production plans and progress against them

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use crate::error::{AppError, AppResult};
use shared::metrics;
use shared::models::{PlanStatus, ProductionPlanInput, UpdatePlanInput};
use shared::types::{PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct PlanService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ProductionPlan {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub planned_quantity: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub machine_ids: Vec<Uuid>,
    pub status: PlanStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlanProgress {
    pub plan_id: Uuid,
    pub product_id: Uuid,
    pub product_name: String,
    pub status: PlanStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub planned_quantity: Decimal,
    pub produced_quantity: Decimal,
    pub remaining_quantity: Decimal,
    pub progress_percent: Decimal,
    pub days_elapsed: i64,
    pub days_total: i64,
    pub on_track: bool,
}

impl PlanProgress {
    pub fn compute(plan: &ProductionPlan, produced: Decimal, today: NaiveDate) -> Self {
        let days_total = (plan.end_date - plan.start_date).num_days() + 1;
        let days_elapsed = if today < plan.start_date {
            0
        } else {
            ((today.min(plan.end_date) - plan.start_date).num_days() + 1).min(days_total)
        };
        let expected = plan.planned_quantity * Decimal::from(days_elapsed)
            / Decimal::from(days_total.max(1));

        Self {
            plan_id: plan.id,
            product_id: plan.product_id,
            product_name: plan.product_name.clone(),
            status: plan.status,
            start_date: plan.start_date,
            end_date: plan.end_date,
            planned_quantity: plan.planned_quantity,
            produced_quantity: produced,
            remaining_quantity: (plan.planned_quantity - produced).max(Decimal::ZERO),
            progress_percent: metrics::plan_progress_percent(produced, plan.planned_quantity),
            days_elapsed,
            days_total,
            on_track: produced >= expected,
        }
    }
}

const PLAN_SELECT: &str = r#"
    SELECT pl.id, pl.product_id, p.name AS product_name, pl.planned_quantity, pl.start_date,
           pl.end_date, pl.machine_ids, pl.status, pl.notes, pl.created_at, pl.updated_at
    FROM production_plans pl
    JOIN products p ON p.id = pl.product_id
"#;

impl PlanService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        status: Option<PlanStatus>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<ProductionPlan>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM production_plans
            WHERE company_id = $1 AND ($2::VARCHAR IS NULL OR status = $2)
            "#,
        )
        .bind(company_id)
        .bind(status)
        .fetch_one(&self.db)
        .await?;

        let plans = sqlx::query_as::<_, ProductionPlan>(&format!(
            r#"
            {}
            WHERE pl.company_id = $1 AND ($2::VARCHAR IS NULL OR pl.status = $2)
            ORDER BY pl.start_date DESC
            LIMIT $3 OFFSET $4
            "#,
            PLAN_SELECT
        ))
        .bind(company_id)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(plans, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, plan_id: Uuid) -> AppResult<ProductionPlan> {
        sqlx::query_as::<_, ProductionPlan>(&format!(
            "{} WHERE pl.id = $1 AND pl.company_id = $2",
            PLAN_SELECT
        ))
        .bind(plan_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Production plan".to_string()))
    }

    async fn check_machines(&self, company_id: Uuid, machine_ids: &[Uuid]) -> AppResult<()> {
        for machine_id in machine_ids {
            ensure_owned(&self.db, "machines", "Machine", company_id, *machine_id).await?;
        }
        Ok(())
    }

    pub async fn create(
        &self,
        company_id: Uuid,
        input: ProductionPlanInput,
    ) -> AppResult<ProductionPlan> {
        input.validate()?;
        ensure_owned(&self.db, "products", "Product", company_id, input.product_id).await?;
        self.check_machines(company_id, &input.machine_ids).await?;

        let plan_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO production_plans (
                company_id, product_id, planned_quantity, start_date, end_date, machine_ids, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.product_id)
        .bind(input.planned_quantity)
        .bind(input.start_date)
        .bind(input.end_date)
        .bind(&input.machine_ids)
        .bind(&input.notes)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(%plan_id, product_id = %input.product_id, "Production plan created");
        self.get(company_id, plan_id).await
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        plan_id: Uuid,
        input: UpdatePlanInput,
    ) -> AppResult<ProductionPlan> {
        input.validate()?;
        let plan = self.get(company_id, plan_id).await?;

        let status = input.status.unwrap_or(plan.status);
        if !plan.status.can_transition_to(status) {
            return Err(AppError::InvalidStateTransition(format!(
                "Cannot move a plan from {:?} to {:?}",
                plan.status, status
            )));
        }
        let end_date = input.end_date.unwrap_or(plan.end_date);
        if end_date < plan.start_date {
            return Err(AppError::validation(
                "end_date",
                "End date cannot be before start date",
            ));
        }
        let machine_ids = input.machine_ids.unwrap_or(plan.machine_ids);
        self.check_machines(company_id, &machine_ids).await?;

        sqlx::query(
            r#"
            UPDATE production_plans
            SET planned_quantity = $3, end_date = $4, status = $5, machine_ids = $6,
                notes = $7, updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(plan_id)
        .bind(company_id)
        .bind(input.planned_quantity.unwrap_or(plan.planned_quantity))
        .bind(end_date)
        .bind(status)
        .bind(&machine_ids)
        .bind(input.notes.or(plan.notes))
        .execute(&self.db)
        .await?;

        if status != plan.status {
            tracing::info!(%plan_id, from = ?plan.status, to = ?status, "Production plan status changed");
        }
        self.get(company_id, plan_id).await
    }

    /// Finished-goods output of the plan's product inside the plan window
    pub async fn progress(&self, company_id: Uuid, plan_id: Uuid) -> AppResult<PlanProgress> {
        let plan = self.get(company_id, plan_id).await?;

        let produced = sqlx::query_scalar::<_, Decimal>(
            r#"
            SELECT COALESCE(SUM(quantity_produced), 0)
            FROM product_productions
            WHERE company_id = $1 AND product_id = $2 AND produced_on BETWEEN $3 AND $4
            "#,
        )
        .bind(company_id)
        .bind(plan.product_id)
        .bind(plan.start_date)
        .bind(plan.end_date)
        .fetch_one(&self.db)
        .await?;

        Ok(PlanProgress::compute(&plan, produced, Utc::now().date_naive()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(planned: i64) -> ProductionPlan {
        ProductionPlan {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            product_name: "Gear housing".to_string(),
            planned_quantity: Decimal::from(planned),
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            machine_ids: vec![],
            status: PlanStatus::InProgress,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_progress_midway() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 5).unwrap();
        let progress = PlanProgress::compute(&plan(1000), Decimal::from(600), today);
        assert_eq!(progress.days_total, 10);
        assert_eq!(progress.days_elapsed, 5);
        assert_eq!(progress.progress_percent, Decimal::from(60));
        assert_eq!(progress.remaining_quantity, Decimal::from(400));
        assert!(progress.on_track);
    }

    #[test]
    fn test_progress_behind_and_overproduced() {
        let late = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let behind = PlanProgress::compute(&plan(1000), Decimal::from(900), late);
        assert_eq!(behind.days_elapsed, 10);
        assert!(!behind.on_track);

        let over = PlanProgress::compute(&plan(100), Decimal::from(120), late);
        assert_eq!(over.remaining_quantity, Decimal::ZERO);
        assert!(over.on_track);
    }

    #[test]
    fn test_progress_before_start() {
        let early = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let progress = PlanProgress::compute(&plan(100), Decimal::ZERO, early);
        assert_eq!(progress.days_elapsed, 0);
        assert!(progress.on_track);
    }
}
