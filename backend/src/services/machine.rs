//! Machine register, maintenance log and utilisation

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::ensure_owned;
use super::insights::OeeTotals;
use crate::error::{AppError, AppResult};
use shared::metrics::{self, OeeBreakdown};
use shared::models::{is_maintenance_due, MachineInput, MachineStatus, MaintenanceInput};
use shared::types::{DateRange, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct MachineService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Machine {
    pub id: Uuid,
    pub company_id: Uuid,
    pub name: String,
    pub code: String,
    pub machine_type: Option<String>,
    pub manufacturer: Option<String>,
    pub model_number: Option<String>,
    pub capacity_per_hour: Option<Decimal>,
    pub power_kw: Option<Decimal>,
    pub hourly_operating_cost: Decimal,
    pub status: MachineStatus,
    pub purchase_date: Option<NaiveDate>,
    pub maintenance_interval_days: Option<i32>,
    pub last_maintenance_on: Option<NaiveDate>,
    pub next_maintenance_due: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct MaintenanceEntry {
    pub id: Uuid,
    pub machine_id: Uuid,
    pub performed_on: NaiveDate,
    pub description: String,
    pub cost: Option<Decimal>,
    pub downtime_minutes: Option<i32>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Run time versus plan for one machine over a date window
#[derive(Debug, Serialize)]
pub struct MachineUtilization {
    pub machine_id: Uuid,
    pub machine_name: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub production_runs: i64,
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    pub downtime_minutes: Decimal,
    pub utilisation: Decimal,
    pub maintenance_downtime_minutes: i64,
    pub total_output: Decimal,
    pub good_output: Decimal,
    pub oee: OeeBreakdown,
}

const MACHINE_COLUMNS: &str = r#"
    id, company_id, name, code, machine_type, manufacturer, model_number, capacity_per_hour,
    power_kw, hourly_operating_cost, status, purchase_date, maintenance_interval_days,
    last_maintenance_on, last_maintenance_on + maintenance_interval_days AS next_maintenance_due,
    created_at, updated_at
"#;

impl MachineService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list(
        &self,
        company_id: Uuid,
        search: Option<&str>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<Machine>> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*) FROM machines
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR code ILIKE '%' || $2 || '%')
            "#,
        )
        .bind(company_id)
        .bind(search)
        .fetch_one(&self.db)
        .await?;

        let machines = sqlx::query_as::<_, Machine>(&format!(
            r#"
            SELECT {}
            FROM machines
            WHERE company_id = $1
              AND ($2::TEXT IS NULL OR name ILIKE '%' || $2 || '%' OR code ILIKE '%' || $2 || '%')
            ORDER BY name ASC
            LIMIT $3 OFFSET $4
            "#,
            MACHINE_COLUMNS
        ))
        .bind(company_id)
        .bind(search)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(machines, pagination, total as u64))
    }

    pub async fn get(&self, company_id: Uuid, machine_id: Uuid) -> AppResult<Machine> {
        sqlx::query_as::<_, Machine>(&format!(
            "SELECT {} FROM machines WHERE id = $1 AND company_id = $2",
            MACHINE_COLUMNS
        ))
        .bind(machine_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine".to_string()))
    }

    pub async fn create(&self, company_id: Uuid, input: MachineInput) -> AppResult<Machine> {
        input.validate()?;

        let machine = sqlx::query_as::<_, Machine>(&format!(
            r#"
            INSERT INTO machines (
                company_id, name, code, machine_type, manufacturer, model_number,
                capacity_per_hour, power_kw, hourly_operating_cost, status, purchase_date,
                maintenance_interval_days, last_maintenance_on
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            MACHINE_COLUMNS
        ))
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.code.trim().to_uppercase())
        .bind(&input.machine_type)
        .bind(&input.manufacturer)
        .bind(&input.model_number)
        .bind(input.capacity_per_hour)
        .bind(input.power_kw)
        .bind(input.hourly_operating_cost)
        .bind(input.status)
        .bind(input.purchase_date)
        .bind(input.maintenance_interval_days)
        .bind(input.last_maintenance_on)
        .fetch_one(&self.db)
        .await?;

        tracing::info!(machine_id = %machine.id, %company_id, "Machine created");
        Ok(machine)
    }

    pub async fn update(
        &self,
        company_id: Uuid,
        machine_id: Uuid,
        input: MachineInput,
    ) -> AppResult<Machine> {
        input.validate()?;

        sqlx::query_as::<_, Machine>(&format!(
            r#"
            UPDATE machines
            SET name = $3, code = $4, machine_type = $5, manufacturer = $6, model_number = $7,
                capacity_per_hour = $8, power_kw = $9, hourly_operating_cost = $10, status = $11,
                purchase_date = $12, maintenance_interval_days = $13, last_maintenance_on = $14,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            RETURNING {}
            "#,
            MACHINE_COLUMNS
        ))
        .bind(machine_id)
        .bind(company_id)
        .bind(input.name.trim())
        .bind(input.code.trim().to_uppercase())
        .bind(&input.machine_type)
        .bind(&input.manufacturer)
        .bind(&input.model_number)
        .bind(input.capacity_per_hour)
        .bind(input.power_kw)
        .bind(input.hourly_operating_cost)
        .bind(input.status)
        .bind(input.purchase_date)
        .bind(input.maintenance_interval_days)
        .bind(input.last_maintenance_on)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Machine".to_string()))
    }

    /// Active machines whose next service date is today or earlier
    pub async fn maintenance_due(&self, company_id: Uuid) -> AppResult<Vec<Machine>> {
        let today = Utc::now().date_naive();
        let machines = sqlx::query_as::<_, Machine>(&format!(
            r#"
            SELECT {}
            FROM machines
            WHERE company_id = $1 AND status <> 'retired' AND maintenance_interval_days IS NOT NULL
            ORDER BY next_maintenance_due ASC NULLS FIRST, name ASC
            "#,
            MACHINE_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(machines
            .into_iter()
            .filter(|m| {
                m.last_maintenance_on.is_none()
                    || is_maintenance_due(m.last_maintenance_on, m.maintenance_interval_days, today)
            })
            .collect())
    }

    /// Log a service and move the machine's last-maintenance date forward
    pub async fn log_maintenance(
        &self,
        company_id: Uuid,
        machine_id: Uuid,
        input: MaintenanceInput,
    ) -> AppResult<MaintenanceEntry> {
        input.validate()?;
        let performed_on = input
            .performed_on
            .ok_or_else(|| AppError::validation("performed_on", "Maintenance date is required"))?;

        let mut tx = self.db.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE machines
            SET last_maintenance_on = GREATEST(COALESCE(last_maintenance_on, $3), $3),
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(machine_id)
        .bind(company_id)
        .bind(performed_on)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Machine".to_string()));
        }

        let entry = sqlx::query_as::<_, MaintenanceEntry>(
            r#"
            INSERT INTO machine_maintenance (
                company_id, machine_id, performed_on, description, cost, downtime_minutes, performed_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, machine_id, performed_on, description, cost, downtime_minutes,
                      performed_by, created_at
            "#,
        )
        .bind(company_id)
        .bind(machine_id)
        .bind(performed_on)
        .bind(input.description.trim())
        .bind(input.cost)
        .bind(input.downtime_minutes)
        .bind(&input.performed_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%machine_id, %performed_on, "Maintenance logged");
        Ok(entry)
    }

    pub async fn maintenance_history(
        &self,
        company_id: Uuid,
        machine_id: Uuid,
    ) -> AppResult<Vec<MaintenanceEntry>> {
        ensure_owned(&self.db, "machines", "Machine", company_id, machine_id).await?;

        let entries = sqlx::query_as::<_, MaintenanceEntry>(
            r#"
            SELECT id, machine_id, performed_on, description, cost, downtime_minutes,
                   performed_by, created_at
            FROM machine_maintenance
            WHERE machine_id = $1 AND company_id = $2
            ORDER BY performed_on DESC, created_at DESC
            "#,
        )
        .bind(machine_id)
        .bind(company_id)
        .fetch_all(&self.db)
        .await?;

        Ok(entries)
    }

    pub async fn utilization(
        &self,
        company_id: Uuid,
        machine_id: Uuid,
        range: DateRange,
    ) -> AppResult<MachineUtilization> {
        let machine = self.get(company_id, machine_id).await?;

        let (runs, totals) = sqlx::query_as::<_, (i64, Decimal, Decimal, Decimal, Decimal, Decimal)>(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(planned_minutes), 0)::NUMERIC,
                   COALESCE(SUM(run_minutes), 0)::NUMERIC,
                   COALESCE(SUM(ideal_cycle_time_seconds * total_output), 0),
                   COALESCE(SUM(total_output), 0),
                   COALESCE(SUM(good_output), 0)
            FROM production_records
            WHERE company_id = $1 AND machine_id = $2 AND produced_on BETWEEN $3 AND $4
            "#,
        )
        .bind(company_id)
        .bind(machine_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await
        .map(|(runs, p, r, i, t, g)| {
            (
                runs,
                OeeTotals {
                    planned_minutes: p,
                    run_minutes: r,
                    ideal_output_seconds: i,
                    total_output: t,
                    good_output: g,
                },
            )
        })?;

        let maintenance_downtime = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COALESCE(SUM(downtime_minutes), 0)::BIGINT
            FROM machine_maintenance
            WHERE company_id = $1 AND machine_id = $2 AND performed_on BETWEEN $3 AND $4
            "#,
        )
        .bind(company_id)
        .bind(machine_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_one(&self.db)
        .await?;

        let inputs = totals.into_inputs();
        Ok(MachineUtilization {
            machine_id,
            machine_name: machine.name,
            from: range.start,
            to: range.end,
            production_runs: runs,
            planned_minutes: inputs.planned_minutes,
            run_minutes: inputs.run_minutes,
            downtime_minutes: (inputs.planned_minutes - inputs.run_minutes).max(Decimal::ZERO),
            utilisation: metrics::utilisation(inputs.run_minutes, inputs.planned_minutes),
            maintenance_downtime_minutes: maintenance_downtime,
            total_output: inputs.total_output,
            good_output: inputs.good_output,
            oee: metrics::oee(&inputs),
        })
    }
}
