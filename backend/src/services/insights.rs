//! Production insights: OEE, bottlenecks and scrap Pareto

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppResult;
use shared::metrics::{self, MachineLoad, OeeBreakdown, OeeInputs, ParetoEntry};
use shared::types::DateRange;

#[derive(Clone)]
pub struct InsightsService {
    db: PgPool,
}

/// Summed OEE inputs as read from `production_records`
#[derive(Debug, Clone, Copy, Default, sqlx::FromRow)]
pub struct OeeTotals {
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    pub ideal_output_seconds: Decimal,
    pub total_output: Decimal,
    pub good_output: Decimal,
}

impl OeeTotals {
    pub fn into_inputs(self) -> OeeInputs {
        OeeInputs {
            planned_minutes: self.planned_minutes,
            run_minutes: self.run_minutes,
            ideal_output_seconds: self.ideal_output_seconds,
            total_output: self.total_output,
            good_output: self.good_output,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct MachineOeeRow {
    machine_id: Uuid,
    machine_name: String,
    production_runs: i64,
    planned_minutes: Decimal,
    run_minutes: Decimal,
    ideal_output_seconds: Decimal,
    total_output: Decimal,
    good_output: Decimal,
}

/// One machine's OEE; flat so it exports as a CSV row
#[derive(Debug, Clone, Serialize)]
pub struct MachineOee {
    pub machine_id: Uuid,
    pub machine_name: String,
    pub production_runs: i64,
    pub planned_minutes: Decimal,
    pub run_minutes: Decimal,
    pub total_output: Decimal,
    pub good_output: Decimal,
    pub availability: Decimal,
    pub performance: Decimal,
    pub quality: Decimal,
    pub oee: Decimal,
}

impl From<MachineOeeRow> for MachineOee {
    fn from(row: MachineOeeRow) -> Self {
        let inputs = OeeTotals {
            planned_minutes: row.planned_minutes,
            run_minutes: row.run_minutes,
            ideal_output_seconds: row.ideal_output_seconds,
            total_output: row.total_output,
            good_output: row.good_output,
        }
        .into_inputs();
        let oee = metrics::oee(&inputs);
        Self {
            machine_id: row.machine_id,
            machine_name: row.machine_name,
            production_runs: row.production_runs,
            planned_minutes: row.planned_minutes,
            run_minutes: row.run_minutes,
            total_output: row.total_output,
            good_output: row.good_output,
            availability: oee.availability,
            performance: oee.performance,
            quality: oee.quality,
            oee: oee.oee,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OeeReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub overall: OeeBreakdown,
    pub totals: OeeInputs,
    pub machines: Vec<MachineOee>,
}

#[derive(Debug, Serialize)]
pub struct BottleneckReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub machines: Vec<MachineLoad>,
}

#[derive(Debug, Serialize)]
pub struct ScrapAnalysis {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_scrap: Decimal,
    pub reasons: Vec<ParetoEntry>,
}

/// Label for scrap recorded without a reason
pub const UNSPECIFIED_REASON: &str = "Unspecified";

impl InsightsService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Per-machine OEE over the window; the overall figure is computed from
    /// summed inputs, not averaged
    pub async fn oee(&self, company_id: Uuid, range: &DateRange) -> AppResult<OeeReport> {
        let rows = sqlx::query_as::<_, MachineOeeRow>(
            r#"
            SELECT m.id AS machine_id, m.name AS machine_name,
                   COUNT(r.id) AS production_runs,
                   COALESCE(SUM(r.planned_minutes), 0)::NUMERIC AS planned_minutes,
                   COALESCE(SUM(r.run_minutes), 0)::NUMERIC AS run_minutes,
                   COALESCE(SUM(r.ideal_cycle_time_seconds * r.total_output), 0) AS ideal_output_seconds,
                   COALESCE(SUM(r.total_output), 0) AS total_output,
                   COALESCE(SUM(r.good_output), 0) AS good_output
            FROM production_records r
            JOIN machines m ON m.id = r.machine_id
            WHERE r.company_id = $1 AND r.produced_on BETWEEN $2 AND $3
            GROUP BY m.id, m.name
            ORDER BY m.name ASC
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let totals: OeeInputs = rows
            .iter()
            .map(|row| OeeInputs {
                planned_minutes: row.planned_minutes,
                run_minutes: row.run_minutes,
                ideal_output_seconds: row.ideal_output_seconds,
                total_output: row.total_output,
                good_output: row.good_output,
            })
            .sum();

        Ok(OeeReport {
            from: range.start,
            to: range.end,
            overall: metrics::oee(&totals),
            totals,
            machines: rows.into_iter().map(MachineOee::from).collect(),
        })
    }

    /// Machines ranked by utilisation, then downtime
    pub async fn bottlenecks(
        &self,
        company_id: Uuid,
        range: &DateRange,
    ) -> AppResult<BottleneckReport> {
        let rows = sqlx::query_as::<_, (Uuid, String, Decimal, Decimal)>(
            r#"
            SELECT m.id, m.name,
                   COALESCE(SUM(r.planned_minutes), 0)::NUMERIC,
                   COALESCE(SUM(r.run_minutes), 0)::NUMERIC
            FROM production_records r
            JOIN machines m ON m.id = r.machine_id
            WHERE r.company_id = $1 AND r.produced_on BETWEEN $2 AND $3
            GROUP BY m.id, m.name
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let loads = rows
            .into_iter()
            .map(|(id, name, planned, run)| MachineLoad::new(id, name, planned, run))
            .collect();

        Ok(BottleneckReport {
            from: range.start,
            to: range.end,
            machines: metrics::rank_bottlenecks(loads),
        })
    }

    /// Scrap quantity per reason, largest first, with cumulative share
    pub async fn scrap_analysis(
        &self,
        company_id: Uuid,
        range: &DateRange,
    ) -> AppResult<ScrapAnalysis> {
        let rows = sqlx::query_as::<_, (Option<String>, Decimal)>(
            r#"
            SELECT sr.reason, COALESCE(SUM(r.scrap_quantity), 0)
            FROM production_records r
            LEFT JOIN scrap_reasons sr ON sr.id = r.scrap_reason_id
            WHERE r.company_id = $1 AND r.produced_on BETWEEN $2 AND $3
              AND r.scrap_quantity > 0
            GROUP BY sr.reason
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        let reasons = metrics::pareto(
            rows.into_iter()
                .map(|(reason, quantity)| {
                    (
                        reason.unwrap_or_else(|| UNSPECIFIED_REASON.to_string()),
                        quantity,
                    )
                })
                .collect(),
        );

        Ok(ScrapAnalysis {
            from: range.start,
            to: range.end,
            total_scrap: reasons.iter().map(|r| r.quantity).sum(),
            reasons,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_oee_from_row() {
        let row = MachineOeeRow {
            machine_id: Uuid::new_v4(),
            machine_name: "CNC-01".to_string(),
            production_runs: 2,
            planned_minutes: Decimal::from(960),
            run_minutes: Decimal::from(800),
            ideal_output_seconds: Decimal::from(42000),
            total_output: Decimal::from(1400),
            good_output: Decimal::from(1330),
        };
        let oee = MachineOee::from(row);
        assert_eq!(oee.performance, Decimal::new(875, 3));
        assert_eq!(oee.quality, Decimal::new(95, 2));
        assert!(oee.oee > Decimal::ZERO && oee.oee < Decimal::ONE);
    }

    #[test]
    fn test_idle_totals_yield_zero() {
        let oee = metrics::oee(&OeeTotals::default().into_inputs());
        assert_eq!(oee.oee, Decimal::ZERO);
    }
}
