//! Dashboard snapshot and CSV export

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::finance::FinanceService;
use super::insights::InsightsService;
use super::machine::MachineService;
use crate::error::{AppError, AppResult};
use shared::metrics::{GrossProfit, OeeBreakdown};
use shared::types::{month_bounds, DateRange};

/// Reporting service
#[derive(Clone)]
pub struct ReportingService {
    db: PgPool,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct OrderSnapshot {
    pub open_orders: i64,
    pub overdue_orders: i64,
    pub quantity_pending: Decimal,
    pub receivables: Decimal,
}

#[derive(Debug, Clone, Default, Serialize, sqlx::FromRow)]
pub struct InventorySnapshot {
    pub low_stock_raw_materials: i64,
    pub low_stock_packaging: i64,
    pub low_stock_products: i64,
    pub raw_material_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductionSnapshot {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub total_output: Decimal,
    pub good_output: Decimal,
    pub oee: OeeBreakdown,
    pub top_scrap_reason: Option<String>,
    pub machines_due_for_maintenance: usize,
}

/// Headline numbers for the dashboard; also fed to the assistant
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    pub as_of: NaiveDate,
    pub orders: OrderSnapshot,
    pub inventory: InventorySnapshot,
    pub production: ProductionSnapshot,
    pub month_to_date: GrossProfit,
}

impl ReportingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn dashboard(&self, company_id: Uuid) -> AppResult<DashboardMetrics> {
        let today = Utc::now().date_naive();

        let orders = sqlx::query_as::<_, OrderSnapshot>(
            r#"
            SELECT COUNT(*) FILTER (WHERE status = 'in_progress') AS open_orders,
                   COUNT(*) FILTER (
                       WHERE status = 'in_progress' AND expected_delivery_date < $2
                   ) AS overdue_orders,
                   COALESCE(SUM(remaining_quantity) FILTER (WHERE status = 'in_progress'), 0)
                       AS quantity_pending,
                   COALESCE(SUM(total_amount - amount_paid) FILTER (WHERE status <> 'cancelled'), 0)
                       AS receivables
            FROM orders
            WHERE company_id = $1
            "#,
        )
        .bind(company_id)
        .bind(today)
        .fetch_one(&self.db)
        .await?;

        let inventory = sqlx::query_as::<_, InventorySnapshot>(
            r#"
            SELECT
                (SELECT COUNT(*) FROM raw_materials
                  WHERE company_id = $1 AND current_stock <= reorder_level) AS low_stock_raw_materials,
                (SELECT COUNT(*) FROM packaging_raw_materials
                  WHERE company_id = $1 AND current_stock <= reorder_level) AS low_stock_packaging,
                (SELECT COUNT(*) FROM products
                  WHERE company_id = $1 AND current_stock < min_stock_level) AS low_stock_products,
                (SELECT COALESCE(SUM(current_stock * price_per_unit), 0) FROM raw_materials
                  WHERE company_id = $1) AS raw_material_value
            "#,
        )
        .bind(company_id)
        .fetch_one(&self.db)
        .await?;

        let window = DateRange::last_days(30, today);
        let insights = InsightsService::new(self.db.clone());
        let oee = insights.oee(company_id, &window).await?;
        let scrap = insights.scrap_analysis(company_id, &window).await?;
        let due = MachineService::new(self.db.clone())
            .maintenance_due(company_id)
            .await?;

        let (month_start, _) = month_bounds(today);
        let month_to_date = FinanceService::new(self.db.clone())
            .gross_profit(
                company_id,
                &DateRange {
                    start: month_start,
                    end: today,
                },
            )
            .await?
            .profit;

        Ok(DashboardMetrics {
            as_of: today,
            orders,
            inventory,
            production: ProductionSnapshot {
                from: window.start,
                to: window.end,
                total_output: oee.totals.total_output,
                good_output: oee.totals.good_output,
                oee: oee.overall,
                top_scrap_reason: scrap.reasons.first().map(|r| r.reason.clone()),
                machines_due_for_maintenance: due.len(),
            },
            month_to_date,
        })
    }

    /// Export report data as CSV
    pub fn export_to_csv<T: Serialize>(data: &[T]) -> AppResult<String> {
        let mut wtr = csv::Writer::from_writer(vec![]);
        for record in data {
            wtr.serialize(record)
                .map_err(|e| AppError::Internal(format!("CSV serialization error: {}", e)))?;
        }
        let csv_data = String::from_utf8(
            wtr.into_inner()
                .map_err(|e| AppError::Internal(format!("CSV writer error: {}", e)))?,
        )
        .map_err(|e| AppError::Internal(format!("UTF-8 conversion error: {}", e)))?;
        Ok(csv_data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::metrics::LedgerEntry;

    #[test]
    fn test_export_to_csv() {
        let rows = vec![LedgerEntry {
            date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            reference: "INV-9".to_string(),
            counterparty: "Acme, Pune".to_string(),
            debit: Decimal::new(118000, 2),
            credit: Decimal::ZERO,
            balance: Decimal::new(118000, 2),
        }];
        let csv = ReportingService::export_to_csv(&rows).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            lines.next(),
            Some("date,reference,counterparty,debit,credit,balance")
        );
        assert_eq!(
            lines.next(),
            Some("2026-04-02,INV-9,\"Acme, Pune\",1180.00,0,1180.00")
        );
    }

    #[test]
    fn test_export_empty() {
        let rows: Vec<LedgerEntry> = vec![];
        assert_eq!(ReportingService::export_to_csv(&rows).unwrap(), "");
    }
}
