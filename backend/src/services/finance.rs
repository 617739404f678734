//! Monthly costs and the profitability reports built on them

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::metrics::{self, BreakEven, GrossProfit, ProfitAndLoss};
use shared::models::{CostKind, FinanceCostInput};
use shared::types::{format_month, month_bounds, parse_month, DateRange, PaginatedResponse, Pagination};

#[derive(Clone)]
pub struct FinanceService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FinanceCost {
    pub id: Uuid,
    pub kind: CostKind,
    pub category: String,
    pub amount: Decimal,
    /// "YYYY-MM"
    pub month: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CategoryTotal {
    pub kind: CostKind,
    pub category: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize)]
pub struct CostSummary {
    pub month: String,
    pub fixed_total: Decimal,
    pub variable_total: Decimal,
    pub total: Decimal,
    pub categories: Vec<CategoryTotal>,
}

impl CostSummary {
    pub fn from_categories(month: NaiveDate, categories: Vec<CategoryTotal>) -> Self {
        let sum_of = |kind: CostKind| -> Decimal {
            categories
                .iter()
                .filter(|c| c.kind == kind)
                .map(|c| c.amount)
                .sum()
        };
        let fixed_total = sum_of(CostKind::Fixed);
        let variable_total = sum_of(CostKind::Variable);
        Self {
            month: format_month(month),
            fixed_total,
            variable_total,
            total: fixed_total + variable_total,
            categories,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GrossProfitReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub quantity_delivered: Decimal,
    #[serde(flatten)]
    pub profit: GrossProfit,
}

#[derive(Debug, Serialize)]
pub struct BreakEvenReport {
    pub month: String,
    pub product_id: Option<Uuid>,
    pub product_name: Option<String>,
    /// "product", "deliveries" or "catalogue"
    pub price_basis: &'static str,
    #[serde(flatten)]
    pub result: BreakEven,
}

#[derive(Debug, Serialize)]
pub struct ProfitAndLossReport {
    pub month: String,
    #[serde(flatten)]
    pub statement: ProfitAndLoss,
}

/// Average price and cost per delivered unit; None when nothing was delivered
pub fn unit_economics(
    revenue: Decimal,
    cost_of_goods_sold: Decimal,
    quantity: Decimal,
) -> Option<(Decimal, Decimal)> {
    if quantity <= Decimal::ZERO {
        return None;
    }
    Some((
        (revenue / quantity).round_dp(4),
        (cost_of_goods_sold / quantity).round_dp(4),
    ))
}

const COST_SELECT: &str = r#"
    SELECT id, kind, category, amount, TO_CHAR(month, 'YYYY-MM') AS month, description,
           created_at, updated_at
    FROM finance_costs
"#;

fn month_start(month: &str) -> AppResult<NaiveDate> {
    parse_month(month).ok_or_else(|| AppError::validation("month", "Month must be YYYY-MM"))
}

impl FinanceService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn list_costs(
        &self,
        company_id: Uuid,
        month: Option<NaiveDate>,
        pagination: &Pagination,
    ) -> AppResult<PaginatedResponse<FinanceCost>> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM finance_costs WHERE company_id = $1 AND ($2::DATE IS NULL OR month = $2)",
        )
        .bind(company_id)
        .bind(month)
        .fetch_one(&self.db)
        .await?;

        let costs = sqlx::query_as::<_, FinanceCost>(&format!(
            r#"
            {}
            WHERE company_id = $1 AND ($2::DATE IS NULL OR month = $2)
            ORDER BY month DESC, kind ASC, category ASC
            LIMIT $3 OFFSET $4
            "#,
            COST_SELECT
        ))
        .bind(company_id)
        .bind(month)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.db)
        .await?;

        Ok(PaginatedResponse::new(costs, pagination, total as u64))
    }

    pub async fn create_cost(
        &self,
        company_id: Uuid,
        input: FinanceCostInput,
    ) -> AppResult<FinanceCost> {
        input.validate()?;
        let month = month_start(&input.month)?;

        let cost_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO finance_costs (company_id, kind, category, amount, month, description)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.kind)
        .bind(input.category.trim())
        .bind(input.amount)
        .bind(month)
        .bind(&input.description)
        .fetch_one(&self.db)
        .await?;

        self.get_cost(company_id, cost_id).await
    }

    async fn get_cost(&self, company_id: Uuid, cost_id: Uuid) -> AppResult<FinanceCost> {
        sqlx::query_as::<_, FinanceCost>(&format!(
            "{} WHERE id = $1 AND company_id = $2",
            COST_SELECT
        ))
        .bind(cost_id)
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Finance cost".to_string()))
    }

    pub async fn update_cost(
        &self,
        company_id: Uuid,
        cost_id: Uuid,
        input: FinanceCostInput,
    ) -> AppResult<FinanceCost> {
        input.validate()?;
        let month = month_start(&input.month)?;

        let updated = sqlx::query(
            r#"
            UPDATE finance_costs
            SET kind = $3, category = $4, amount = $5, month = $6, description = $7,
                updated_at = NOW()
            WHERE id = $1 AND company_id = $2
            "#,
        )
        .bind(cost_id)
        .bind(company_id)
        .bind(input.kind)
        .bind(input.category.trim())
        .bind(input.amount)
        .bind(month)
        .bind(&input.description)
        .execute(&self.db)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound("Finance cost".to_string()));
        }
        self.get_cost(company_id, cost_id).await
    }

    pub async fn cost_summary(&self, company_id: Uuid, month: NaiveDate) -> AppResult<CostSummary> {
        let categories = sqlx::query_as::<_, CategoryTotal>(
            r#"
            SELECT kind, category, SUM(amount) AS amount
            FROM finance_costs
            WHERE company_id = $1 AND month = $2
            GROUP BY kind, category
            ORDER BY kind ASC, amount DESC
            "#,
        )
        .bind(company_id)
        .bind(month)
        .fetch_all(&self.db)
        .await?;

        Ok(CostSummary::from_categories(month, categories))
    }

    async fn month_costs(&self, company_id: Uuid, month: NaiveDate) -> AppResult<(Decimal, Decimal)> {
        let totals = sqlx::query_as::<_, (Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(amount) FILTER (WHERE kind = 'fixed'), 0),
                   COALESCE(SUM(amount) FILTER (WHERE kind = 'variable'), 0)
            FROM finance_costs
            WHERE company_id = $1 AND month = $2
            "#,
        )
        .bind(company_id)
        .bind(month)
        .fetch_one(&self.db)
        .await?;
        Ok(totals)
    }

    /// Revenue, cost of goods sold and quantity delivered in the window.
    /// Revenue is booked on delivery at the order price.
    async fn delivered_totals(
        &self,
        company_id: Uuid,
        range: &DateRange,
        product_id: Option<Uuid>,
    ) -> AppResult<(Decimal, Decimal, Decimal)> {
        let totals = sqlx::query_as::<_, (Decimal, Decimal, Decimal)>(
            r#"
            SELECT COALESCE(SUM(d.quantity_delivered * o.price_per_unit), 0),
                   COALESCE(SUM(d.quantity_delivered * p.unit_cost), 0),
                   COALESCE(SUM(d.quantity_delivered), 0)
            FROM order_deliveries d
            JOIN orders o ON o.id = d.order_id
            JOIN products p ON p.id = o.product_id
            WHERE d.company_id = $1 AND d.delivered_on BETWEEN $2 AND $3
              AND ($4::UUID IS NULL OR o.product_id = $4)
            "#,
        )
        .bind(company_id)
        .bind(range.start)
        .bind(range.end)
        .bind(product_id)
        .fetch_one(&self.db)
        .await?;
        Ok(totals)
    }

    pub async fn gross_profit(
        &self,
        company_id: Uuid,
        range: &DateRange,
    ) -> AppResult<GrossProfitReport> {
        let (revenue, cogs, quantity) = self.delivered_totals(company_id, range, None).await?;
        Ok(GrossProfitReport {
            from: range.start,
            to: range.end,
            quantity_delivered: quantity,
            profit: metrics::gross_profit(revenue.round_dp(2), cogs.round_dp(2)),
        })
    }

    /// Units to sell in the month to cover its fixed costs. With a product the
    /// product's own price and unit cost are used; otherwise the month's
    /// delivered averages, falling back to catalogue averages.
    pub async fn break_even(
        &self,
        company_id: Uuid,
        month: NaiveDate,
        product_id: Option<Uuid>,
    ) -> AppResult<BreakEvenReport> {
        let (fixed_costs, _) = self.month_costs(company_id, month).await?;

        let (product_name, price_basis, price, variable_cost) = match product_id {
            Some(product_id) => {
                let (name, price, cost) = sqlx::query_as::<_, (String, Decimal, Decimal)>(
                    "SELECT name, selling_price, unit_cost FROM products WHERE id = $1 AND company_id = $2",
                )
                .bind(product_id)
                .bind(company_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Product".to_string()))?;
                (Some(name), "product", price, cost)
            }
            None => {
                let range = month_range(month);
                let (revenue, cogs, quantity) =
                    self.delivered_totals(company_id, &range, None).await?;
                match unit_economics(revenue, cogs, quantity) {
                    Some((price, cost)) => (None, "deliveries", price, cost),
                    None => {
                        let (price, cost) = sqlx::query_as::<_, (Decimal, Decimal)>(
                            r#"
                            SELECT COALESCE(AVG(selling_price), 0), COALESCE(AVG(unit_cost), 0)
                            FROM products WHERE company_id = $1
                            "#,
                        )
                        .bind(company_id)
                        .fetch_one(&self.db)
                        .await?;
                        (None, "catalogue", price.round_dp(4), cost.round_dp(4))
                    }
                }
            }
        };

        Ok(BreakEvenReport {
            month: format_month(month),
            product_id,
            product_name,
            price_basis,
            result: metrics::break_even(fixed_costs, price, variable_cost),
        })
    }

    pub async fn profit_and_loss(
        &self,
        company_id: Uuid,
        month: NaiveDate,
    ) -> AppResult<ProfitAndLossReport> {
        let range = month_range(month);
        let (revenue, cogs, _) = self.delivered_totals(company_id, &range, None).await?;
        let (fixed, variable) = self.month_costs(company_id, month).await?;

        Ok(ProfitAndLossReport {
            month: format_month(month),
            statement: ProfitAndLoss::new(revenue.round_dp(2), cogs.round_dp(2), fixed, variable),
        })
    }
}

/// Inclusive range covering the calendar month starting at `month`
pub fn month_range(month: NaiveDate) -> DateRange {
    let (start, next) = month_bounds(month);
    DateRange {
        start,
        end: next - Duration::days(1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_range() {
        let feb = month_range(NaiveDate::from_ymd_opt(2028, 2, 1).unwrap());
        assert_eq!(feb.end, NaiveDate::from_ymd_opt(2028, 2, 29).unwrap());
        let dec = month_range(NaiveDate::from_ymd_opt(2026, 12, 1).unwrap());
        assert_eq!(dec.end, NaiveDate::from_ymd_opt(2026, 12, 31).unwrap());
        assert_eq!(dec.days(), 31);
    }

    #[test]
    fn test_unit_economics() {
        assert_eq!(
            unit_economics(Decimal::from(5000), Decimal::from(3500), Decimal::from(20)),
            Some((Decimal::from(250), Decimal::from(175)))
        );
        assert_eq!(unit_economics(Decimal::ZERO, Decimal::ZERO, Decimal::ZERO), None);
    }

    #[test]
    fn test_cost_summary_totals() {
        let month = NaiveDate::from_ymd_opt(2026, 5, 1).unwrap();
        let summary = CostSummary::from_categories(
            month,
            vec![
                CategoryTotal {
                    kind: CostKind::Fixed,
                    category: "Rent".to_string(),
                    amount: Decimal::from(40000),
                },
                CategoryTotal {
                    kind: CostKind::Fixed,
                    category: "Salaries".to_string(),
                    amount: Decimal::from(120000),
                },
                CategoryTotal {
                    kind: CostKind::Variable,
                    category: "Power".to_string(),
                    amount: Decimal::from(18500),
                },
            ],
        );
        assert_eq!(summary.month, "2026-05");
        assert_eq!(summary.fixed_total, Decimal::from(160000));
        assert_eq!(summary.variable_total, Decimal::from(18500));
        assert_eq!(summary.total, Decimal::from(178500));
    }

    #[test]
    fn test_month_start_rejects_garbage() {
        assert!(month_start("2026-13").is_err());
        assert_eq!(
            month_start("2026-07").unwrap(),
            NaiveDate::from_ymd_opt(2026, 7, 1).unwrap()
        );
    }
}
