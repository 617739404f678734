//! HTTP handlers for cost entries and financial statements

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::models::FinanceCostInput;
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::{month_start, paginate, MonthQuery, RangeQuery};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::finance::{
    BreakEvenReport, CostSummary, FinanceCost, FinanceService, GrossProfitReport,
    ProfitAndLossReport,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CostListQuery {
    pub month: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

/// Cost entries, optionally limited to one `?month=YYYY-MM`
pub async fn list_finance_costs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<CostListQuery>,
) -> AppResult<Json<PaginatedResponse<FinanceCost>>> {
    let month = query.month.as_deref().map(month_start).transpose()?;
    let service = FinanceService::new(state.db);
    let costs = service
        .list_costs(
            current_user.0.company_id,
            month,
            &paginate(query.page, query.per_page),
        )
        .await?;
    Ok(Json(costs))
}

pub async fn create_finance_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<FinanceCostInput>,
) -> AppResult<(StatusCode, Json<FinanceCost>)> {
    let service = FinanceService::new(state.db);
    let cost = service.create_cost(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(cost)))
}

pub async fn update_finance_cost(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(cost_id): Path<Uuid>,
    Json(input): Json<FinanceCostInput>,
) -> AppResult<Json<FinanceCost>> {
    let service = FinanceService::new(state.db);
    let cost = service
        .update_cost(current_user.0.company_id, cost_id, input)
        .await?;
    Ok(Json(cost))
}

/// Fixed and variable totals by category for one month
pub async fn get_cost_summary(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<CostSummary>> {
    let month = query.month()?;
    let service = FinanceService::new(state.db);
    let summary = service
        .cost_summary(current_user.0.company_id, month)
        .await?;
    Ok(Json(summary))
}

pub async fn get_gross_profit(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<GrossProfitReport>> {
    let range = query.range()?;
    let service = FinanceService::new(state.db);
    let report = service
        .gross_profit(current_user.0.company_id, &range)
        .await?;
    Ok(Json(report))
}

/// Units needed to cover the month's fixed costs, company-wide or for `?product_id=`
pub async fn get_break_even(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<BreakEvenReport>> {
    let month = query.month()?;
    let service = FinanceService::new(state.db);
    let report = service
        .break_even(current_user.0.company_id, month, query.product_id)
        .await?;
    Ok(Json(report))
}

pub async fn get_profit_and_loss(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<MonthQuery>,
) -> AppResult<Json<ProfitAndLossReport>> {
    let month = query.month()?;
    let service = FinanceService::new(state.db);
    let statement = service
        .profit_and_loss(current_user.0.company_id, month)
        .await?;
    Ok(Json(statement))
}
