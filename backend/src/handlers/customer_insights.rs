//! Customer analytics handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use super::date_range;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::customer_insights::{
    CustomerInsight, CustomerInsightsService, OutstandingBalance, TopCustomers,
};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TopCustomersQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
}

/// Customers ranked by delivered revenue in the window
pub async fn top_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<TopCustomersQuery>,
) -> AppResult<Json<TopCustomers>> {
    let range = date_range(query.from, query.to)?;
    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let service = CustomerInsightsService::new(state.db);
    let top = service
        .top_customers(current_user.0.company_id, &range, limit)
        .await?;
    Ok(Json(top))
}

/// Customers with unpaid order balances, largest first
pub async fn outstanding_balances(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<OutstandingBalance>>> {
    let service = CustomerInsightsService::new(state.db);
    let balances = service.outstanding(current_user.0.company_id).await?;
    Ok(Json(balances))
}

pub async fn get_customer_insight(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<CustomerInsight>> {
    let service = CustomerInsightsService::new(state.db);
    let insight = service
        .customer(current_user.0.company_id, customer_id)
        .await?;
    Ok(Json(insight))
}
