//! Dashboard handler

use axum::{extract::State, Json};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::reporting::{DashboardMetrics, ReportingService};
use crate::AppState;

/// Orders, inventory alerts, today's production and month-to-date profit
pub async fn get_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<DashboardMetrics>> {
    let service = ReportingService::new(state.db);
    let metrics = service.dashboard(current_user.0.company_id).await?;
    Ok(Json(metrics))
}
