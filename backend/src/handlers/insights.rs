//! Production insight handlers: OEE, bottlenecks and scrap Pareto

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};

use super::{csv_response, RangeQuery};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::insights::{BottleneckReport, InsightsService, ScrapAnalysis};
use crate::services::ReportingService;
use crate::AppState;

/// Company and per-machine OEE; `?format=csv` exports the machine rows
pub async fn get_oee(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<impl IntoResponse> {
    let range = query.range()?;
    let service = InsightsService::new(state.db);
    let report = service.oee(current_user.0.company_id, &range).await?;

    if query.wants_csv() {
        let csv = ReportingService::export_to_csv(&report.machines)?;
        return Ok(csv_response("oee.csv", csv));
    }

    Ok(Json(report).into_response())
}

pub async fn get_bottlenecks(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<BottleneckReport>> {
    let range = query.range()?;
    let service = InsightsService::new(state.db);
    let report = service
        .bottlenecks(current_user.0.company_id, &range)
        .await?;
    Ok(Json(report))
}

pub async fn get_scrap_analysis(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<ScrapAnalysis>> {
    let range = query.range()?;
    let service = InsightsService::new(state.db);
    let analysis = service
        .scrap_analysis(current_user.0.company_id, &range)
        .await?;
    Ok(Json(analysis))
}
