//! HTTP handlers for production records, finished-goods output and daily totals

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use shared::models::{ProductProductionInput, ProductionRecordInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::{csv_response, paginate, RangeQuery};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::production::{
    MachineOutput, ProductProduction, ProductProductionResult, ProductionRecord,
    ProductionRecordDetail, ProductionService,
};
use crate::services::ReportingService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductionRecordQuery {
    pub machine_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct ProductOutputQuery {
    pub product_id: Option<Uuid>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_production_records(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ProductionRecordQuery>,
) -> AppResult<Json<PaginatedResponse<ProductionRecord>>> {
    let service = ProductionService::new(state.db);
    let records = service
        .list_records(
            current_user.0.company_id,
            query.machine_id,
            &paginate(query.page, query.per_page),
        )
        .await?;
    Ok(Json(records))
}

pub async fn create_production_record(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ProductionRecordInput>,
) -> AppResult<(StatusCode, Json<ProductionRecordDetail>)> {
    let service = ProductionService::new(state.db);
    let record = service
        .create_record(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn get_production_record(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(record_id): Path<Uuid>,
) -> AppResult<Json<ProductionRecordDetail>> {
    let service = ProductionService::new(state.db);
    let record = service
        .get_record(current_user.0.company_id, record_id)
        .await?;
    Ok(Json(record))
}

pub async fn list_product_productions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ProductOutputQuery>,
) -> AppResult<Json<PaginatedResponse<ProductProduction>>> {
    let service = ProductionService::new(state.db);
    let outputs = service
        .list_outputs(
            current_user.0.company_id,
            query.product_id,
            &paginate(query.page, query.per_page),
        )
        .await?;
    Ok(Json(outputs))
}

/// Book finished goods; consumes the bill of materials from stock
pub async fn record_product_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ProductProductionInput>,
) -> AppResult<(StatusCode, Json<ProductProductionResult>)> {
    let service = ProductionService::new(state.db);
    let result = service
        .record_output(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Output per day; `?format=csv` downloads the table
pub async fn get_daily_output(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<impl IntoResponse> {
    let range = query.range()?;
    let service = ProductionService::new(state.db);
    let days = service
        .daily_output(current_user.0.company_id, &range)
        .await?;

    if query.wants_csv() {
        let csv = ReportingService::export_to_csv(&days)?;
        return Ok(csv_response("daily_output.csv", csv));
    }

    Ok(Json(days).into_response())
}

pub async fn get_machine_output(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<Vec<MachineOutput>>> {
    let range = query.range()?;
    let service = ProductionService::new(state.db);
    let machines = service
        .machine_output(current_user.0.company_id, &range)
        .await?;
    Ok(Json(machines))
}
