//! HTTP handlers for manual jobs and their production runs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{ManualJobInput, ManualJobProductionInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::manual_job::{ManualJob, ManualJobProduction, ManualJobService};
use crate::AppState;

pub async fn list_manual_jobs(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<ManualJob>>> {
    let service = ManualJobService::new(state.db);
    let jobs = service
        .list(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(jobs))
}

pub async fn create_manual_job(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ManualJobInput>,
) -> AppResult<(StatusCode, Json<ManualJob>)> {
    let service = ManualJobService::new(state.db);
    let job = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_manual_job(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<ManualJob>> {
    let service = ManualJobService::new(state.db);
    let job = service.get(current_user.0.company_id, job_id).await?;
    Ok(Json(job))
}

pub async fn update_manual_job(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
    Json(input): Json<ManualJobInput>,
) -> AppResult<Json<ManualJob>> {
    let service = ManualJobService::new(state.db);
    let job = service
        .update(current_user.0.company_id, job_id, input)
        .await?;
    Ok(Json(job))
}

pub async fn list_manual_job_productions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<ManualJobProduction>>> {
    let service = ManualJobService::new(state.db);
    let runs = service
        .list_productions(current_user.0.company_id, &query.pagination())
        .await?;
    Ok(Json(runs))
}

pub async fn get_job_productions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(job_id): Path<Uuid>,
) -> AppResult<Json<Vec<ManualJobProduction>>> {
    let service = ManualJobService::new(state.db);
    let runs = service
        .productions_for_job(current_user.0.company_id, job_id)
        .await?;
    Ok(Json(runs))
}

/// Record a run; labour cost follows the job's cost model
pub async fn record_manual_job_production(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ManualJobProductionInput>,
) -> AppResult<(StatusCode, Json<ManualJobProduction>)> {
    let service = ManualJobService::new(state.db);
    let run = service
        .record_production(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(run)))
}
