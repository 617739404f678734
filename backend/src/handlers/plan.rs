//! HTTP handlers for production plans

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::models::{PlanStatus, ProductionPlanInput, UpdatePlanInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::paginate;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::plan::{PlanProgress, PlanService, ProductionPlan};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlanQuery {
    pub status: Option<PlanStatus>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_plans(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<PlanQuery>,
) -> AppResult<Json<PaginatedResponse<ProductionPlan>>> {
    let service = PlanService::new(state.db);
    let plans = service
        .list(
            current_user.0.company_id,
            query.status,
            &paginate(query.page, query.per_page),
        )
        .await?;
    Ok(Json(plans))
}

pub async fn create_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ProductionPlanInput>,
) -> AppResult<(StatusCode, Json<ProductionPlan>)> {
    let service = PlanService::new(state.db);
    let plan = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn get_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<ProductionPlan>> {
    let service = PlanService::new(state.db);
    let plan = service.get(current_user.0.company_id, plan_id).await?;
    Ok(Json(plan))
}

/// Update fields or move the plan through its status lifecycle
pub async fn update_plan(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(plan_id): Path<Uuid>,
    Json(input): Json<UpdatePlanInput>,
) -> AppResult<Json<ProductionPlan>> {
    let service = PlanService::new(state.db);
    let plan = service
        .update(current_user.0.company_id, plan_id, input)
        .await?;
    Ok(Json(plan))
}

pub async fn get_plan_progress(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(plan_id): Path<Uuid>,
) -> AppResult<Json<PlanProgress>> {
    let service = PlanService::new(state.db);
    let progress = service
        .progress(current_user.0.company_id, plan_id)
        .await?;
    Ok(Json(progress))
}
