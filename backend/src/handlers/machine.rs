//! HTTP handlers for machines and their maintenance log

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{MachineInput, MaintenanceInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::{ListQuery, RangeQuery};
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::machine::{Machine, MachineService, MachineUtilization, MaintenanceEntry};
use crate::AppState;

pub async fn list_machines(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<Machine>>> {
    let service = MachineService::new(state.db);
    let machines = service
        .list(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(machines))
}

pub async fn create_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<MachineInput>,
) -> AppResult<(StatusCode, Json<Machine>)> {
    let service = MachineService::new(state.db);
    let machine = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(machine)))
}

/// Machines whose maintenance interval has elapsed
pub async fn list_maintenance_due(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Machine>>> {
    let service = MachineService::new(state.db);
    let machines = service.maintenance_due(current_user.0.company_id).await?;
    Ok(Json(machines))
}

pub async fn get_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
) -> AppResult<Json<Machine>> {
    let service = MachineService::new(state.db);
    let machine = service.get(current_user.0.company_id, machine_id).await?;
    Ok(Json(machine))
}

pub async fn update_machine(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
    Json(input): Json<MachineInput>,
) -> AppResult<Json<Machine>> {
    let service = MachineService::new(state.db);
    let machine = service
        .update(current_user.0.company_id, machine_id, input)
        .await?;
    Ok(Json(machine))
}

pub async fn log_maintenance(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
    Json(input): Json<MaintenanceInput>,
) -> AppResult<(StatusCode, Json<MaintenanceEntry>)> {
    let service = MachineService::new(state.db);
    let entry = service
        .log_maintenance(current_user.0.company_id, machine_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

pub async fn get_maintenance_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
) -> AppResult<Json<Vec<MaintenanceEntry>>> {
    let service = MachineService::new(state.db);
    let history = service
        .maintenance_history(current_user.0.company_id, machine_id)
        .await?;
    Ok(Json(history))
}

/// Run time, downtime and OEE over `?from=&to=`
pub async fn get_machine_utilization(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(machine_id): Path<Uuid>,
    Query(query): Query<RangeQuery>,
) -> AppResult<Json<MachineUtilization>> {
    let range = query.range()?;
    let service = MachineService::new(state.db);
    let utilization = service
        .utilization(current_user.0.company_id, machine_id, range)
        .await?;
    Ok(Json(utilization))
}
