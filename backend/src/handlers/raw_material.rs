//! HTTP handlers for raw materials and stock intake

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{RawMaterialInput, StockIntakeInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::raw_material::{
    RawMaterial, RawMaterialService, StockEntry, StockIntakeResult,
};
use crate::AppState;

pub async fn list_raw_materials(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<RawMaterial>>> {
    let service = RawMaterialService::new(state.db);
    let materials = service
        .list(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(materials))
}

/// Materials at or below their reorder level
pub async fn list_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<RawMaterial>>> {
    let service = RawMaterialService::new(state.db);
    let materials = service.low_stock(current_user.0.company_id).await?;
    Ok(Json(materials))
}

pub async fn create_raw_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RawMaterialInput>,
) -> AppResult<(StatusCode, Json<RawMaterial>)> {
    let service = RawMaterialService::new(state.db);
    let material = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(material)))
}

pub async fn get_raw_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<RawMaterial>> {
    let service = RawMaterialService::new(state.db);
    let material = service.get(current_user.0.company_id, material_id).await?;
    Ok(Json(material))
}

pub async fn update_raw_material(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
    Json(input): Json<RawMaterialInput>,
) -> AppResult<Json<RawMaterial>> {
    let service = RawMaterialService::new(state.db);
    let material = service
        .update(current_user.0.company_id, material_id, input)
        .await?;
    Ok(Json(material))
}

pub async fn list_stock_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<StockEntry>>> {
    let service = RawMaterialService::new(state.db);
    let entries = service
        .list_entries(current_user.0.company_id, &query.pagination())
        .await?;
    Ok(Json(entries))
}

/// Intake history of one material
pub async fn get_material_stock_entries(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(material_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockEntry>>> {
    let service = RawMaterialService::new(state.db);
    let entries = service
        .entries_for_material(current_user.0.company_id, material_id)
        .await?;
    Ok(Json(entries))
}

/// Record received stock; total cost is recomputed from quantity and price
pub async fn record_stock_intake(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StockIntakeInput>,
) -> AppResult<(StatusCode, Json<StockIntakeResult>)> {
    let service = RawMaterialService::new(state.db);
    let result = service
        .record_intake(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(result)))
}
