//! HTTP handlers for packaging raw materials

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{PackagingRawMaterialInput, StockAdjustmentInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::packaging::{PackagingRawMaterial, PackagingService};
use crate::services::stock::StockAdjustment;
use crate::AppState;

pub async fn list_packaging(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<PackagingRawMaterial>>> {
    let service = PackagingService::new(state.db);
    let items = service
        .list(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(items))
}

pub async fn create_packaging(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<PackagingRawMaterialInput>,
) -> AppResult<(StatusCode, Json<PackagingRawMaterial>)> {
    let service = PackagingService::new(state.db);
    let item = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_packaging(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<PackagingRawMaterial>> {
    let service = PackagingService::new(state.db);
    let item = service.get(current_user.0.company_id, item_id).await?;
    Ok(Json(item))
}

pub async fn update_packaging(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<PackagingRawMaterialInput>,
) -> AppResult<Json<PackagingRawMaterial>> {
    let service = PackagingService::new(state.db);
    let item = service
        .update(current_user.0.company_id, item_id, input)
        .await?;
    Ok(Json(item))
}

pub async fn adjust_packaging_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<StockAdjustmentInput>,
) -> AppResult<Json<StockAdjustment>> {
    let service = PackagingService::new(state.db);
    let adjustment = service
        .adjust_stock(
            current_user.0.company_id,
            item_id,
            current_user.0.user_id,
            input,
        )
        .await?;
    Ok(Json(adjustment))
}
