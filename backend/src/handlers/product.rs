//! HTTP handlers for finished and semi-finished products

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::{ProductInput, SemiFinishedProductInput, StockAdjustmentInput};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::product::{
    Product, ProductCostReport, ProductService, SemiFinishedProduct,
};
use crate::services::stock::StockAdjustment;
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<Product>>> {
    let service = ProductService::new(state.db);
    let products = service
        .list_products(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(products))
}

/// Create a product; its cost breakdown is computed from the bill of materials
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = ProductService::new(state.db);
    let product = service
        .create_product(current_user.0.company_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service
        .get_product(current_user.0.company_id, product_id)
        .await?;
    Ok(Json(product))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<ProductInput>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    let product = service
        .update_product(current_user.0.company_id, product_id, input)
        .await?;
    Ok(Json(product))
}

pub async fn adjust_product_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<StockAdjustmentInput>,
) -> AppResult<Json<StockAdjustment>> {
    let service = ProductService::new(state.db);
    let adjustment = service
        .adjust_product_stock(
            current_user.0.company_id,
            product_id,
            current_user.0.user_id,
            input,
        )
        .await?;
    Ok(Json(adjustment))
}

/// Current unit cost at today's prices against the selling price
pub async fn get_product_cost_breakdown(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ProductCostReport>> {
    let service = ProductService::new(state.db);
    let report = service
        .cost_report(current_user.0.company_id, product_id)
        .await?;
    Ok(Json(report))
}

pub async fn list_semi_finished(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<SemiFinishedProduct>>> {
    let service = ProductService::new(state.db);
    let items = service
        .list_semi_finished(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(items))
}

pub async fn create_semi_finished(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SemiFinishedProductInput>,
) -> AppResult<(StatusCode, Json<SemiFinishedProduct>)> {
    let service = ProductService::new(state.db);
    let item = service
        .create_semi_finished(current_user.0.company_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn get_semi_finished(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
) -> AppResult<Json<SemiFinishedProduct>> {
    let service = ProductService::new(state.db);
    let item = service
        .get_semi_finished(current_user.0.company_id, item_id)
        .await?;
    Ok(Json(item))
}

pub async fn update_semi_finished(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<SemiFinishedProductInput>,
) -> AppResult<Json<SemiFinishedProduct>> {
    let service = ProductService::new(state.db);
    let item = service
        .update_semi_finished(current_user.0.company_id, item_id, input)
        .await?;
    Ok(Json(item))
}

pub async fn adjust_semi_finished_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(item_id): Path<Uuid>,
    Json(input): Json<StockAdjustmentInput>,
) -> AppResult<Json<StockAdjustment>> {
    let service = ProductService::new(state.db);
    let adjustment = service
        .adjust_semi_finished_stock(
            current_user.0.company_id,
            item_id,
            current_user.0.user_id,
            input,
        )
        .await?;
    Ok(Json(adjustment))
}
