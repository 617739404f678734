//! HTTP handlers for orders and their fulfilment

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use shared::models::{
    BulkDeliveryInput, CreateOrderInput, OrderStatus, SingleDeliveryInput, UpdateOrderInput,
};
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::paginate;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::order::{BulkDeliveryResult, Order, OrderDetail, OrderFilter, OrderService};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub customer_id: Option<Uuid>,
    pub search: Option<String>,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

pub async fn list_orders(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<Json<PaginatedResponse<Order>>> {
    let filter = OrderFilter {
        status: query.status,
        customer_id: query.customer_id,
        search: query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty()),
    };
    let service = OrderService::new(state.db);
    let orders = service
        .list(
            current_user.0.company_id,
            filter,
            &paginate(query.page, query.per_page),
        )
        .await?;
    Ok(Json(orders))
}

pub async fn create_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<(StatusCode, Json<OrderDetail>)> {
    let service = OrderService::new(state.db);
    let order = service
        .create(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn get_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.get(current_user.0.company_id, order_id).await?;
    Ok(Json(order))
}

pub async fn update_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<UpdateOrderInput>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service
        .update(current_user.0.company_id, order_id, input)
        .await?;
    Ok(Json(order))
}

/// Deliver against one order, optionally with a payment
pub async fn deliver_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
    Json(input): Json<SingleDeliveryInput>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service
        .deliver(
            current_user.0.company_id,
            current_user.0.user_id,
            order_id,
            input,
        )
        .await?;
    Ok(Json(order))
}

/// Apply every delivery in the batch or none of them
pub async fn bulk_delivery(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BulkDeliveryInput>,
) -> AppResult<Json<BulkDeliveryResult>> {
    let service = OrderService::new(state.db);
    let result = service
        .bulk_delivery(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(result))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = OrderService::new(state.db);
    let order = service.cancel(current_user.0.company_id, order_id).await?;
    Ok(Json(order))
}
