//! HTTP handlers for business customers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use shared::models::BusinessCustomerInput;
use shared::types::PaginatedResponse;
use uuid::Uuid;

use super::ListQuery;
use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::customer::{BusinessCustomer, CustomerService, OrderedProduct};
use crate::AppState;

pub async fn list_customers(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<PaginatedResponse<BusinessCustomer>>> {
    let service = CustomerService::new(state.db);
    let customers = service
        .list(current_user.0.company_id, query.search(), &query.pagination())
        .await?;
    Ok(Json(customers))
}

pub async fn create_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<BusinessCustomerInput>,
) -> AppResult<(StatusCode, Json<BusinessCustomer>)> {
    let service = CustomerService::new(state.db);
    let customer = service.create(current_user.0.company_id, input).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<BusinessCustomer>> {
    let service = CustomerService::new(state.db);
    let customer = service.get(current_user.0.company_id, customer_id).await?;
    Ok(Json(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
    Json(input): Json<BusinessCustomerInput>,
) -> AppResult<Json<BusinessCustomer>> {
    let service = CustomerService::new(state.db);
    let customer = service
        .update(current_user.0.company_id, customer_id, input)
        .await?;
    Ok(Json(customer))
}

/// Products this customer has ordered, with quantities and last order date
pub async fn get_ordered_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(customer_id): Path<Uuid>,
) -> AppResult<Json<Vec<OrderedProduct>>> {
    let service = CustomerService::new(state.db);
    let products = service
        .ordered_products(current_user.0.company_id, customer_id)
        .await?;
    Ok(Json(products))
}
