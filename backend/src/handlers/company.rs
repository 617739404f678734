//! Company profile handlers

use axum::{extract::State, Json};
use shared::models::UpdateCompanyInput;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::company::Company;
use crate::services::CompanyService;
use crate::AppState;

pub async fn get_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Company>> {
    let service = CompanyService::new(state.db);
    let company = service.get(current_user.0.company_id).await?;
    Ok(Json(company))
}

/// Owners and managers only
pub async fn update_company(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<UpdateCompanyInput>,
) -> AppResult<Json<Company>> {
    current_user.0.require_manager()?;
    let service = CompanyService::new(state.db);
    let company = service.update(current_user.0.company_id, input).await?;
    Ok(Json(company))
}
