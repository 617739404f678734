//! Authentication handlers

use axum::{extract::State, http::StatusCode, Json};
use shared::models::{
    EmailInput, LoginInput, RefreshTokenInput, RegisterCompanyInput, ResetPasswordInput,
    VerifyEmailInput,
};

use crate::error::AppError;
use crate::services::auth::{AuthTokens, MessageResponse, RegisterResponse};
use crate::services::AuthService;
use crate::AppState;

/// Register a company and its owner; returns the pending verification state
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterCompanyInput>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let result = auth_service.register(body).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// Confirm an email address and sign the user in
pub async fn verify_email(
    State(state): State<AppState>,
    Json(body): Json<VerifyEmailInput>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.verify_email(body).await?;
    Ok(Json(tokens))
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(body): Json<EmailInput>,
) -> Result<Json<MessageResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.resend_verification(body).await?;
    Ok(Json(response))
}

/// Login endpoint handler
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginInput>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(body).await?;
    Ok(Json(tokens))
}

/// Refresh token endpoint handler
pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshTokenInput>,
) -> Result<Json<AuthTokens>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.refresh(body).await?;
    Ok(Json(tokens))
}

/// Always answers the same way so registered addresses cannot be discovered
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<EmailInput>,
) -> Result<Json<MessageResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.forgot_password(body).await?;
    Ok(Json(response))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordInput>,
) -> Result<Json<MessageResponse>, AppError> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let response = auth_service.reset_password(body).await?;
    Ok(Json(response))
}
