//! Scrap reason catalogue
//!
//! Small enough that the handlers query the table directly.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::models::ScrapReasonInput;
use uuid::Uuid;
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::AppState;

#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ScrapReason {
    pub id: Uuid,
    pub reason: String,
    pub category: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub async fn list_scrap_reasons(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<ScrapReason>>> {
    let reasons = sqlx::query_as::<_, ScrapReason>(
        r#"
        SELECT id, reason, category, created_at
        FROM scrap_reasons
        WHERE company_id = $1
        ORDER BY reason
        "#,
    )
    .bind(current_user.0.company_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(reasons))
}

/// Duplicate reasons within a company are rejected with 409
pub async fn create_scrap_reason(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ScrapReasonInput>,
) -> AppResult<(StatusCode, Json<ScrapReason>)> {
    input.validate()?;

    let category = input
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let reason = sqlx::query_as::<_, ScrapReason>(
        r#"
        INSERT INTO scrap_reasons (company_id, reason, category)
        VALUES ($1, $2, $3)
        RETURNING id, reason, category, created_at
        "#,
    )
    .bind(current_user.0.company_id)
    .bind(input.reason.trim())
    .bind(category)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(
        company_id = %current_user.0.company_id,
        scrap_reason_id = %reason.id,
        "Scrap reason added"
    );

    Ok((StatusCode::CREATED, Json(reason)))
}
