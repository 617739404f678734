//! Operations assistant handlers

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use shared::models::ChatMessageInput;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::chat::{ChatExchange, ChatMessage};
use crate::services::ChatService;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatHistoryQuery {
    pub limit: Option<i64>,
}

/// Ask the assistant; 503 when no assistant is configured
pub async fn send_chat_message(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<ChatMessageInput>,
) -> AppResult<Json<ChatExchange>> {
    let service = ChatService::new(state.db, state.config.assistant.clone());
    let exchange = service
        .send(current_user.0.company_id, current_user.0.user_id, input)
        .await?;
    Ok(Json(exchange))
}

pub async fn get_chat_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ChatHistoryQuery>,
) -> AppResult<Json<Vec<ChatMessage>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let service = ChatService::new(state.db, state.config.assistant.clone());
    let messages = service
        .history(current_user.0.company_id, current_user.0.user_id, limit)
        .await?;
    Ok(Json(messages))
}
