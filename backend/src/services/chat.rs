//! Operations assistant conversations

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use super::reporting::{DashboardMetrics, ReportingService};
use crate::config::AssistantConfig;
use crate::error::{AppError, AppResult};
use crate::external::assistant::{AssistantClient, ChatTurn};
use shared::models::{ChatMessageInput, ChatRole};

/// Earlier messages replayed to the assistant as context
const CONTEXT_MESSAGES: i64 = 10;

#[derive(Clone)]
pub struct ChatService {
    db: PgPool,
    config: AssistantConfig,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: ChatRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ChatExchange {
    pub message: ChatMessage,
    pub reply: ChatMessage,
}

pub fn system_prompt(metrics: &DashboardMetrics) -> AppResult<String> {
    let snapshot = serde_json::to_string_pretty(metrics)
        .map_err(|e| AppError::Internal(format!("Failed to encode dashboard: {}", e)))?;
    Ok(format!(
        "You are an operations assistant for a manufacturing company. \
         Answer questions about orders, inventory, production and finances \
         using the figures below. Quantities and money are exact decimals; \
         OEE factors are fractions between 0 and 1. If the figures do not \
         answer the question, say so.\n\nCurrent dashboard:\n{}",
        snapshot
    ))
}

impl ChatService {
    pub fn new(db: PgPool, config: AssistantConfig) -> Self {
        Self { db, config }
    }

    /// Most recent messages of the user's conversation, oldest first
    pub async fn history(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<ChatMessage>> {
        let mut messages = sqlx::query_as::<_, ChatMessage>(
            r#"
            SELECT id, role, content, created_at
            FROM chat_messages
            WHERE company_id = $1 AND user_id = $2
            ORDER BY created_at DESC, id DESC
            LIMIT $3
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .bind(limit.clamp(1, 200))
        .fetch_all(&self.db)
        .await?;

        messages.reverse();
        Ok(messages)
    }

    pub async fn send(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        input: ChatMessageInput,
    ) -> AppResult<ChatExchange> {
        input.validate()?;
        let client = AssistantClient::new(&self.config)?;

        let metrics = ReportingService::new(self.db.clone())
            .dashboard(company_id)
            .await?;
        let earlier = self.history(company_id, user_id, CONTEXT_MESSAGES).await?;

        let mut turns = Vec::with_capacity(earlier.len() + 2);
        turns.push(ChatTurn::system(system_prompt(&metrics)?));
        turns.extend(earlier.into_iter().map(|m| ChatTurn::new(m.role, m.content)));
        turns.push(ChatTurn::new(ChatRole::User, input.message.trim()));

        let reply = client.complete(&turns).await?;

        let mut tx = self.db.begin().await?;
        let mut stored = Vec::with_capacity(2);
        let pair = [
            (ChatRole::User, input.message.trim()),
            (ChatRole::Assistant, reply.as_str()),
        ];
        for (role, content) in pair {
            let message = sqlx::query_as::<_, ChatMessage>(
                r#"
                INSERT INTO chat_messages (company_id, user_id, role, content, created_at)
                VALUES ($1, $2, $3, $4, clock_timestamp())
                RETURNING id, role, content, created_at
                "#,
            )
            .bind(company_id)
            .bind(user_id)
            .bind(role)
            .bind(content)
            .fetch_one(&mut *tx)
            .await?;
            stored.push(message);
        }
        tx.commit().await?;

        tracing::info!(%company_id, %user_id, "Assistant replied");

        let reply = stored.pop();
        let message = stored.pop();
        match (message, reply) {
            (Some(message), Some(reply)) => Ok(ChatExchange { message, reply }),
            _ => Err(AppError::Internal("Chat exchange was not stored".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::reporting::{InventorySnapshot, OrderSnapshot, ProductionSnapshot};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use shared::metrics::{GrossProfit, OeeBreakdown};

    #[test]
    fn test_system_prompt_carries_dashboard() {
        let today = NaiveDate::from_ymd_opt(2026, 8, 14).unwrap();
        let metrics = DashboardMetrics {
            as_of: today,
            orders: OrderSnapshot {
                open_orders: 12,
                ..Default::default()
            },
            inventory: InventorySnapshot::default(),
            production: ProductionSnapshot {
                from: today,
                to: today,
                total_output: Decimal::from(4200),
                good_output: Decimal::from(4050),
                oee: OeeBreakdown::default(),
                top_scrap_reason: Some("Blowholes".to_string()),
                machines_due_for_maintenance: 1,
            },
            month_to_date: GrossProfit::default(),
        };

        let prompt = system_prompt(&metrics).unwrap();
        assert!(prompt.starts_with("You are an operations assistant"));
        assert!(prompt.contains("\"open_orders\": 12"));
        assert!(prompt.contains("Blowholes"));
    }
}
