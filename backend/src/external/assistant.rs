//! Operations assistant client
//!
//! Talks to any OpenAI-compatible chat completions endpoint.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::models::ChatRole;

use crate::config::AssistantConfig;
use crate::error::{AppError, AppResult};

/// Assistant API client
#[derive(Clone)]
pub struct AssistantClient {
    http_client: Client,
    api_endpoint: String,
    api_key: String,
    model: String,
}

/// One message of the conversation sent upstream
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role: role.as_str().to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ChatTurn,
}

impl AssistantClient {
    /// Returns `AssistantUnavailable` when no API key is configured
    pub fn new(config: &AssistantConfig) -> AppResult<Self> {
        if !config.is_enabled() {
            return Err(AppError::AssistantUnavailable);
        }

        let http_client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_endpoint: config.api_endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    /// Send the conversation and return the assistant's reply text
    pub async fn complete(&self, messages: &[ChatTurn]) -> AppResult<String> {
        let request = CompletionRequest {
            model: &self.model,
            messages,
            temperature: 0.2,
        };

        let response = self
            .http_client
            .post(&self.api_endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Assistant request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::ExternalService(format!(
                "Assistant returned {}: {}",
                status, body
            )));
        }

        let result: CompletionResponse = response.json().await.map_err(|e| {
            AppError::ExternalService(format!("Failed to parse assistant response: {}", e))
        })?;

        extract_reply(result)
    }
}

fn extract_reply(response: CompletionResponse) -> AppResult<String> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.trim().to_string())
        .filter(|content| !content.is_empty())
        .ok_or_else(|| AppError::ExternalService("Assistant returned an empty reply".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_without_key() {
        let config = crate::config::test_config();
        assert!(matches!(
            AssistantClient::new(&config.assistant),
            Err(AppError::AssistantUnavailable)
        ));
    }

    #[test]
    fn test_extract_reply() {
        let response: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  OEE was 71%.  "}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(response).unwrap(), "OEE was 71%.");

        let empty: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            extract_reply(empty),
            Err(AppError::ExternalService(_))
        ));
    }

    #[test]
    fn test_turn_roles() {
        assert_eq!(ChatTurn::system("x").role, "system");
        assert_eq!(ChatTurn::new(ChatRole::Assistant, "y").role, "assistant");
    }
}
