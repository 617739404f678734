//! Configuration management for the Manufacturing Operations Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with MOPS_ prefix (MOPS__DATABASE__URL)

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    pub server: ServerConfig,

    pub database: DatabaseConfig,

    /// JWT and one-time token lifetimes
    pub jwt: JwtConfig,

    /// Outgoing mail (verification and password reset links)
    pub mail: MailConfig,

    /// Operations assistant behind the chat endpoints
    pub assistant: AssistantConfig,

    pub log: LogConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key for signing JWT tokens
    pub secret: String,

    /// Access token expiration in seconds
    pub access_token_expiry: i64,

    /// Refresh token expiration in seconds
    pub refresh_token_expiry: i64,

    /// Email verification link lifetime in seconds
    pub verification_token_expiry: i64,

    /// Password reset link lifetime in seconds
    pub reset_token_expiry: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
    /// Sender address on outgoing mail
    pub from_address: String,

    /// Base URL of the web app, used to build links in emails
    pub frontend_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AssistantConfig {
    /// OpenAI-compatible chat completions endpoint
    pub api_endpoint: String,

    /// Empty disables the chat endpoints
    #[serde(default)]
    pub api_key: String,

    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    /// "text" or "json"
    pub format: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("MOPS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("jwt.access_token_expiry", 3600)?
            .set_default("jwt.refresh_token_expiry", 604800)?
            .set_default("jwt.verification_token_expiry", 86400)?
            .set_default("jwt.reset_token_expiry", 3600)?
            .set_default("mail.from_address", "no-reply@localhost")?
            .set_default("mail.frontend_url", "http://localhost:5173")?
            .set_default(
                "assistant.api_endpoint",
                "https://api.openai.com/v1/chat/completions",
            )?
            .set_default("assistant.api_key", "")?
            .set_default("assistant.model", "gpt-4o-mini")?
            .set_default("assistant.timeout_secs", 30)?
            .set_default("log.format", "text")?
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(
                Environment::with_prefix("MOPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }
}

impl AssistantConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 3000,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: "postgres://localhost/mops_test".to_string(),
            max_connections: 2,
            min_connections: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret-key-for-unit-tests".to_string(),
            access_token_expiry: 3600,
            refresh_token_expiry: 604800,
            verification_token_expiry: 86400,
            reset_token_expiry: 3600,
        },
        mail: MailConfig {
            from_address: "no-reply@example.com".to_string(),
            frontend_url: "https://app.example.com".to_string(),
        },
        assistant: AssistantConfig {
            api_endpoint: "http://localhost:9/v1/chat/completions".to_string(),
            api_key: String::new(),
            model: "test-model".to_string(),
            timeout_secs: 5,
        },
        log: LogConfig {
            format: "text".to_string(),
        },
    }
}
