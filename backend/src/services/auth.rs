//! Authentication service for company registration, email verification,
//! login and token management

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::external::Mailer;
use crate::middleware::AuthUser;
use shared::models::{
    EmailInput, LoginInput, RefreshTokenInput, RegisterCompanyInput, ResetPasswordInput,
    UserRole, VerifyEmailInput,
};

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
    refresh_token_expiry: i64,
    verification_token_expiry: i64,
    reset_token_expiry: i64,
    mailer: Mailer,
}

/// Response after successful registration
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub company_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub message: String,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User ID
    pub company_id: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn into_auth_user(self) -> AppResult<AuthUser> {
        let user_id = Uuid::parse_str(&self.sub).map_err(|_| AppError::InvalidToken)?;
        let company_id = Uuid::parse_str(&self.company_id).map_err(|_| AppError::InvalidToken)?;
        let role = UserRole::parse(&self.role).ok_or(AppError::InvalidToken)?;
        Ok(AuthUser {
            user_id,
            company_id,
            role,
        })
    }
}

/// Authentication tokens
#[derive(Debug, Serialize)]
pub struct AuthTokens {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Generic acknowledgement for flows that must not reveal account state
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    company_id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    role: UserRole,
    is_active: bool,
    email_verified_at: Option<DateTime<Utc>>,
}

const USER_COLUMNS: &str =
    "id, company_id, name, email, password_hash, role, is_active, email_verified_at";

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
            refresh_token_expiry: config.jwt.refresh_token_expiry,
            verification_token_expiry: config.jwt.verification_token_expiry,
            reset_token_expiry: config.jwt.reset_token_expiry,
            mailer: Mailer::new(&config.mail),
        }
    }

    /// Register a new company with its owner account.
    ///
    /// The owner must verify their email before the first login.
    pub async fn register(&self, input: RegisterCompanyInput) -> AppResult<RegisterResponse> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(&self.db)
            .await?;
        if existing > 0 {
            return Err(AppError::DuplicateEntry("email".to_string()));
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let verification_token = new_opaque_token();
        let verification_expires_at =
            Utc::now() + Duration::seconds(self.verification_token_expiry);

        let mut tx = self.db.begin().await?;

        let company_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO companies (name, email, phone, gst_number)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(input.company_name.trim())
        .bind(&email)
        .bind(&input.phone)
        .bind(input.gst_number.as_deref().map(str::to_uppercase))
        .fetch_one(&mut *tx)
        .await?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO users (company_id, name, email, password_hash, role,
                               verification_token_hash, verification_expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(input.owner_name.trim())
        .bind(&email)
        .bind(&password_hash)
        .bind(UserRole::Owner)
        .bind(hash_token(&verification_token))
        .bind(verification_expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        self.mailer.send(&self.mailer.verification_email(
            &email,
            input.owner_name.trim(),
            &verification_token,
        ));

        tracing::info!(%company_id, %user_id, "Company registered");

        Ok(RegisterResponse {
            company_id,
            user_id,
            email,
            message: "Registration successful. Check your email to verify your account."
                .to_string(),
        })
    }

    /// Confirm an email address and sign the user in
    pub async fn verify_email(&self, input: VerifyEmailInput) -> AppResult<AuthTokens> {
        input.validate()?;

        let user = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            SELECT {}
            FROM users
            WHERE verification_token_hash = $1
              AND verification_expires_at > NOW()
            "#,
            USER_COLUMNS
        ))
        .bind(hash_token(input.token.trim()))
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        sqlx::query(
            r#"
            UPDATE users
            SET email_verified_at = NOW(),
                verification_token_hash = NULL,
                verification_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .execute(&self.db)
        .await?;

        tracing::info!(user_id = %user.id, "Email verified");

        self.issue_tokens(user.id, user.company_id, user.role).await
    }

    /// Send a fresh verification link. Always succeeds so callers cannot
    /// discover which addresses are registered.
    pub async fn resend_verification(&self, input: EmailInput) -> AppResult<MessageResponse> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let user = self.find_by_email(&email).await?;
        if let Some(user) = user.filter(|u| u.is_active && u.email_verified_at.is_none()) {
            let token = new_opaque_token();
            let expires_at = Utc::now() + Duration::seconds(self.verification_token_expiry);

            sqlx::query(
                r#"
                UPDATE users
                SET verification_token_hash = $2, verification_expires_at = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user.id)
            .bind(hash_token(&token))
            .bind(expires_at)
            .execute(&self.db)
            .await?;

            self.mailer
                .send(&self.mailer.verification_email(&user.email, &user.name, &token));
        }

        Ok(MessageResponse::new(
            "If the account exists and is not yet verified, a new link has been sent.",
        ))
    }

    /// Authenticate user with email and password
    pub async fn login(&self, input: LoginInput) -> AppResult<AuthTokens> {
        input.validate()?;
        let email = normalize_email(&input.email);

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !user.is_active {
            return Err(AppError::Unauthorized("Account is disabled".to_string()));
        }

        let valid = verify(&input.password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;
        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        if user.email_verified_at.is_none() {
            return Err(AppError::EmailNotVerified);
        }

        sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(&self.db)
            .await?;

        self.issue_tokens(user.id, user.company_id, user.role).await
    }

    /// Exchange a refresh token for a new token pair; the old one is revoked
    pub async fn refresh(&self, input: RefreshTokenInput) -> AppResult<AuthTokens> {
        input.validate()?;
        let token_hash = hash_token(input.refresh_token.trim());

        let (user_id, company_id, role) = sqlx::query_as::<_, (Uuid, Uuid, UserRole)>(
            r#"
            SELECT u.id, u.company_id, u.role
            FROM refresh_tokens rt
            JOIN users u ON u.id = rt.user_id
            WHERE rt.token_hash = $1
              AND rt.expires_at > NOW()
              AND rt.revoked_at IS NULL
              AND u.is_active = true
            "#,
        )
        .bind(&token_hash)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired refresh token".to_string()))?;

        sqlx::query("UPDATE refresh_tokens SET revoked_at = NOW() WHERE token_hash = $1")
            .bind(&token_hash)
            .execute(&self.db)
            .await?;

        self.issue_tokens(user_id, company_id, role).await
    }

    /// Start a password reset. Always succeeds.
    pub async fn forgot_password(&self, input: EmailInput) -> AppResult<MessageResponse> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if let Some(user) = self.find_by_email(&email).await?.filter(|u| u.is_active) {
            let token = new_opaque_token();
            let expires_at = Utc::now() + Duration::seconds(self.reset_token_expiry);

            sqlx::query(
                r#"
                UPDATE users
                SET reset_token_hash = $2, reset_expires_at = $3, updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user.id)
            .bind(hash_token(&token))
            .bind(expires_at)
            .execute(&self.db)
            .await?;

            self.mailer
                .send(&self.mailer.password_reset_email(&user.email, &user.name, &token));
            tracing::info!(user_id = %user.id, "Password reset requested");
        }

        Ok(MessageResponse::new(
            "If an account exists for this address, a reset link has been sent.",
        ))
    }

    /// Set a new password from a reset link and sign out every session
    pub async fn reset_password(&self, input: ResetPasswordInput) -> AppResult<MessageResponse> {
        input.validate()?;

        let user_id = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM users
            WHERE reset_token_hash = $1
              AND reset_expires_at > NOW()
              AND is_active = true
            "#,
        )
        .bind(hash_token(input.token.trim()))
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidToken)?;

        let password_hash = hash(&input.new_password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2,
                reset_token_hash = NULL,
                reset_expires_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(&password_hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE refresh_tokens SET revoked_at = NOW() WHERE user_id = $1 AND revoked_at IS NULL",
        )
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(%user_id, "Password reset completed");

        Ok(MessageResponse::new("Password updated. Please sign in again."))
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRow>> {
        let user = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    /// Generate access and refresh tokens and store the refresh token
    async fn issue_tokens(
        &self,
        user_id: Uuid,
        company_id: Uuid,
        role: UserRole,
    ) -> AppResult<AuthTokens> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            company_id: company_id.to_string(),
            role: role.as_str().to_string(),
            exp: (now + Duration::seconds(self.access_token_expiry)).timestamp(),
            iat: now.timestamp(),
        };
        let access_token = encode_access_token(&claims, &self.jwt_secret)?;

        let refresh_token = new_opaque_token();
        let expires_at = now + Duration::seconds(self.refresh_token_expiry);

        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(hash_token(&refresh_token))
        .bind(expires_at)
        .execute(&self.db)
        .await?;

        Ok(AuthTokens {
            access_token,
            refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }
}

pub fn encode_access_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and return its claims
pub fn decode_access_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// SHA-256 hex digest; only digests of one-time and refresh tokens are stored
pub fn hash_token(token: &str) -> String {
    hex_digest(Sha256::digest(token.as_bytes()).as_slice())
}

fn hex_digest(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

fn new_opaque_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-unit-tests";

    fn claims(exp_offset: i64) -> Claims {
        let now = Utc::now().timestamp();
        Claims {
            sub: Uuid::new_v4().to_string(),
            company_id: Uuid::new_v4().to_string(),
            role: "manager".to_string(),
            exp: now + exp_offset,
            iat: now,
        }
    }

    #[test]
    fn test_hash_token_is_sha256_hex() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(hash_token("abc").len(), 64);
        assert_ne!(hash_token("abc"), hash_token("abd"));
    }

    #[test]
    fn test_opaque_tokens_are_unique() {
        let a = new_opaque_token();
        let b = new_opaque_token();
        assert_eq!(a.len(), 64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_access_token_round_trip() {
        let original = claims(3600);
        let sub = original.sub.clone();
        let token = encode_access_token(&original, SECRET).unwrap();

        let user = decode_access_token(&token, SECRET)
            .unwrap()
            .into_auth_user()
            .unwrap();
        assert_eq!(user.user_id.to_string(), sub);
        assert_eq!(user.role, UserRole::Manager);
    }

    #[test]
    fn test_expired_token() {
        let token = encode_access_token(&claims(-3600), SECRET).unwrap();
        assert!(matches!(
            decode_access_token(&token, SECRET),
            Err(AppError::TokenExpired)
        ));
    }

    #[test]
    fn test_wrong_secret() {
        let token = encode_access_token(&claims(3600), SECRET).unwrap();
        assert!(matches!(
            decode_access_token(&token, "another-secret"),
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(
            decode_access_token("not-a-jwt", SECRET),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn test_claims_with_unknown_role_are_rejected() {
        let mut c = claims(3600);
        c.role = "superuser".to_string();
        assert!(matches!(c.into_auth_user(), Err(AppError::InvalidToken)));
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Owner@Acme.IN "), "owner@acme.in");
    }
}
