//! Company profile service

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::UpdateCompanyInput;

#[derive(Clone)]
pub struct CompanyService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub gst_number: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub pincode: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompanyService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn get(&self, company_id: Uuid) -> AppResult<Company> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT id, name, email, phone, gst_number, address, city, state, pincode,
                   created_at, updated_at
            FROM companies
            WHERE id = $1
            "#,
        )
        .bind(company_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))
    }

    pub async fn update(&self, company_id: Uuid, input: UpdateCompanyInput) -> AppResult<Company> {
        input.validate()?;

        sqlx::query_as::<_, Company>(
            r#"
            UPDATE companies
            SET name = $2, phone = $3, gst_number = $4, address = $5,
                city = $6, state = $7, pincode = $8, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, email, phone, gst_number, address, city, state, pincode,
                      created_at, updated_at
            "#,
        )
        .bind(company_id)
        .bind(input.name.trim())
        .bind(&input.phone)
        .bind(input.gst_number.as_deref().map(str::to_uppercase))
        .bind(&input.address)
        .bind(&input.city)
        .bind(&input.state)
        .bind(&input.pincode)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Company".to_string()))
    }
}
