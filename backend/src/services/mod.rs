//! Business logic services for the Manufacturing Operations Platform

pub mod auth;
pub mod chat;
pub mod company;
pub mod customer;
pub mod customer_insights;
pub mod finance;
pub mod insights;
pub mod invoice;
pub mod machine;
pub mod manual_job;
pub mod order;
pub mod packaging;
pub mod plan;
pub mod product;
pub mod production;
pub mod raw_material;
pub mod reporting;
pub mod stock;
pub mod supplier;

#[cfg(test)]
mod db_tests;

pub use auth::AuthService;
pub use chat::ChatService;
pub use company::CompanyService;
pub use customer::CustomerService;
pub use customer_insights::CustomerInsightsService;
pub use finance::FinanceService;
pub use insights::InsightsService;
pub use invoice::InvoiceService;
pub use machine::MachineService;
pub use manual_job::ManualJobService;
pub use order::OrderService;
pub use packaging::PackagingService;
pub use plan::PlanService;
pub use product::ProductService;
pub use production::ProductionService;
pub use raw_material::RawMaterialService;
pub use reporting::ReportingService;
pub use supplier::SupplierService;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Fail with `NotFound(resource)` unless the row exists in the caller's company
pub(crate) async fn ensure_owned(
    db: &PgPool,
    table: &'static str,
    resource: &str,
    company_id: Uuid,
    id: Uuid,
) -> AppResult<()> {
    let exists = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1 AND company_id = $2)",
        table
    ))
    .bind(id)
    .bind(company_id)
    .fetch_one(db)
    .await?;

    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound(resource.to_string()))
    }
}
