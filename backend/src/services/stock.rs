//! Stock movements shared by the inventory services

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::StockAdjustmentInput;

/// Stocked item kinds; each maps to its own table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockKind {
    RawMaterial,
    Packaging,
    SemiFinished,
    Product,
}

impl StockKind {
    pub fn table(&self) -> &'static str {
        match self {
            StockKind::RawMaterial => "raw_materials",
            StockKind::Packaging => "packaging_raw_materials",
            StockKind::SemiFinished => "semi_finished_products",
            StockKind::Product => "products",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockKind::RawMaterial => "raw_material",
            StockKind::Packaging => "packaging_raw_material",
            StockKind::SemiFinished => "semi_finished_product",
            StockKind::Product => "product",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            StockKind::RawMaterial => "Raw material",
            StockKind::Packaging => "Packaging raw material",
            StockKind::SemiFinished => "Semi-finished product",
            StockKind::Product => "Product",
        }
    }
}

/// Logged manual correction
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StockAdjustment {
    pub id: Uuid,
    pub item_kind: String,
    pub item_id: Uuid,
    pub adjustment: Decimal,
    pub stock_after: Decimal,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

/// Apply a signed adjustment to an item's stock and log it
pub async fn adjust_stock(
    db: &PgPool,
    kind: StockKind,
    company_id: Uuid,
    item_id: Uuid,
    user_id: Uuid,
    input: StockAdjustmentInput,
) -> AppResult<StockAdjustment> {
    input.validate()?;

    let mut tx = db.begin().await?;

    let current = lock_stock(&mut tx, kind, company_id, item_id).await?;
    let stock_after = add_stock(current, input.adjustment)?;
    if stock_after < Decimal::ZERO {
        return Err(AppError::InsufficientInventory(format!(
            "{} stock is {}; cannot remove {}",
            kind.label(),
            current.normalize(),
            (-input.adjustment).normalize()
        )));
    }

    set_stock(&mut tx, kind, item_id, stock_after).await?;

    let adjustment = sqlx::query_as::<_, StockAdjustment>(
        r#"
        INSERT INTO stock_adjustments (company_id, item_kind, item_id, adjustment, stock_after, reason, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, item_kind, item_id, adjustment, stock_after, reason, created_at
        "#,
    )
    .bind(company_id)
    .bind(kind.as_str())
    .bind(item_id)
    .bind(input.adjustment)
    .bind(stock_after)
    .bind(input.reason.as_deref().unwrap_or("Manual adjustment"))
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        item_kind = kind.as_str(),
        %item_id,
        adjustment = %input.adjustment,
        stock_after = %stock_after,
        "Stock adjusted"
    );

    Ok(adjustment)
}

/// `current + change`, rejected when the result no longer fits a stock column
pub fn add_stock(current: Decimal, change: Decimal) -> AppResult<Decimal> {
    current
        .checked_add(change)
        .filter(shared::validation::within_amount_limit)
        .ok_or_else(|| AppError::validation("quantity", "Stock level would exceed 10000000000"))
}

/// Lock the item row for the rest of the transaction and return its stock
pub async fn lock_stock(
    tx: &mut Transaction<'_, Postgres>,
    kind: StockKind,
    company_id: Uuid,
    item_id: Uuid,
) -> AppResult<Decimal> {
    sqlx::query_scalar::<_, Decimal>(&format!(
        "SELECT current_stock FROM {} WHERE id = $1 AND company_id = $2 FOR UPDATE",
        kind.table()
    ))
    .bind(item_id)
    .bind(company_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or_else(|| AppError::NotFound(kind.label().to_string()))
}

async fn set_stock(
    tx: &mut Transaction<'_, Postgres>,
    kind: StockKind,
    item_id: Uuid,
    stock: Decimal,
) -> AppResult<()> {
    sqlx::query(&format!(
        "UPDATE {} SET current_stock = $2, updated_at = NOW() WHERE id = $1",
        kind.table()
    ))
    .bind(item_id)
    .bind(stock)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Add `quantity` to an item's stock inside a transaction
pub async fn receive(
    tx: &mut Transaction<'_, Postgres>,
    kind: StockKind,
    company_id: Uuid,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<Decimal> {
    let current = lock_stock(tx, kind, company_id, item_id).await?;
    let stock_after = add_stock(current, quantity)?;
    set_stock(tx, kind, item_id, stock_after).await?;
    Ok(stock_after)
}

/// Remove `quantity` from an item's stock inside a transaction.
/// Fails with `InsufficientInventory` rather than going negative.
pub async fn consume(
    tx: &mut Transaction<'_, Postgres>,
    kind: StockKind,
    company_id: Uuid,
    item_id: Uuid,
    quantity: Decimal,
) -> AppResult<Decimal> {
    let current = lock_stock(tx, kind, company_id, item_id).await?;
    if current < quantity {
        return Err(AppError::InsufficientInventory(format!(
            "{} {} has {} in stock but {} is required",
            kind.label(),
            item_id,
            current.normalize(),
            quantity.normalize()
        )));
    }
    let stock_after = current - quantity;
    set_stock(tx, kind, item_id, stock_after).await?;
    Ok(stock_after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tables() {
        assert_eq!(StockKind::Packaging.table(), "packaging_raw_materials");
        assert_eq!(StockKind::SemiFinished.as_str(), "semi_finished_product");
        assert_eq!(StockKind::Product.label(), "Product");
    }

    #[test]
    fn test_add_stock_bounds() {
        assert_eq!(
            add_stock(Decimal::from(40), Decimal::new(-125, 1)).unwrap(),
            Decimal::new(275, 1)
        );
        assert!(matches!(
            add_stock(Decimal::MAX, Decimal::ONE),
            Err(AppError::Validation { .. })
        ));
        assert!(matches!(
            add_stock(Decimal::from(9_999_999_999i64), Decimal::ONE),
            Err(AppError::Validation { .. })
        ));
    }
}
