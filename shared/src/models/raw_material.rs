//! Raw material, packaging material and stock intake models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::UnitOfMeasure;

/// Input for creating or replacing a raw material
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RawMaterialInput {
    #[validate(length(min = 1, max = 150, message = "Material name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::sku")]
    pub sku: String,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    pub uom: UnitOfMeasure,
    pub supplier_id: Option<Uuid>,
    #[validate(custom = "crate::validation::non_negative")]
    pub price_per_unit: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub current_stock: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub reorder_level: Decimal,
}

/// Stock intake for a raw material (goods received)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StockIntakeInput {
    #[validate(custom = "crate::validation::required_id")]
    pub raw_material_id: Uuid,
    pub supplier_id: Option<Uuid>,
    #[validate(custom = "crate::validation::positive")]
    pub quantity_received: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub price_per_unit: Decimal,
    #[validate(length(max = 60))]
    pub invoice_number: Option<String>,
    pub received_on: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

impl StockIntakeInput {
    /// Total cost of the intake: quantity received x price per unit
    pub fn total_cost(&self) -> Option<Decimal> {
        crate::metrics::total_cost(self.quantity_received, self.price_per_unit)
    }
}

/// Kinds of packaging material
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PackagingType {
    Box,
    Carton,
    Bag,
    Pouch,
    Bottle,
    Label,
    Wrap,
    #[default]
    Other,
}

/// Input for creating or replacing a packaging raw material
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PackagingRawMaterialInput {
    #[validate(length(min = 1, max = 150, message = "Material name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::sku")]
    pub sku: String,
    pub packaging_type: PackagingType,
    #[validate(length(max = 60))]
    pub material: Option<String>,
    /// Free-form dimensions, e.g. "300x200x150 mm"
    #[validate(length(max = 60))]
    pub dimensions: Option<String>,
    pub uom: UnitOfMeasure,
    pub supplier_id: Option<Uuid>,
    #[validate(custom = "crate::validation::non_negative")]
    pub price_per_unit: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub current_stock: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub reorder_level: Decimal,
}

/// Signed manual stock adjustment (products, semi-finished goods, packaging)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_adjustment"))]
pub struct StockAdjustmentInput {
    pub adjustment: Decimal,
    #[validate(length(max = 200))]
    pub reason: Option<String>,
}

fn validate_adjustment(input: &StockAdjustmentInput) -> Result<(), validator::ValidationError> {
    if input.adjustment.is_zero() {
        return Err(crate::validation::field_error(
            "adjustment",
            "Adjustment must not be zero",
        ));
    }
    if !crate::validation::within_amount_limit(&input.adjustment) {
        return Err(crate::validation::field_error(
            "adjustment",
            "Adjustment must be less than 10000000000",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::field_errors;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_intake_total_cost() {
        let intake = StockIntakeInput {
            raw_material_id: Uuid::new_v4(),
            quantity_received: dec("12.5"),
            price_per_unit: dec("84.20"),
            ..Default::default()
        };
        assert_eq!(intake.total_cost(), Some(dec("1052.50")));
    }

    #[test]
    fn test_intake_requires_material_and_quantity() {
        let errors = field_errors(&StockIntakeInput::default().validate().unwrap_err());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["quantity_received", "raw_material_id"]);
    }

    #[test]
    fn test_zero_adjustment_rejected() {
        let errors = field_errors(&StockAdjustmentInput::default().validate().unwrap_err());
        assert_eq!(errors[0].field, "adjustment");
    }

    #[test]
    fn test_oversized_adjustment_rejected() {
        let input = StockAdjustmentInput {
            adjustment: -Decimal::MAX,
            reason: None,
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "adjustment");
    }

    #[test]
    fn test_negative_adjustment_allowed() {
        let input = StockAdjustmentInput {
            adjustment: dec("-3"),
            reason: Some("damaged in transit".to_string()),
        };
        assert!(input.validate().is_ok());
    }
}
