//! Product, semi-finished product and bill-of-materials models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::types::UnitOfMeasure;

/// Raw material line of a bill of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct BomRawMaterial {
    #[validate(custom = "crate::validation::required_id")]
    pub raw_material_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity: Decimal,
}

/// Machine time line of a bill of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct BomMachine {
    #[validate(custom = "crate::validation::required_id")]
    pub machine_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub minutes_per_unit: Decimal,
}

/// Manual job line of a bill of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct BomManualJob {
    #[validate(custom = "crate::validation::required_id")]
    pub manual_job_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity: Decimal,
}

/// Semi-finished component line of a bill of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct BomSemiFinished {
    #[validate(custom = "crate::validation::required_id")]
    pub semi_finished_product_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity: Decimal,
}

/// Packaging line of a bill of materials; drawn from packaging stock
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct BomPackaging {
    #[validate(custom = "crate::validation::required_id")]
    pub packaging_raw_material_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity: Decimal,
}

/// Everything consumed to make one unit
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct BillOfMaterials {
    #[validate]
    pub raw_materials: Vec<BomRawMaterial>,
    #[validate]
    pub machines: Vec<BomMachine>,
    #[validate]
    pub manual_jobs: Vec<BomManualJob>,
    #[validate]
    pub semi_finished_products: Vec<BomSemiFinished>,
    #[validate]
    pub packaging: Vec<BomPackaging>,
}

impl BillOfMaterials {
    pub fn is_empty(&self) -> bool {
        self.raw_materials.is_empty()
            && self.machines.is_empty()
            && self.manual_jobs.is_empty()
            && self.semi_finished_products.is_empty()
            && self.packaging.is_empty()
    }

    /// Ids of the semi-finished components, used to reject self references
    pub fn semi_finished_ids(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.semi_finished_products
            .iter()
            .map(|s| s.semi_finished_product_id)
    }
}

/// Unit cost split by source
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CostBreakdown {
    pub raw_material_cost: Decimal,
    pub machine_cost: Decimal,
    pub labour_cost: Decimal,
    pub semi_finished_cost: Decimal,
    pub overhead_cost: Decimal,
    pub packaging_cost: Decimal,
    pub total_cost: Decimal,
}

impl CostBreakdown {
    pub fn new(
        raw_material_cost: Decimal,
        machine_cost: Decimal,
        labour_cost: Decimal,
        semi_finished_cost: Decimal,
        overhead_cost: Decimal,
        packaging_cost: Decimal,
    ) -> Self {
        let total_cost = raw_material_cost
            + machine_cost
            + labour_cost
            + semi_finished_cost
            + overhead_cost
            + packaging_cost;
        Self {
            raw_material_cost: raw_material_cost.round_dp(4),
            machine_cost: machine_cost.round_dp(4),
            labour_cost: labour_cost.round_dp(4),
            semi_finished_cost: semi_finished_cost.round_dp(4),
            overhead_cost: overhead_cost.round_dp(4),
            packaging_cost: packaging_cost.round_dp(4),
            total_cost: total_cost.round_dp(4),
        }
    }
}

/// Input for creating or replacing a finished product
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 150, message = "Product name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::sku")]
    pub sku: String,
    pub uom: UnitOfMeasure,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom = "crate::validation::non_negative")]
    pub selling_price: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub current_stock: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub min_stock_level: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub overhead_cost_per_unit: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub packaging_cost_per_unit: Decimal,
    #[validate]
    pub bom: BillOfMaterials,
}

/// Input for creating or replacing a semi-finished product
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SemiFinishedProductInput {
    #[validate(length(min = 1, max = 150, message = "Product name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::sku")]
    pub sku: String,
    pub uom: UnitOfMeasure,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[validate(custom = "crate::validation::non_negative")]
    pub current_stock: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub min_stock_level: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub overhead_cost_per_unit: Decimal,
    #[validate]
    pub bom: BillOfMaterials,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::field_errors;

    #[test]
    fn test_cost_breakdown_total() {
        let breakdown = CostBreakdown::new(
            Decimal::from(120),
            Decimal::new(255, 1),
            Decimal::from(30),
            Decimal::from(40),
            Decimal::from(5),
            Decimal::new(75, 1),
        );
        assert_eq!(breakdown.total_cost, Decimal::from(228));
    }

    #[test]
    fn test_bom_errors_carry_paths() {
        let input = ProductInput {
            name: "Gear housing".to_string(),
            sku: "FG-GH-100".to_string(),
            bom: BillOfMaterials {
                machines: vec![BomMachine {
                    machine_id: Uuid::nil(),
                    minutes_per_unit: Decimal::from(4),
                }],
                ..Default::default()
            },
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "bom.machines[0].machine_id");
        assert_eq!(errors[0].root_field(), "bom");
    }

    #[test]
    fn test_empty_bom() {
        assert!(BillOfMaterials::default().is_empty());
    }

    #[test]
    fn test_bom_without_packaging_key() {
        let bom: BillOfMaterials =
            serde_json::from_str(r#"{"raw_materials": [], "machines": []}"#).unwrap();
        assert!(bom.packaging.is_empty());

        let boxed = BillOfMaterials {
            packaging: vec![BomPackaging {
                packaging_raw_material_id: Uuid::new_v4(),
                quantity: Decimal::ONE,
            }],
            ..Default::default()
        };
        assert!(!boxed.is_empty());
    }
}
