//! Manual (labour) job models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// How a manual job is costed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManualJobCost {
    /// Flat amount per production run regardless of quantity
    Fixed { amount: Decimal },
    /// Rate per unit produced
    PerUnit { rate: Decimal },
    /// Rate per hour worked
    Hourly { rate: Decimal },
}

impl Default for ManualJobCost {
    fn default() -> Self {
        ManualJobCost::PerUnit {
            rate: Decimal::ZERO,
        }
    }
}

impl ManualJobCost {
    /// Labour cost of one run producing `quantity` units in `hours`
    pub fn run_cost(&self, quantity: Decimal, hours: Decimal) -> Decimal {
        match *self {
            ManualJobCost::Fixed { amount } => amount,
            ManualJobCost::PerUnit { rate } => rate * quantity,
            ManualJobCost::Hourly { rate } => rate * hours,
        }
    }

    /// Standard labour cost of a single unit, used for product costing.
    /// Hourly jobs need the standard minutes per unit; fixed jobs are
    /// spread over the standard batch size.
    pub fn unit_cost(
        &self,
        standard_minutes_per_unit: Option<Decimal>,
        standard_batch_size: Option<Decimal>,
    ) -> Decimal {
        match *self {
            ManualJobCost::PerUnit { rate } => rate,
            ManualJobCost::Hourly { rate } => standard_minutes_per_unit
                .map(|m| rate * m / Decimal::from(60))
                .unwrap_or(Decimal::ZERO),
            ManualJobCost::Fixed { amount } => match standard_batch_size {
                Some(batch) if batch > Decimal::ZERO => amount / batch,
                _ => amount,
            },
        }
    }

    fn rate(&self) -> Decimal {
        match *self {
            ManualJobCost::Fixed { amount } => amount,
            ManualJobCost::PerUnit { rate } | ManualJobCost::Hourly { rate } => rate,
        }
    }
}

fn validate_cost_model(cost: &ManualJobCost) -> Result<(), ValidationError> {
    crate::validation::non_negative(&cost.rate())
}

/// Raw material consumed per unit of a manual job
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Validate)]
#[serde(default)]
pub struct MaterialRequirement {
    #[validate(custom = "crate::validation::required_id")]
    pub raw_material_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity_per_unit: Decimal,
}

/// Input for creating or replacing a manual job
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ManualJobInput {
    #[validate(length(min = 1, max = 120, message = "Job name is required"))]
    pub name: String,
    #[validate(length(max = 500))]
    pub description: Option<String>,
    #[validate(custom = "validate_cost_model")]
    pub cost_model: ManualJobCost,
    #[validate(custom = "crate::validation::positive")]
    pub standard_minutes_per_unit: Option<Decimal>,
    #[validate(custom = "crate::validation::positive")]
    pub standard_batch_size: Option<Decimal>,
    #[validate]
    pub material_requirements: Vec<MaterialRequirement>,
}

/// A completed run of a manual job
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_job_run"))]
pub struct ManualJobProductionInput {
    #[validate(custom = "crate::validation::required_id")]
    pub manual_job_id: Uuid,
    #[validate(length(max = 100))]
    pub worker_name: Option<String>,
    #[validate(custom = "crate::validation::positive")]
    pub quantity_produced: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub hours_worked: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub scrap_quantity: Decimal,
    pub produced_on: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

fn validate_job_run(input: &ManualJobProductionInput) -> Result<(), ValidationError> {
    if input.scrap_quantity > input.quantity_produced {
        return Err(crate::validation::field_error(
            "scrap_quantity",
            "Scrap cannot exceed quantity produced",
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
    fn test_run_cost_by_model() {
        let qty = dec("40");
        let hours = dec("2.5");
        assert_eq!(ManualJobCost::Fixed { amount: dec("500") }.run_cost(qty, hours), dec("500"));
        assert_eq!(ManualJobCost::PerUnit { rate: dec("3.5") }.run_cost(qty, hours), dec("140.0"));
        assert_eq!(ManualJobCost::Hourly { rate: dec("180") }.run_cost(qty, hours), dec("450.0"));
    }

    #[test]
    fn test_unit_cost_by_model() {
        let hourly = ManualJobCost::Hourly { rate: dec("120") };
        assert_eq!(hourly.unit_cost(Some(dec("15")), None), dec("30"));
        assert_eq!(hourly.unit_cost(None, None), Decimal::ZERO);

        let fixed = ManualJobCost::Fixed { amount: dec("1000") };
        assert_eq!(fixed.unit_cost(None, Some(dec("250"))), dec("4"));
        assert_eq!(fixed.unit_cost(None, None), dec("1000"));
    }

    #[test]
    fn test_cost_model_serde_tagging() {
        let json = serde_json::to_value(ManualJobCost::Hourly { rate: dec("150") }).unwrap();
        assert_eq!(json["type"], "hourly");
        let parsed: ManualJobCost =
            serde_json::from_str(r#"{"type":"per_unit","rate":"2.75"}"#).unwrap();
        assert_eq!(parsed, ManualJobCost::PerUnit { rate: dec("2.75") });
    }

    #[test]
    fn test_negative_rate_rejected() {
        let input = ManualJobInput {
            name: "Deburring".to_string(),
            cost_model: ManualJobCost::PerUnit { rate: dec("-1") },
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "cost_model");
    }

    #[test]
    fn test_nested_requirement_errors_are_indexed() {
        let input = ManualJobInput {
            name: "Assembly".to_string(),
            material_requirements: vec![
                MaterialRequirement {
                    raw_material_id: Uuid::new_v4(),
                    quantity_per_unit: dec("1"),
                },
                MaterialRequirement {
                    raw_material_id: Uuid::new_v4(),
                    quantity_per_unit: Decimal::ZERO,
                },
            ],
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "material_requirements[1].quantity_per_unit");
    }

    #[test]
    fn test_scrap_cannot_exceed_output() {
        let input = ManualJobProductionInput {
            manual_job_id: Uuid::new_v4(),
            quantity_produced: dec("10"),
            scrap_quantity: dec("11"),
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "scrap_quantity");
    }
}
