//! Production records, finished-goods output, plans and scrap reasons

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Work shift of a production run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Shift {
    #[default]
    General,
    Morning,
    Afternoon,
    Night,
}

/// A machine run: what was planned, what ran, what came out
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_run"))]
pub struct ProductionRecordInput {
    #[validate(custom = "crate::validation::required_id")]
    pub machine_id: Uuid,
    pub product_id: Option<Uuid>,
    pub semi_finished_product_id: Option<Uuid>,
    pub shift: Shift,
    pub produced_on: Option<NaiveDate>,
    #[validate(range(min = 1, max = 1440, message = "Planned time must be 1-1440 minutes"))]
    pub planned_minutes: i32,
    #[validate(range(min = 0, max = 1440, message = "Run time must be 0-1440 minutes"))]
    pub run_minutes: i32,
    #[validate(custom = "crate::validation::positive")]
    pub ideal_cycle_time_seconds: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub total_output: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub scrap_quantity: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub rework_quantity: Decimal,
    pub scrap_reason_id: Option<Uuid>,
    #[validate(length(max = 100))]
    pub operator_name: Option<String>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

impl ProductionRecordInput {
    pub fn good_output(&self) -> Decimal {
        crate::metrics::good_count(self.total_output, self.scrap_quantity, self.rework_quantity)
    }

    pub fn downtime_minutes(&self) -> i32 {
        (self.planned_minutes - self.run_minutes).max(0)
    }
}

fn validate_run(input: &ProductionRecordInput) -> Result<(), ValidationError> {
    match (input.product_id, input.semi_finished_product_id) {
        (None, None) => {
            return Err(crate::validation::field_error(
                "product_id",
                "A product or semi-finished product is required",
            ))
        }
        (Some(_), Some(_)) => {
            return Err(crate::validation::field_error(
                "semi_finished_product_id",
                "Choose either a product or a semi-finished product",
            ))
        }
        _ => {}
    }
    if input.run_minutes > input.planned_minutes {
        return Err(crate::validation::field_error(
            "run_minutes",
            "Run time cannot exceed planned time",
        ));
    }
    if input.scrap_quantity + input.rework_quantity > input.total_output {
        return Err(crate::validation::field_error(
            "scrap_quantity",
            "Scrap and rework cannot exceed total output",
        ));
    }
    if input.scrap_quantity > Decimal::ZERO && input.scrap_reason_id.is_none() {
        return Err(crate::validation::field_error(
            "scrap_reason_id",
            "A scrap reason is required when scrap is recorded",
        ));
    }
    Ok(())
}

/// Finished-goods output that consumes the product's bill of materials
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ProductProductionInput {
    #[validate(custom = "crate::validation::required_id")]
    pub product_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity_produced: Decimal,
    #[validate(length(max = 60))]
    pub batch_number: Option<String>,
    pub produced_on: Option<NaiveDate>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Status of a production plan
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PlanStatus {
    #[default]
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

impl PlanStatus {
    /// Plans move forward only; completed and cancelled plans are final
    pub fn can_transition_to(&self, next: PlanStatus) -> bool {
        use PlanStatus::*;
        matches!(
            (self, next),
            (Planned, InProgress)
                | (Planned, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        ) || *self == next
    }
}

/// Input for creating a production plan
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_plan_window"))]
pub struct ProductionPlanInput {
    #[validate(custom = "crate::validation::required_id")]
    pub product_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub planned_quantity: Decimal,
    #[validate(required(message = "Start date is required"))]
    pub start_date: Option<NaiveDate>,
    #[validate(required(message = "End date is required"))]
    pub end_date: Option<NaiveDate>,
    pub machine_ids: Vec<Uuid>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

fn validate_plan_window(input: &ProductionPlanInput) -> Result<(), ValidationError> {
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(crate::validation::field_error(
                "end_date",
                "End date cannot be before start date",
            ));
        }
    }
    Ok(())
}

/// Editable fields of a production plan
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdatePlanInput {
    #[validate(custom = "crate::validation::positive")]
    pub planned_quantity: Option<Decimal>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<PlanStatus>,
    pub machine_ids: Option<Vec<Uuid>>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

/// Input for adding a scrap reason to the company catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ScrapReasonInput {
    #[validate(length(min = 1, max = 120, message = "Reason is required"))]
    pub reason: String,
    #[validate(length(max = 60))]
    pub category: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::field_errors;

    fn run() -> ProductionRecordInput {
        ProductionRecordInput {
            machine_id: Uuid::new_v4(),
            product_id: Some(Uuid::new_v4()),
            planned_minutes: 480,
            run_minutes: 420,
            ideal_cycle_time_seconds: Decimal::from(30),
            total_output: Decimal::from(800),
            scrap_quantity: Decimal::from(20),
            rework_quantity: Decimal::from(10),
            scrap_reason_id: Some(Uuid::new_v4()),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_run() {
        let input = run();
        assert!(input.validate().is_ok());
        assert_eq!(input.good_output(), Decimal::from(770));
        assert_eq!(input.downtime_minutes(), 60);
    }

    #[test]
    fn test_run_longer_than_plan_rejected() {
        let input = ProductionRecordInput {
            run_minutes: 500,
            ..run()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "run_minutes");
    }

    #[test]
    fn test_scrap_requires_reason() {
        let input = ProductionRecordInput {
            scrap_reason_id: None,
            ..run()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "scrap_reason_id");
    }

    #[test]
    fn test_target_required() {
        let input = ProductionRecordInput {
            product_id: None,
            ..run()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "product_id");
    }

    #[test]
    fn test_plan_transitions() {
        assert!(PlanStatus::Planned.can_transition_to(PlanStatus::InProgress));
        assert!(PlanStatus::InProgress.can_transition_to(PlanStatus::Completed));
        assert!(!PlanStatus::Completed.can_transition_to(PlanStatus::InProgress));
        assert!(!PlanStatus::Cancelled.can_transition_to(PlanStatus::Planned));
        assert!(!PlanStatus::Planned.can_transition_to(PlanStatus::Completed));
    }

    #[test]
    fn test_plan_window() {
        let input = ProductionPlanInput {
            product_id: Uuid::new_v4(),
            planned_quantity: Decimal::from(100),
            start_date: NaiveDate::from_ymd_opt(2026, 5, 10),
            end_date: NaiveDate::from_ymd_opt(2026, 5, 1),
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "end_date");
    }
}
