//! Machine and maintenance models

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Operating status of a machine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum MachineStatus {
    #[default]
    Active,
    Idle,
    UnderMaintenance,
    Retired,
}

/// Input for creating or replacing a machine
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MachineInput {
    #[validate(length(min = 1, max = 120, message = "Machine name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::sku")]
    pub code: String,
    #[validate(length(max = 60))]
    pub machine_type: Option<String>,
    #[validate(length(max = 100))]
    pub manufacturer: Option<String>,
    #[validate(length(max = 60))]
    pub model_number: Option<String>,
    #[validate(custom = "crate::validation::non_negative")]
    pub capacity_per_hour: Option<Decimal>,
    #[validate(custom = "crate::validation::non_negative")]
    pub power_kw: Option<Decimal>,
    #[validate(custom = "crate::validation::non_negative")]
    pub hourly_operating_cost: Decimal,
    pub status: MachineStatus,
    pub purchase_date: Option<NaiveDate>,
    #[validate(range(min = 1, max = 3650, message = "Interval must be 1-3650 days"))]
    pub maintenance_interval_days: Option<i32>,
    pub last_maintenance_on: Option<NaiveDate>,
}

/// Maintenance log entry for a machine
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MaintenanceInput {
    #[validate(required(message = "Maintenance date is required"))]
    pub performed_on: Option<NaiveDate>,
    #[validate(length(min = 1, max = 500, message = "Description is required"))]
    pub description: String,
    #[validate(custom = "crate::validation::non_negative")]
    pub cost: Option<Decimal>,
    #[validate(range(min = 0, max = 100_000))]
    pub downtime_minutes: Option<i32>,
    #[validate(length(max = 100))]
    pub performed_by: Option<String>,
}

/// Next maintenance date given the last service date and interval
pub fn next_maintenance_due(
    last_maintenance_on: Option<NaiveDate>,
    interval_days: Option<i32>,
) -> Option<NaiveDate> {
    let last = last_maintenance_on?;
    let interval = interval_days.filter(|d| *d > 0)?;
    Some(last + Duration::days(i64::from(interval)))
}

/// Whether maintenance is due on or before `today`
pub fn is_maintenance_due(
    last_maintenance_on: Option<NaiveDate>,
    interval_days: Option<i32>,
    today: NaiveDate,
) -> bool {
    next_maintenance_due(last_maintenance_on, interval_days).is_some_and(|due| due <= today)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_next_maintenance_due() {
        assert_eq!(
            next_maintenance_due(Some(date(2026, 1, 1)), Some(90)),
            Some(date(2026, 4, 1))
        );
        assert_eq!(next_maintenance_due(None, Some(90)), None);
        assert_eq!(next_maintenance_due(Some(date(2026, 1, 1)), None), None);
        assert_eq!(next_maintenance_due(Some(date(2026, 1, 1)), Some(0)), None);
    }

    #[test]
    fn test_is_maintenance_due() {
        let last = Some(date(2026, 1, 1));
        assert!(!is_maintenance_due(last, Some(30), date(2026, 1, 30)));
        assert!(is_maintenance_due(last, Some(30), date(2026, 1, 31)));
        assert!(is_maintenance_due(last, Some(30), date(2026, 3, 1)));
    }

    #[test]
    fn test_maintenance_requires_date() {
        let input = MaintenanceInput {
            description: "Spindle bearing replaced".to_string(),
            ..Default::default()
        };
        let errors = input.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("performed_on"));
    }
}
