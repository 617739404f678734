//! WebAssembly module for the Manufacturing Operations Platform
//!
//! Provides client-side computation for:
//! - Form validation against the same schemas the API enforces
//! - Stock intake and order totals recomputed on every input change
//! - Delivery guards (no over-delivery)
//! - OEE and break-even previews
//! - Multi-step form state

use rust_decimal::Decimal;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;

use shared::forms::{FormKind, FormWizard, WizardError, WizardStep};
use shared::metrics::{self, OeeInputs};
use shared::models::OrderStatus;
use shared::validation::{check_gstin, FieldError};

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {
    web_sys::console::log_1(&"manufacturing-ops wasm ready".into());
}

/// Exact decimal for a JS number; `None` for NaN, infinities and values
/// outside the decimal range
fn dec(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::try_from(value).ok().map(|d| d.normalize())
}

fn js_error(message: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&message.to_string())
}

fn dec_arg(name: &str, value: f64) -> Result<Decimal, JsValue> {
    dec(value).ok_or_else(|| js_error(format!("{} must be a finite number", name)))
}

fn errors_json(errors: &[FieldError]) -> String {
    serde_json::to_string(errors).unwrap_or_else(|_| "[]".to_string())
}

/// Validate a form payload; returns a JSON array of `{field, message}`
/// (empty when the form may be submitted)
#[wasm_bindgen]
pub fn validate_form(kind: &str, payload_json: &str) -> Result<String, JsValue> {
    let kind: FormKind = kind.parse().map_err(js_error)?;
    let payload: Value = serde_json::from_str(payload_json)
        .map_err(|e| js_error(format!("Invalid form JSON: {}", e)))?;
    Ok(errors_json(&kind.validate(payload)))
}

/// Stock intake total: quantity received × price per unit.
/// `NaN` when an input is not a finite number or the total overflows.
#[wasm_bindgen]
pub fn compute_total_cost(quantity: f64, price_per_unit: f64) -> f64 {
    dec(quantity)
        .zip(dec(price_per_unit))
        .and_then(|(quantity, price)| metrics::total_cost(quantity, price))
        .map_or(f64::NAN, |total| metrics::to_f64(total.round_dp(2)))
}

/// `NaN` when an input is not a finite number
#[wasm_bindgen]
pub fn compute_remaining_quantity(quantity_ordered: f64, quantity_delivered: f64) -> f64 {
    dec(quantity_ordered)
        .zip(dec(quantity_delivered))
        .map_or(f64::NAN, |(ordered, delivered)| {
            metrics::to_f64(metrics::remaining_quantity(ordered, delivered))
        })
}

fn parse_status(status: &str) -> OrderStatus {
    match status {
        "completed" => OrderStatus::Completed,
        "cancelled" => OrderStatus::Cancelled,
        _ => OrderStatus::InProgress,
    }
}

/// Whether `quantity` can be delivered against an order
#[wasm_bindgen]
pub fn can_deliver(status: &str, remaining: f64, quantity: f64) -> bool {
    delivery_error(status, remaining, quantity).is_none()
}

/// Why a delivery would be rejected, if it would be
#[wasm_bindgen]
pub fn delivery_error(status: &str, remaining: f64, quantity: f64) -> Option<String> {
    let (Some(remaining), Some(quantity)) = (dec(remaining), dec(quantity)) else {
        return Some("Quantities must be finite numbers".to_string());
    };
    metrics::check_delivery(parse_status(status), remaining, quantity)
        .err()
        .map(|e| e.to_string())
}

/// OEE preview for one run; returns JSON with availability, performance,
/// quality and oee fractions
#[wasm_bindgen]
pub fn calculate_oee(
    planned_minutes: f64,
    run_minutes: f64,
    ideal_cycle_time_seconds: f64,
    total_output: f64,
    scrap: f64,
    rework: f64,
) -> Result<String, JsValue> {
    let inputs = OeeInputs::for_run(
        dec_arg("planned_minutes", planned_minutes)?,
        dec_arg("run_minutes", run_minutes)?,
        dec_arg("ideal_cycle_time_seconds", ideal_cycle_time_seconds)?,
        dec_arg("total_output", total_output)?,
        dec_arg("scrap", scrap)?,
        dec_arg("rework", rework)?,
    );
    let result = metrics::oee(&inputs);
    Ok(json!({
        "availability": metrics::to_f64(result.availability),
        "performance": metrics::to_f64(result.performance),
        "quality": metrics::to_f64(result.quality),
        "oee": metrics::to_f64(result.oee),
    })
    .to_string())
}

#[wasm_bindgen]
pub fn calculate_break_even(
    fixed_costs: f64,
    selling_price: f64,
    variable_cost_per_unit: f64,
) -> Result<String, JsValue> {
    let result = metrics::break_even(
        dec_arg("fixed_costs", fixed_costs)?,
        dec_arg("selling_price", selling_price)?,
        dec_arg("variable_cost_per_unit", variable_cost_per_unit)?,
    );
    Ok(json!({
        "contribution_margin_per_unit": metrics::to_f64(result.contribution_margin_per_unit),
        "break_even_units": result.break_even_units.map(metrics::to_f64),
        "break_even_revenue": result.break_even_revenue.map(metrics::to_f64),
        "reason": result.reason,
    })
    .to_string())
}

/// Validate GSTIN format and checksum
#[wasm_bindgen]
pub fn validate_gstin(gstin: &str) -> bool {
    check_gstin(gstin).is_ok()
}

/// Names accepted by `validate_form` and `FormWizard`
#[wasm_bindgen]
pub fn form_kinds() -> js_sys::Array {
    FormKind::ALL
        .iter()
        .map(|kind| JsValue::from_str(kind.as_str()))
        .collect()
}

/// Multi-step form bound to one schema
#[wasm_bindgen(js_name = FormWizard)]
pub struct WizardHandle {
    kind: FormKind,
    inner: FormWizard,
}

#[wasm_bindgen(js_class = FormWizard)]
impl WizardHandle {
    /// `steps_json`: `[{"name": "...", "fields": ["...", ...]}, ...]`
    #[wasm_bindgen(constructor)]
    pub fn new(kind: &str, steps_json: &str) -> Result<WizardHandle, JsValue> {
        let kind: FormKind = kind.parse().map_err(js_error)?;
        let steps: Vec<WizardStep> = serde_json::from_str(steps_json)
            .map_err(|e| js_error(format!("Invalid steps JSON: {}", e)))?;
        let inner = FormWizard::new(steps).map_err(js_error)?;
        Ok(WizardHandle { kind, inner })
    }

    #[wasm_bindgen(js_name = setValue)]
    pub fn set_value(&mut self, field: &str, value_json: &str) -> Result<(), JsValue> {
        let value: Value = serde_json::from_str(value_json)
            .unwrap_or_else(|_| Value::String(value_json.to_string()));
        self.inner.set_value(field, value).map_err(js_error)
    }

    #[wasm_bindgen(getter, js_name = currentStep)]
    pub fn current_step(&self) -> usize {
        self.inner.current()
    }

    #[wasm_bindgen(getter, js_name = stepCount)]
    pub fn step_count(&self) -> usize {
        self.inner.steps().len()
    }

    /// Move forward; returns the current step's errors as JSON (empty when moved)
    pub fn next(&mut self) -> String {
        match self.inner.advance_with(self.kind) {
            Err(WizardError::StepInvalid(errors)) => errors_json(&errors),
            _ => "[]".to_string(),
        }
    }

    pub fn back(&mut self) -> usize {
        self.inner.back()
    }

    #[wasm_bindgen(js_name = goTo)]
    pub fn go_to(&mut self, step: usize) -> bool {
        self.inner.go_to(step).is_ok()
    }

    /// Everything entered so far as JSON
    pub fn values(&self) -> String {
        self.inner.payload().to_string()
    }

    /// `{"valid": true, "payload": {...}}` or `{"valid": false, "errors": [...]}`
    pub fn submit(&self) -> String {
        match self.inner.finish_with(self.kind) {
            Ok(payload) => json!({ "valid": true, "payload": payload }).to_string(),
            Err(WizardError::StepInvalid(errors)) => {
                json!({ "valid": false, "errors": errors }).to_string()
            }
            Err(other) => json!({
                "valid": false,
                "errors": [FieldError::new("_form", other.to_string())],
            })
            .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_total_cost() {
        assert!((compute_total_cost(120.5, 42.0) - 5061.0).abs() < 0.001);
        assert!((compute_total_cost(3.0, 0.1) - 0.3).abs() < 0.001);
    }

    #[test]
    fn test_non_finite_inputs_are_flagged() {
        assert!(compute_total_cost(f64::NAN, 5.0).is_nan());
        assert!(compute_total_cost(f64::INFINITY, 5.0).is_nan());
        assert!(compute_total_cost(1e28, 10.0).is_nan());
        assert!(compute_remaining_quantity(100.0, f64::NAN).is_nan());
        assert!(!can_deliver("in_progress", f64::NAN, 1.0));
        assert!(dec(f64::NEG_INFINITY).is_none());
        assert_eq!(dec(12.5), Some(Decimal::new(125, 1)));
    }

    #[test]
    fn test_remaining_and_delivery() {
        assert!((compute_remaining_quantity(100.0, 35.0) - 65.0).abs() < 0.001);
        assert!(can_deliver("in_progress", 65.0, 65.0));
        assert!(!can_deliver("in_progress", 65.0, 66.0));
        assert!(!can_deliver("completed", 65.0, 1.0));
        assert!(delivery_error("in_progress", 10.0, 0.0).is_some());
    }

    #[test]
    fn test_validate_form() {
        let errors = validate_form("business_customer", r#"{"name": ""}"#).unwrap();
        assert!(errors.contains("Customer name is required"));
        let ok = validate_form("scrap_reason", r#"{"reason": "Porosity"}"#).unwrap();
        assert_eq!(ok, "[]");
    }

    #[test]
    fn test_calculate_oee() {
        let result: Value =
            serde_json::from_str(&calculate_oee(480.0, 400.0, 30.0, 700.0, 21.0, 14.0).unwrap()).unwrap();
        assert!((result["performance"].as_f64().unwrap() - 0.875).abs() < 0.0001);
        assert!((result["quality"].as_f64().unwrap() - 0.95).abs() < 0.0001);
    }

    #[test]
    fn test_calculate_break_even() {
        let result: Value =
            serde_json::from_str(&calculate_break_even(100000.0, 250.0, 175.0).unwrap()).unwrap();
        assert_eq!(result["break_even_units"].as_f64(), Some(1334.0));

        let none: Value = serde_json::from_str(&calculate_break_even(1000.0, 10.0, 12.0).unwrap()).unwrap();
        assert!(none["break_even_units"].is_null());
    }

    #[test]
    fn test_validate_gstin() {
        assert!(validate_gstin("27AAPFU0939F1ZV"));
        assert!(!validate_gstin("07AAACR5055K1Z7"));
    }

    #[test]
    fn test_wizard_preserves_values() {
        let steps = r#"[
            {"name": "Business", "fields": ["name", "gst_number"]},
            {"name": "Contact", "fields": ["email", "phone"]}
        ]"#;
        let mut wizard = WizardHandle::new("business_customer", steps).unwrap();
        assert!(wizard.next().contains("Customer name is required"));
        assert_eq!(wizard.current_step(), 0);

        wizard.set_value("name", r#""Acme Castings""#).unwrap();
        assert_eq!(wizard.next(), "[]");
        assert_eq!(wizard.current_step(), 1);
        wizard.set_value("phone", r#""9876543210""#).unwrap();
        assert_eq!(wizard.back(), 0);

        let values: Value = serde_json::from_str(&wizard.values()).unwrap();
        assert_eq!(values["name"], "Acme Castings");
        assert_eq!(values["phone"], "9876543210");

        let early: Value = serde_json::from_str(&wizard.submit()).unwrap();
        assert_eq!(early["valid"], false);

        assert!(wizard.go_to(1));
        let submitted: Value = serde_json::from_str(&wizard.submit()).unwrap();
        assert_eq!(submitted["valid"], true);
        assert_eq!(submitted["payload"]["name"], "Acme Castings");
    }
}
