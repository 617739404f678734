//! Client-side form handling: schema lookup by name and multi-step wizards
//!
//! A wizard keeps every value entered so far while the user moves between
//! steps; only the step being left has to be valid before moving forward.

use std::collections::HashSet;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::*;
use crate::validation::{validate_json, FieldError};

/// Every input schema a form can be validated against
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    RegisterCompany,
    Login,
    ResetPassword,
    UpdateCompany,
    BusinessCustomer,
    Supplier,
    RawMaterial,
    StockIntake,
    PackagingRawMaterial,
    StockAdjustment,
    Machine,
    Maintenance,
    ManualJob,
    ManualJobProduction,
    Product,
    SemiFinishedProduct,
    CreateOrder,
    UpdateOrder,
    Delivery,
    BulkDelivery,
    Payment,
    ProductionRecord,
    ProductProduction,
    ProductionPlan,
    ScrapReason,
    FinanceCost,
    Invoice,
    ChatMessage,
}

impl FormKind {
    pub const ALL: [FormKind; 28] = [
        FormKind::RegisterCompany,
        FormKind::Login,
        FormKind::ResetPassword,
        FormKind::UpdateCompany,
        FormKind::BusinessCustomer,
        FormKind::Supplier,
        FormKind::RawMaterial,
        FormKind::StockIntake,
        FormKind::PackagingRawMaterial,
        FormKind::StockAdjustment,
        FormKind::Machine,
        FormKind::Maintenance,
        FormKind::ManualJob,
        FormKind::ManualJobProduction,
        FormKind::Product,
        FormKind::SemiFinishedProduct,
        FormKind::CreateOrder,
        FormKind::UpdateOrder,
        FormKind::Delivery,
        FormKind::BulkDelivery,
        FormKind::Payment,
        FormKind::ProductionRecord,
        FormKind::ProductProduction,
        FormKind::ProductionPlan,
        FormKind::ScrapReason,
        FormKind::FinanceCost,
        FormKind::Invoice,
        FormKind::ChatMessage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::RegisterCompany => "register_company",
            FormKind::Login => "login",
            FormKind::ResetPassword => "reset_password",
            FormKind::UpdateCompany => "update_company",
            FormKind::BusinessCustomer => "business_customer",
            FormKind::Supplier => "supplier",
            FormKind::RawMaterial => "raw_material",
            FormKind::StockIntake => "stock_intake",
            FormKind::PackagingRawMaterial => "packaging_raw_material",
            FormKind::StockAdjustment => "stock_adjustment",
            FormKind::Machine => "machine",
            FormKind::Maintenance => "maintenance",
            FormKind::ManualJob => "manual_job",
            FormKind::ManualJobProduction => "manual_job_production",
            FormKind::Product => "product",
            FormKind::SemiFinishedProduct => "semi_finished_product",
            FormKind::CreateOrder => "create_order",
            FormKind::UpdateOrder => "update_order",
            FormKind::Delivery => "delivery",
            FormKind::BulkDelivery => "bulk_delivery",
            FormKind::Payment => "payment",
            FormKind::ProductionRecord => "production_record",
            FormKind::ProductProduction => "product_production",
            FormKind::ProductionPlan => "production_plan",
            FormKind::ScrapReason => "scrap_reason",
            FormKind::FinanceCost => "finance_cost",
            FormKind::Invoice => "invoice",
            FormKind::ChatMessage => "chat_message",
        }
    }

    /// Validate a form payload against this schema; empty means submittable
    pub fn validate(&self, payload: Value) -> Vec<FieldError> {
        fn check<T>(payload: Value) -> Vec<FieldError>
        where
            T: serde::de::DeserializeOwned + validator::Validate,
        {
            validate_json::<T>(payload).err().unwrap_or_default()
        }

        match self {
            FormKind::RegisterCompany => check::<RegisterCompanyInput>(payload),
            FormKind::Login => check::<LoginInput>(payload),
            FormKind::ResetPassword => check::<ResetPasswordInput>(payload),
            FormKind::UpdateCompany => check::<UpdateCompanyInput>(payload),
            FormKind::BusinessCustomer => check::<BusinessCustomerInput>(payload),
            FormKind::Supplier => check::<SupplierInput>(payload),
            FormKind::RawMaterial => check::<RawMaterialInput>(payload),
            FormKind::StockIntake => check::<StockIntakeInput>(payload),
            FormKind::PackagingRawMaterial => check::<PackagingRawMaterialInput>(payload),
            FormKind::StockAdjustment => check::<StockAdjustmentInput>(payload),
            FormKind::Machine => check::<MachineInput>(payload),
            FormKind::Maintenance => check::<MaintenanceInput>(payload),
            FormKind::ManualJob => check::<ManualJobInput>(payload),
            FormKind::ManualJobProduction => check::<ManualJobProductionInput>(payload),
            FormKind::Product => check::<ProductInput>(payload),
            FormKind::SemiFinishedProduct => check::<SemiFinishedProductInput>(payload),
            FormKind::CreateOrder => check::<CreateOrderInput>(payload),
            FormKind::UpdateOrder => check::<UpdateOrderInput>(payload),
            FormKind::Delivery => check::<SingleDeliveryInput>(payload),
            FormKind::BulkDelivery => check::<BulkDeliveryInput>(payload),
            FormKind::Payment => check::<PaymentInput>(payload),
            FormKind::ProductionRecord => check::<ProductionRecordInput>(payload),
            FormKind::ProductProduction => check::<ProductProductionInput>(payload),
            FormKind::ProductionPlan => check::<ProductionPlanInput>(payload),
            FormKind::ScrapReason => check::<ScrapReasonInput>(payload),
            FormKind::FinanceCost => check::<FinanceCostInput>(payload),
            FormKind::Invoice => check::<CreateInvoiceInput>(payload),
            FormKind::ChatMessage => check::<ChatMessageInput>(payload),
        }
    }
}

impl FromStr for FormKind {
    type Err = WizardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| WizardError::UnknownForm(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WizardError {
    #[error("Unknown form: {0}")]
    UnknownForm(String),

    #[error("A wizard needs at least one step")]
    NoSteps,

    #[error("Field {0} appears in more than one step")]
    DuplicateField(String),

    #[error("Field {0} does not belong to any step")]
    UnknownField(String),

    #[error("Step {0} has not been reached yet")]
    StepNotReached(usize),

    #[error("Already on the last step")]
    LastStep,

    #[error("Not on the last step")]
    NotLastStep,

    #[error("Fix the highlighted fields before continuing")]
    StepInvalid(Vec<FieldError>),
}

/// One tab of a multi-step form and the top-level fields it owns
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WizardStep {
    pub name: String,
    pub fields: Vec<String>,
}

impl WizardStep {
    pub fn new(name: impl Into<String>, fields: &[&str]) -> Self {
        Self {
            name: name.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }

    fn owns(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }
}

/// Multi-step form state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormWizard {
    steps: Vec<WizardStep>,
    current: usize,
    furthest: usize,
    values: Map<String, Value>,
}

impl FormWizard {
    pub fn new(steps: Vec<WizardStep>) -> Result<Self, WizardError> {
        if steps.is_empty() {
            return Err(WizardError::NoSteps);
        }
        let mut seen = HashSet::new();
        for field in steps.iter().flat_map(|s| s.fields.iter()) {
            if !seen.insert(field.as_str()) {
                return Err(WizardError::DuplicateField(field.clone()));
            }
        }
        Ok(Self {
            steps,
            current: 0,
            furthest: 0,
            values: Map::new(),
        })
    }

    pub fn steps(&self) -> &[WizardStep] {
        &self.steps
    }

    pub fn current(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> &WizardStep {
        &self.steps[self.current]
    }

    pub fn is_last_step(&self) -> bool {
        self.current + 1 == self.steps.len()
    }

    pub fn set_value(&mut self, field: &str, value: Value) -> Result<(), WizardError> {
        if !self.steps.iter().any(|s| s.owns(field)) {
            return Err(WizardError::UnknownField(field.to_string()));
        }
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    pub fn value(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Everything entered so far, across all steps
    pub fn payload(&self) -> Value {
        Value::Object(self.values.clone())
    }

    /// Errors that belong to the fields of `step`
    pub fn step_errors(&self, step: usize, errors: &[FieldError]) -> Vec<FieldError> {
        let Some(step) = self.steps.get(step) else {
            return Vec::new();
        };
        errors
            .iter()
            .filter(|e| step.owns(e.root_field()))
            .cloned()
            .collect()
    }

    /// Move forward if the current step has no errors. Errors for later
    /// steps do not block; the user has not filled them in yet.
    pub fn advance(&mut self, errors: &[FieldError]) -> Result<usize, WizardError> {
        if self.is_last_step() {
            return Err(WizardError::LastStep);
        }
        let blocking = self.step_errors(self.current, errors);
        if !blocking.is_empty() {
            return Err(WizardError::StepInvalid(blocking));
        }
        self.current += 1;
        self.furthest = self.furthest.max(self.current);
        Ok(self.current)
    }

    /// Going back never validates and never loses data
    pub fn back(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Jump to any step already reached
    pub fn go_to(&mut self, step: usize) -> Result<usize, WizardError> {
        if step > self.furthest || step >= self.steps.len() {
            return Err(WizardError::StepNotReached(step));
        }
        self.current = step;
        Ok(self.current)
    }

    /// Final submission: on the last step with a fully valid payload
    pub fn finish(&self, errors: &[FieldError]) -> Result<Value, WizardError> {
        if !self.is_last_step() {
            return Err(WizardError::NotLastStep);
        }
        if !errors.is_empty() {
            return Err(WizardError::StepInvalid(errors.to_vec()));
        }
        Ok(self.payload())
    }

    /// Validate the whole payload against `kind` and advance
    pub fn advance_with(&mut self, kind: FormKind) -> Result<usize, WizardError> {
        let errors = kind.validate(self.payload());
        self.advance(&errors)
    }

    /// Validate the whole payload against `kind` and submit
    pub fn finish_with(&self, kind: FormKind) -> Result<Value, WizardError> {
        let errors = kind.validate(self.payload());
        self.finish(&errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn customer_wizard() -> FormWizard {
        FormWizard::new(vec![
            WizardStep::new("Business", &["name", "contact_person", "gst_number", "pan_number"]),
            WizardStep::new("Contact", &["email", "phone"]),
            WizardStep::new(
                "Address",
                &["billing_address", "shipping_address", "city", "state", "pincode"],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_form_kind_round_trip() {
        for kind in FormKind::ALL {
            assert_eq!(kind.as_str().parse::<FormKind>(), Ok(kind));
        }
        assert!("nonsense".parse::<FormKind>().is_err());
    }

    #[test]
    fn test_missing_customer_name_blocks_submission() {
        let errors = FormKind::BusinessCustomer.validate(json!({ "city": "Pune" }));
        assert!(errors.iter().any(|e| e.field == "name"));
    }

    #[test]
    fn test_bad_gstin_blocks_submission() {
        let errors = FormKind::BusinessCustomer.validate(json!({
            "name": "Acme Castings",
            "gst_number": "07AAACR5055K1Z7"
        }));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "gst_number");
    }

    #[test]
    fn test_advance_ignores_later_steps() {
        let mut wizard = customer_wizard();
        wizard.set_value("name", json!("Acme Castings")).unwrap();
        wizard.set_value("email", json!("not-an-email")).unwrap();

        assert_eq!(wizard.advance_with(FormKind::BusinessCustomer), Ok(1));
        let blocked = wizard.advance_with(FormKind::BusinessCustomer);
        assert!(matches!(blocked, Err(WizardError::StepInvalid(ref e)) if e[0].field == "email"));
        assert_eq!(wizard.current(), 1);
    }

    #[test]
    fn test_current_step_must_be_valid() {
        let mut wizard = customer_wizard();
        let result = wizard.advance_with(FormKind::BusinessCustomer);
        assert!(matches!(result, Err(WizardError::StepInvalid(_))));
        assert_eq!(wizard.current(), 0);
    }

    #[test]
    fn test_navigation_preserves_values() {
        let mut wizard = customer_wizard();
        wizard.set_value("name", json!("Acme Castings")).unwrap();
        wizard.advance(&[]).unwrap();
        wizard.set_value("phone", json!("9876543210")).unwrap();
        wizard.advance(&[]).unwrap();
        wizard.set_value("city", json!("Pune")).unwrap();

        assert_eq!(wizard.back(), 1);
        assert_eq!(wizard.back(), 0);
        assert_eq!(wizard.back(), 0);
        assert_eq!(wizard.go_to(2), Ok(2));

        assert_eq!(wizard.value("name"), Some(&json!("Acme Castings")));
        assert_eq!(wizard.value("phone"), Some(&json!("9876543210")));
        assert_eq!(wizard.value("city"), Some(&json!("Pune")));
    }

    #[test]
    fn test_go_to_unreached_step() {
        let mut wizard = customer_wizard();
        assert_eq!(wizard.go_to(2), Err(WizardError::StepNotReached(2)));
    }

    #[test]
    fn test_finish_requires_last_step_and_valid_payload() {
        let mut wizard = customer_wizard();
        wizard.set_value("name", json!("Acme Castings")).unwrap();
        assert_eq!(
            wizard.finish_with(FormKind::BusinessCustomer),
            Err(WizardError::NotLastStep)
        );
        wizard.advance(&[]).unwrap();
        wizard.advance(&[]).unwrap();
        let payload = wizard.finish_with(FormKind::BusinessCustomer).unwrap();
        assert_eq!(payload["name"], "Acme Castings");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut wizard = customer_wizard();
        assert_eq!(
            wizard.set_value("salary", json!(1)),
            Err(WizardError::UnknownField("salary".to_string()))
        );
    }

    #[test]
    fn test_duplicate_fields_rejected() {
        let result = FormWizard::new(vec![
            WizardStep::new("One", &["name"]),
            WizardStep::new("Two", &["name"]),
        ]);
        assert!(matches!(result, Err(WizardError::DuplicateField(_))));
    }
}
