//! Supplier models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Input for creating or replacing a supplier
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SupplierInput {
    #[validate(length(min = 1, max = 150, message = "Supplier name is required"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "crate::validation::phone")]
    pub phone: Option<String>,
    #[validate(custom = "crate::validation::gstin")]
    pub gst_number: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    /// Free-form list of material categories this supplier provides
    pub materials_supplied: Vec<String>,
    #[validate(range(min = 0, max = 365))]
    pub lead_time_days: Option<i32>,
}
