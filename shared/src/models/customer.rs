//! Business customer models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Input for creating or replacing a business customer
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BusinessCustomerInput {
    #[validate(length(min = 1, max = 150, message = "Customer name is required"))]
    pub name: String,
    #[validate(length(max = 100))]
    pub contact_person: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(custom = "crate::validation::phone")]
    pub phone: Option<String>,
    #[validate(custom = "crate::validation::gstin")]
    pub gst_number: Option<String>,
    #[validate(custom = "crate::validation::pan")]
    pub pan_number: Option<String>,
    #[validate(length(max = 300))]
    pub billing_address: Option<String>,
    #[validate(length(max = 300))]
    pub shipping_address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(custom = "crate::validation::pincode")]
    pub pincode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{field_errors, validate_json};
    use serde_json::json;

    #[test]
    fn test_customer_requires_name() {
        let errors = validate_json::<BusinessCustomerInput>(json!({
            "gst_number": "29AAGCB7383J1Z4"
        }))
        .unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "name");
        assert_eq!(errors[0].message, "Customer name is required");
    }

    #[test]
    fn test_customer_rejects_bad_gstin() {
        let input = BusinessCustomerInput {
            name: "Shree Auto Components".to_string(),
            gst_number: Some("29AAGCB7383J1Z5".to_string()),
            ..Default::default()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        assert_eq!(errors[0].field, "gst_number");
        assert_eq!(errors[0].message, "Invalid GSTIN checksum");
    }

    #[test]
    fn test_customer_minimal_is_valid() {
        let input = BusinessCustomerInput {
            name: "Walk-in".to_string(),
            ..Default::default()
        };
        assert!(input.validate().is_ok());
    }
}
