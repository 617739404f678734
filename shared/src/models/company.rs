//! Company, user and authentication models

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Role of a user within a company
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Owner,
    Manager,
    #[default]
    Operator,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Owner => "owner",
            UserRole::Manager => "manager",
            UserRole::Operator => "operator",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(UserRole::Owner),
            "manager" => Some(UserRole::Manager),
            "operator" => Some(UserRole::Operator),
            _ => None,
        }
    }

    /// Owners and managers may change company-wide settings
    pub fn can_manage(&self) -> bool {
        matches!(self, UserRole::Owner | UserRole::Manager)
    }
}

/// Input for registering a new company with its owner account
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RegisterCompanyInput {
    #[validate(length(min = 2, max = 120, message = "Company name is required"))]
    pub company_name: String,
    #[validate(length(min = 1, max = 100, message = "Owner name is required"))]
    pub owner_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(custom = "crate::validation::password")]
    pub password: String,
    #[validate(custom = "crate::validation::phone")]
    pub phone: Option<String>,
    #[validate(custom = "crate::validation::gstin")]
    pub gst_number: Option<String>,
}

/// Input for email/password login
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct LoginInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Input carrying a one-time email verification token
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct VerifyEmailInput {
    #[validate(length(min = 1, message = "Verification token is required"))]
    pub token: String,
}

/// Input naming the account for verification resend or password reset
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct EmailInput {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// Input for completing a password reset
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ResetPasswordInput {
    #[validate(length(min = 1, message = "Reset token is required"))]
    pub token: String,
    #[validate(custom = "crate::validation::password")]
    pub new_password: String,
}

/// Input for exchanging a refresh token
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct RefreshTokenInput {
    #[validate(length(min = 1, message = "Refresh token is required"))]
    pub refresh_token: String,
}

/// Input for updating the company profile
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateCompanyInput {
    #[validate(length(min = 2, max = 120, message = "Company name is required"))]
    pub name: String,
    #[validate(custom = "crate::validation::phone")]
    pub phone: Option<String>,
    #[validate(custom = "crate::validation::gstin")]
    pub gst_number: Option<String>,
    #[validate(length(max = 300))]
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    #[validate(custom = "crate::validation::pincode")]
    pub pincode: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::field_errors;

    fn registration() -> RegisterCompanyInput {
        RegisterCompanyInput {
            company_name: "Precision Castings Pvt Ltd".to_string(),
            owner_name: "Asha Rao".to_string(),
            email: "owner@precision.example".to_string(),
            password: "foundry2026".to_string(),
            phone: Some("9876543210".to_string()),
            gst_number: Some("27AAPFU0939F1ZV".to_string()),
        }
    }

    #[test]
    fn test_registration_valid() {
        assert!(registration().validate().is_ok());
    }

    #[test]
    fn test_registration_reports_each_field() {
        let input = RegisterCompanyInput {
            email: "not-an-email".to_string(),
            password: "short".to_string(),
            gst_number: Some("27AAPFU0939F1ZX".to_string()),
            ..registration()
        };
        let errors = field_errors(&input.validate().unwrap_err());
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "gst_number", "password"]);
    }

    #[test]
    fn test_missing_fields_default_and_fail_validation() {
        let input: RegisterCompanyInput = serde_json::from_str("{}").unwrap();
        let errors = field_errors(&input.validate().unwrap_err());
        assert!(errors.iter().any(|e| e.field == "company_name"));
        assert!(errors.iter().any(|e| e.field == "owner_name"));
    }

    #[test]
    fn test_role_permissions() {
        assert!(UserRole::Owner.can_manage());
        assert!(UserRole::Manager.can_manage());
        assert!(!UserRole::Operator.can_manage());
        assert_eq!(UserRole::parse("manager"), Some(UserRole::Manager));
        assert_eq!(UserRole::parse("admin"), None);
    }
}
