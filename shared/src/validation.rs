//! Validation utilities for the Manufacturing Operations Platform
//!
//! Plain checks return `Result<(), &'static str>`; the `validator` adapters
//! below wrap them so input schemas can reference them with
//! `#[validate(custom = "...")]`.

use std::borrow::Cow;

use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

const GSTIN_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Quantities and unit prices must stay below this magnitude
/// (the integer part of a NUMERIC(14, 4) column)
pub const MAX_AMOUNT: i64 = 10_000_000_000;

/// Computed money totals must stay below this magnitude (NUMERIC(16, 2))
pub const MAX_TOTAL: i64 = 100_000_000_000_000;

/// True when `value` fits the stored quantity and price columns
pub fn within_amount_limit(value: &Decimal) -> bool {
    value.abs() < Decimal::from(MAX_AMOUNT)
}

/// True when `value` fits the stored money total columns
pub fn within_total_limit(value: &Decimal) -> bool {
    value.abs() < Decimal::from(MAX_TOTAL)
}

// ============================================================================
// Indian Business Identifiers
// ============================================================================

/// Validate a GSTIN (15 characters: state code, PAN, entity code, 'Z', checksum)
pub fn check_gstin(gstin: &str) -> Result<(), &'static str> {
    let bytes = gstin.as_bytes();
    if bytes.len() != 15 {
        return Err("GSTIN must be 15 characters");
    }
    if !bytes[..2].iter().all(u8::is_ascii_digit) {
        return Err("GSTIN must start with a 2-digit state code");
    }
    let state: u8 = gstin[..2].parse().map_err(|_| "Invalid GSTIN state code")?;
    if state == 0 || (state > 38 && state != 97 && state != 99) {
        return Err("Invalid GSTIN state code");
    }
    check_pan(&gstin[2..12]).map_err(|_| "GSTIN must embed a valid PAN")?;
    if !matches!(bytes[12], b'1'..=b'9' | b'A'..=b'Z') {
        return Err("Invalid GSTIN entity code");
    }
    if bytes[13] != b'Z' {
        return Err("GSTIN 14th character must be 'Z'");
    }
    if gstin_check_char(&gstin[..14]) != Some(bytes[14] as char) {
        return Err("Invalid GSTIN checksum");
    }
    Ok(())
}

/// Compute the GSTIN check character for the first 14 characters
pub fn gstin_check_char(body: &str) -> Option<char> {
    let mut sum = 0u32;
    for (i, c) in body.bytes().enumerate() {
        let value = GSTIN_ALPHABET.iter().position(|&a| a == c)? as u32;
        let product = value * if i % 2 == 0 { 1 } else { 2 };
        sum += product / 36 + product % 36;
    }
    let check = (36 - sum % 36) % 36;
    Some(GSTIN_ALPHABET[check as usize] as char)
}

/// Validate a PAN (5 letters, 4 digits, 1 letter)
pub fn check_pan(pan: &str) -> Result<(), &'static str> {
    let bytes = pan.as_bytes();
    if bytes.len() != 10 {
        return Err("PAN must be 10 characters");
    }
    let valid = bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase();
    if valid {
        Ok(())
    } else {
        Err("PAN must look like AAAAA9999A")
    }
}

/// Validate Indian phone number format
/// Accepts: 9876543210, 98765-43210, +91 98765 43210, 09876543210
pub fn check_phone(phone: &str) -> Result<(), &'static str> {
    if phone
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | '-' | ' ' | '(' | ')')))
    {
        return Err("Invalid phone number format");
    }
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let local = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('0') => &digits[1..],
        12 if digits.starts_with("91") => &digits[2..],
        _ => return Err("Invalid phone number format"),
    };
    // Mobile numbers start with 6-9; landlines carry an STD code without the trunk 0
    if local.starts_with('0') {
        return Err("Invalid phone number format");
    }
    Ok(())
}

/// Validate a 6-digit postal PIN code
pub fn check_pincode(pincode: &str) -> Result<(), &'static str> {
    if pincode.len() == 6
        && pincode.chars().all(|c| c.is_ascii_digit())
        && !pincode.starts_with('0')
    {
        Ok(())
    } else {
        Err("PIN code must be 6 digits")
    }
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate SKU / code format (2-32 uppercase alphanumeric, '-' or '_')
pub fn check_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 2 || sku.len() > 32 {
        return Err("SKU must be 2-32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err("SKU must be uppercase letters, digits, '-' or '_'");
    }
    Ok(())
}

/// Validate password strength
pub fn check_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_ascii_alphabetic())
        || !password.chars().any(|c| c.is_ascii_digit())
    {
        return Err("Password must contain letters and digits");
    }
    Ok(())
}

/// Validate a "YYYY-MM" month string
pub fn check_month(month: &str) -> Result<(), &'static str> {
    crate::types::parse_month(month)
        .map(|_| ())
        .ok_or("Month must be formatted as YYYY-MM")
}

// ============================================================================
// Schema adapters (for `#[validate(custom = "...")]`)
// ============================================================================

fn to_error(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::Borrowed(message));
    error
}

pub fn gstin(value: &str) -> Result<(), ValidationError> {
    check_gstin(value).map_err(|m| to_error("gstin", m))
}

pub fn pan(value: &str) -> Result<(), ValidationError> {
    check_pan(value).map_err(|m| to_error("pan", m))
}

pub fn phone(value: &str) -> Result<(), ValidationError> {
    check_phone(value).map_err(|m| to_error("phone", m))
}

pub fn pincode(value: &str) -> Result<(), ValidationError> {
    check_pincode(value).map_err(|m| to_error("pincode", m))
}

pub fn sku(value: &str) -> Result<(), ValidationError> {
    check_sku(value).map_err(|m| to_error("sku", m))
}

pub fn password(value: &str) -> Result<(), ValidationError> {
    check_password(value).map_err(|m| to_error("password", m))
}

pub fn month(value: &str) -> Result<(), ValidationError> {
    check_month(value).map_err(|m| to_error("month", m))
}

pub fn positive(value: &Decimal) -> Result<(), ValidationError> {
    if !within_amount_limit(value) {
        Err(to_error("range", "Must be less than 10000000000"))
    } else if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(to_error("positive", "Must be greater than zero"))
    }
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if !within_amount_limit(value) {
        Err(to_error("range", "Must be less than 10000000000"))
    } else if *value >= Decimal::ZERO {
        Ok(())
    } else {
        Err(to_error("non_negative", "Cannot be negative"))
    }
}

pub fn percentage(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::ZERO && *value <= Decimal::ONE_HUNDRED {
        Ok(())
    } else {
        Err(to_error("percentage", "Must be between 0 and 100"))
    }
}

pub fn required_id(value: &Uuid) -> Result<(), ValidationError> {
    if value.is_nil() {
        Err(to_error("required", "This field is required"))
    } else {
        Ok(())
    }
}

/// Build a struct-level error attributed to one field
pub fn field_error(field: &'static str, message: &'static str) -> ValidationError {
    let mut error = to_error("schema", message);
    error.add_param(Cow::Borrowed("field"), &field);
    error
}

// ============================================================================
// Field-level error reporting
// ============================================================================

/// A single field-level validation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// The top-level form field this error belongs to ("bom.machines[0].machine_id" -> "bom")
    pub fn root_field(&self) -> &str {
        self.field
            .split(['.', '['])
            .next()
            .unwrap_or(self.field.as_str())
    }
}

/// Flatten `validator` errors into sorted field-level messages with dotted paths
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect_errors("", errors, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.message.cmp(&b.message)));
    out
}

fn collect_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for error in list {
                    let target = if *field == "__all__" {
                        let named = error
                            .params
                            .get("field")
                            .and_then(|v| v.as_str())
                            .unwrap_or("_form");
                        if prefix.is_empty() {
                            named.to_string()
                        } else {
                            format!("{}.{}", prefix, named)
                        }
                    } else {
                        path.clone()
                    };
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_message(&error.code));
                    out.push(FieldError::new(target, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => collect_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

fn default_message(code: &str) -> String {
    match code {
        "length" => "Invalid length".to_string(),
        "email" => "Invalid email address".to_string(),
        "range" => "Value out of range".to_string(),
        "required" => "This field is required".to_string(),
        other => format!("Invalid value ({})", other),
    }
}

/// Deserialize and validate a JSON payload, reporting every problem as field errors
pub fn validate_json<T>(value: serde_json::Value) -> Result<T, Vec<FieldError>>
where
    T: DeserializeOwned + Validate,
{
    let input: T = serde_json::from_value(value)
        .map_err(|e| vec![FieldError::new("_form", format!("Malformed form data: {}", e))])?;
    input.validate().map_err(|e| field_errors(&e))?;
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimal_limits() {
        let huge = Decimal::MAX;
        assert!(positive(&huge).is_err());
        assert!(non_negative(&huge).is_err());
        assert!(positive(&Decimal::new(99_999_999_999_999, 4)).is_ok());
        assert!(positive(&Decimal::from(MAX_AMOUNT)).is_err());
        assert!(within_total_limit(&Decimal::from(MAX_AMOUNT)));
        assert!(!within_total_limit(&Decimal::from(MAX_TOTAL)));
    }

    #[test]
    fn test_check_gstin_valid() {
        assert!(check_gstin("27AAPFU0939F1ZV").is_ok());
        assert!(check_gstin("29AAGCB7383J1Z4").is_ok());
    }

    #[test]
    fn test_check_gstin_invalid() {
        assert!(check_gstin("27AAPFU0939F1Z").is_err()); // Too short
        assert!(check_gstin("07AAACR5055K1Z7").is_err()); // Bad checksum
        assert!(check_gstin("27aapfu0939f1zv").is_err()); // Lowercase
        assert!(check_gstin("00AAPFU0939F1ZV").is_err()); // State 00
        assert!(check_gstin("27AAPFU0939F1XV").is_err()); // Missing 'Z'
    }

    #[test]
    fn test_gstin_check_char() {
        assert_eq!(gstin_check_char("27AAPFU0939F1Z"), Some('V'));
        assert_eq!(gstin_check_char("07AAACR5055K1Z"), Some('9'));
        assert_eq!(gstin_check_char("27aapfu"), None);
    }

    #[test]
    fn test_check_pan() {
        assert!(check_pan("AAPFU0939F").is_ok());
        assert!(check_pan("AAPF00939F").is_err());
        assert!(check_pan("AAPFU0939").is_err());
    }

    #[test]
    fn test_check_phone() {
        assert!(check_phone("9876543210").is_ok());
        assert!(check_phone("98765-43210").is_ok());
        assert!(check_phone("+91 98765 43210").is_ok());
        assert!(check_phone("09876543210").is_ok());
        assert!(check_phone("12345").is_err());
        assert!(check_phone("0123456789").is_err());
        assert!(check_phone("98765x43210").is_err());
    }

    #[test]
    fn test_check_pincode() {
        assert!(check_pincode("560001").is_ok());
        assert!(check_pincode("056000").is_err());
        assert!(check_pincode("5600").is_err());
    }

    #[test]
    fn test_check_sku() {
        assert!(check_sku("RM-STEEL-01").is_ok());
        assert!(check_sku("A").is_err());
        assert!(check_sku("rm-01").is_err());
        assert!(check_sku("RM 01").is_err());
    }

    #[test]
    fn test_check_password() {
        assert!(check_password("factory2026").is_ok());
        assert!(check_password("short1").is_err());
        assert!(check_password("onlyletters").is_err());
        assert!(check_password("1234567890").is_err());
    }

    #[test]
    fn test_decimal_adapters() {
        assert!(positive(&Decimal::ONE).is_ok());
        assert!(positive(&Decimal::ZERO).is_err());
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::NEGATIVE_ONE).is_err());
        assert!(percentage(&Decimal::ONE_HUNDRED).is_ok());
        assert!(percentage(&Decimal::from(101)).is_err());
    }

    #[test]
    fn test_required_id() {
        assert!(required_id(&Uuid::nil()).is_err());
        assert!(required_id(&Uuid::new_v4()).is_ok());
    }

    #[test]
    fn test_root_field() {
        assert_eq!(FieldError::new("bom.machines[0].machine_id", "x").root_field(), "bom");
        assert_eq!(FieldError::new("updates[2].quantity", "x").root_field(), "updates");
        assert_eq!(FieldError::new("name", "x").root_field(), "name");
    }
}
