//! Sales order, delivery and payment models

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Largest number of updates accepted in one bulk delivery request
pub const MAX_BULK_DELIVERY_UPDATES: usize = 200;

/// Lifecycle status of an order
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    InProgress,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::InProgress => "in_progress",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::InProgress => write!(f, "In Progress"),
            OrderStatus::Completed => write!(f, "Completed"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Agreed payment terms
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentTerms {
    Advance,
    #[default]
    OnDelivery,
    Net15,
    Net30,
    Net45,
    Net60,
}

impl PaymentTerms {
    /// Credit period in days after delivery
    pub fn credit_days(&self) -> i64 {
        match self {
            PaymentTerms::Advance | PaymentTerms::OnDelivery => 0,
            PaymentTerms::Net15 => 15,
            PaymentTerms::Net30 => 30,
            PaymentTerms::Net45 => 45,
            PaymentTerms::Net60 => 60,
        }
    }
}

/// How a payment was made
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "db",
    derive(sqlx::Type),
    sqlx(type_name = "VARCHAR", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    #[default]
    BankTransfer,
    Cheque,
    Upi,
    Card,
    Other,
}

/// Input for creating an order
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_advance"))]
pub struct CreateOrderInput {
    #[validate(custom = "crate::validation::required_id")]
    pub customer_id: Uuid,
    #[validate(custom = "crate::validation::required_id")]
    pub product_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity_ordered: Decimal,
    #[validate(custom = "crate::validation::non_negative")]
    pub price_per_unit: Decimal,
    pub payment_terms: PaymentTerms,
    #[validate(custom = "crate::validation::non_negative")]
    pub advance_payment: Decimal,
    pub order_date: Option<NaiveDate>,
    pub expected_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 60))]
    pub po_number: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

impl CreateOrderInput {
    pub fn total_amount(&self) -> Option<Decimal> {
        crate::metrics::total_cost(self.quantity_ordered, self.price_per_unit)
    }
}

fn validate_advance(input: &CreateOrderInput) -> Result<(), ValidationError> {
    let total = input
        .total_amount()
        .filter(crate::validation::within_total_limit)
        .ok_or_else(|| {
            crate::validation::field_error("quantity_ordered", "Order total is too large")
        })?;
    if input.advance_payment > total {
        return Err(crate::validation::field_error(
            "advance_payment",
            "Advance payment cannot exceed the order total",
        ));
    }
    if let (Some(ordered), Some(expected)) = (input.order_date, input.expected_delivery_date) {
        if expected < ordered {
            return Err(crate::validation::field_error(
                "expected_delivery_date",
                "Expected delivery cannot be before the order date",
            ));
        }
    }
    Ok(())
}

/// Editable fields of an in-progress order; omitted fields are unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct UpdateOrderInput {
    #[validate(custom = "crate::validation::positive")]
    pub quantity_ordered: Option<Decimal>,
    #[validate(custom = "crate::validation::non_negative")]
    pub price_per_unit: Option<Decimal>,
    pub payment_terms: Option<PaymentTerms>,
    pub expected_delivery_date: Option<NaiveDate>,
    #[validate(length(max = 60))]
    pub po_number: Option<String>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// A payment received against an order or invoice
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PaymentInput {
    #[validate(custom = "crate::validation::positive")]
    pub amount: Decimal,
    pub method: PaymentMethod,
    #[validate(length(max = 100))]
    pub reference: Option<String>,
    pub paid_on: Option<NaiveDate>,
}

/// One line of a bulk delivery request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeliveryUpdate {
    #[validate(custom = "crate::validation::required_id")]
    pub order_id: Uuid,
    #[validate(custom = "crate::validation::positive")]
    pub quantity_delivered: Decimal,
    pub delivered_on: Option<NaiveDate>,
    #[validate(length(max = 60))]
    pub challan_number: Option<String>,
    #[validate]
    pub payment: Option<PaymentInput>,
}

/// Bulk partial-delivery and payment recording
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
#[validate(schema(function = "validate_batch_size"))]
pub struct BulkDeliveryInput {
    #[validate]
    pub updates: Vec<DeliveryUpdate>,
}

fn validate_batch_size(input: &BulkDeliveryInput) -> Result<(), ValidationError> {
    if input.updates.is_empty() {
        return Err(crate::validation::field_error(
            "updates",
            "At least one update is required",
        ));
    }
    if input.updates.len() > MAX_BULK_DELIVERY_UPDATES {
        return Err(crate::validation::field_error(
            "updates",
            "Too many updates in one request",
        ));
    }
    Ok(())
}

/// Delivery against a single order (same rules as one bulk line)
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SingleDeliveryInput {
    #[validate(custom = "crate::validation::positive")]
    pub quantity_delivered: Decimal,
    pub delivered_on: Option<NaiveDate>,
    #[validate(length(max = 60))]
    pub challan_number: Option<String>,
    #[validate]
    pub payment: Option<PaymentInput>,
}

impl SingleDeliveryInput {
    pub fn into_update(self, order_id: Uuid) -> DeliveryUpdate {
        DeliveryUpdate {
            order_id,
            quantity_delivered: self.quantity_delivered,
            delivered_on: self.delivered_on,
            challan_number: self.challan_number,
            payment: self.payment,
        }
    }
}
