//! Order fulfilment tests
//!
//! Tests for deliveries and payments against orders:
//! - Accepted deliveries never exceed the remaining quantity
//! - Remaining quantity always equals ordered minus delivered
//! - Payments never exceed the outstanding balance

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::metrics::{
    check_delivery, check_payment, remaining_quantity, status_after_delivery, DeliveryError,
};
use shared::models::{BulkDeliveryInput, DeliveryUpdate, OrderStatus, PaymentInput};
use shared::validation::field_errors;
use uuid::Uuid;
use validator::Validate;

fn qty(units: i64) -> Decimal {
    Decimal::new(units, 1)
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// A delivery is accepted exactly when 0 < quantity <= remaining
    #[test]
    fn prop_delivery_guard(ordered in 1i64..100_000, delivered in 0i64..100_000, requested in -10i64..120_000) {
        let ordered = qty(ordered);
        let delivered = qty(delivered).min(ordered);
        let remaining = remaining_quantity(ordered, delivered);
        let requested = qty(requested);

        let result = check_delivery(OrderStatus::InProgress, remaining, requested);
        let expected = requested > Decimal::ZERO && requested <= remaining;
        prop_assert_eq!(result.is_ok(), expected);
    }

    /// Applying only accepted deliveries keeps delivered <= ordered
    #[test]
    fn prop_fulfilment_sequence(ordered in 1i64..10_000, requests in prop::collection::vec(1i64..4_000, 1..20)) {
        let ordered = qty(ordered);
        let mut delivered = Decimal::ZERO;
        let mut status = OrderStatus::InProgress;

        for request in requests {
            let remaining = remaining_quantity(ordered, delivered);
            if check_delivery(status, remaining, qty(request)).is_ok() {
                delivered += qty(request);
                status = status_after_delivery(remaining_quantity(ordered, delivered));
            }
            prop_assert!(delivered <= ordered);
            prop_assert_eq!(remaining_quantity(ordered, delivered), ordered - delivered);
            prop_assert_eq!(status == OrderStatus::Completed, delivered == ordered);
        }
    }

    /// Payments are accepted exactly when 0 < amount <= outstanding
    #[test]
    fn prop_payment_guard(outstanding in 0i64..10_000_000, amount in -100i64..12_000_000) {
        let outstanding = Decimal::new(outstanding, 2);
        let amount = Decimal::new(amount, 2);
        let expected = amount > Decimal::ZERO && amount <= outstanding;
        prop_assert_eq!(check_payment(outstanding, amount).is_ok(), expected);
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_closed_orders_reject_deliveries() {
        for status in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert_eq!(
                check_delivery(status, qty(100), qty(1)),
                Err(DeliveryError::OrderNotOpen(status))
            );
        }
    }

    #[test]
    fn test_over_delivery_reports_remaining() {
        let err = check_delivery(OrderStatus::InProgress, qty(50), qty(51)).unwrap_err();
        assert_eq!(
            err,
            DeliveryError::ExceedsRemaining {
                requested: qty(51),
                remaining: qty(50),
            }
        );
        assert!(err.to_string().contains("exceeds remaining quantity"));
    }

    #[test]
    fn test_remaining_never_negative() {
        assert_eq!(remaining_quantity(qty(10), qty(15)), Decimal::ZERO);
    }

    #[test]
    fn test_bulk_delivery_requires_updates() {
        let errors = BulkDeliveryInput::default().validate().unwrap_err();
        let fields = field_errors(&errors);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "updates");
        assert_eq!(fields[0].message, "At least one update is required");
    }

    #[test]
    fn test_bulk_delivery_reports_line_errors() {
        let input = BulkDeliveryInput {
            updates: vec![
                DeliveryUpdate {
                    order_id: Uuid::new_v4(),
                    quantity_delivered: qty(10),
                    ..Default::default()
                },
                DeliveryUpdate {
                    order_id: Uuid::new_v4(),
                    quantity_delivered: Decimal::ZERO,
                    payment: Some(PaymentInput {
                        amount: Decimal::ZERO,
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ],
        };

        let fields: Vec<String> = field_errors(&input.validate().unwrap_err())
            .into_iter()
            .map(|e| e.field)
            .collect();
        assert_eq!(
            fields,
            vec![
                "updates[1].payment.amount".to_string(),
                "updates[1].quantity_delivered".to_string(),
            ]
        );
    }
}
