//! Inventory costing tests
//!
//! Tests for stock intake and machine costing:
//! - Intake total cost equals quantity received x price per unit
//! - Intake schema rejects empty, negative or oversized quantities

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::metrics::{machine_time_cost, total_cost};
use shared::models::StockIntakeInput;
use shared::validation::field_errors;
use uuid::Uuid;
use validator::Validate;

fn intake(quantity: Decimal, price: Decimal) -> StockIntakeInput {
    StockIntakeInput {
        raw_material_id: Uuid::new_v4(),
        quantity_received: quantity,
        price_per_unit: price,
        ..Default::default()
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// The form and the service compute the same total on every change
    #[test]
    fn prop_intake_total_cost(quantity in 1i64..10_000_000, price in 0i64..10_000_000) {
        let quantity = Decimal::new(quantity, 3);
        let price = Decimal::new(price, 2);
        let input = intake(quantity, price);

        prop_assert_eq!(input.total_cost(), Some(quantity * price));
        prop_assert_eq!(input.total_cost(), total_cost(quantity, price));
        prop_assert!(input.validate().is_ok());
    }

    /// Editing either field recomputes the total from scratch
    #[test]
    fn prop_intake_total_follows_edits(edits in prop::collection::vec((1i64..100_000, 0i64..100_000), 1..10)) {
        let mut input = intake(Decimal::ONE, Decimal::ZERO);
        for (quantity, price) in edits {
            input.quantity_received = Decimal::new(quantity, 2);
            input.price_per_unit = Decimal::new(price, 2);
            prop_assert_eq!(
                input.total_cost(),
                Some(input.quantity_received * input.price_per_unit)
            );
        }
    }

    #[test]
    fn prop_machine_time_cost_linear(minutes in 0i64..10_000, hourly in 0i64..1_000_000) {
        let minutes = Decimal::from(minutes);
        let hourly = Decimal::new(hourly, 2);
        prop_assert_eq!(
            machine_time_cost(minutes * Decimal::from(2), hourly),
            machine_time_cost(minutes, hourly) * Decimal::from(2)
        );
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_intake_example() {
        let input = intake(Decimal::new(1205, 1), Decimal::from(42));
        assert_eq!(input.total_cost(), Some(Decimal::from(5061)));
    }

    #[test]
    fn test_intake_rejects_oversized_quantity() {
        let input = intake(Decimal::MAX, Decimal::from(2));
        let fields = field_errors(&input.validate().unwrap_err());
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "quantity_received");
        assert_eq!(fields[0].message, "Must be less than 10000000000");
        assert_eq!(input.total_cost(), None);
    }

    #[test]
    fn test_intake_rejects_zero_quantity() {
        let errors = intake(Decimal::ZERO, Decimal::from(10)).validate().unwrap_err();
        let fields = field_errors(&errors);
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].field, "quantity_received");
        assert_eq!(fields[0].message, "Must be greater than zero");
    }

    #[test]
    fn test_intake_requires_material() {
        let input = StockIntakeInput {
            quantity_received: Decimal::ONE,
            ..Default::default()
        };
        let fields = field_errors(&input.validate().unwrap_err());
        assert_eq!(fields[0].field, "raw_material_id");
    }

    #[test]
    fn test_machine_time_cost() {
        // 90 minutes at 600/hour
        assert_eq!(
            machine_time_cost(Decimal::from(90), Decimal::from(600)),
            Decimal::from(900)
        );
    }
}
