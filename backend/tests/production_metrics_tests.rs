//! Production metric tests
//!
//! Tests for the shop-floor calculations:
//! - OEE factors each lie in [0, 1] and OEE is their product
//! - Bottleneck ranking orders machines by utilisation, then downtime
//! - Scrap Pareto shares add up to 100%

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::metrics::{oee, pareto, rank_bottlenecks, MachineLoad, OeeInputs};
use uuid::Uuid;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// (planned, run, cycle seconds, total, scrap, rework) for one plausible run
fn run_strategy() -> impl Strategy<Value = OeeInputs> {
    (1i64..1_440, 1i64..180, 0i64..5_000)
        .prop_flat_map(|(planned, cycle, total)| {
            (
                Just(planned),
                0..=planned,
                Just(cycle),
                Just(total),
                0..=total,
            )
        })
        .prop_flat_map(|(planned, run, cycle, total, scrap)| {
            (
                Just((planned, run, cycle, total, scrap)),
                0..=(total - scrap),
            )
        })
        .prop_map(|((planned, run, cycle, total, scrap), rework)| {
            OeeInputs::for_run(
                Decimal::from(planned),
                Decimal::from(run),
                Decimal::from(cycle),
                Decimal::from(total),
                Decimal::from(scrap),
                Decimal::from(rework),
            )
        })
}

fn unit_interval(value: Decimal) -> bool {
    value >= Decimal::ZERO && value <= Decimal::ONE
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #[test]
    fn prop_oee_components_bounded(inputs in run_strategy()) {
        let result = oee(&inputs);
        prop_assert!(unit_interval(result.availability));
        prop_assert!(unit_interval(result.performance));
        prop_assert!(unit_interval(result.quality));
        prop_assert!(unit_interval(result.oee));
        prop_assert_eq!(
            result.oee,
            (result.availability * result.performance * result.quality).round_dp(4)
        );
    }

    /// Company OEE over many runs stays bounded too
    #[test]
    fn prop_aggregate_oee_bounded(runs in prop::collection::vec(run_strategy(), 1..12)) {
        let totals: OeeInputs = runs.iter().copied().sum();
        let planned: Decimal = runs.iter().map(|r| r.planned_minutes).sum();
        prop_assert_eq!(totals.planned_minutes, planned);

        let result = oee(&totals);
        prop_assert!(unit_interval(result.oee));
        prop_assert!(result.oee <= result.availability);
    }

    #[test]
    fn prop_bottlenecks_sorted(loads in prop::collection::vec((1i64..2_000, 0i64..2_000), 1..10)) {
        let machines: Vec<MachineLoad> = loads
            .into_iter()
            .enumerate()
            .map(|(i, (planned, run))| {
                MachineLoad::new(
                    Uuid::new_v4(),
                    format!("M-{:02}", i),
                    Decimal::from(planned),
                    Decimal::from(run.min(planned)),
                )
            })
            .collect();

        let ranked = rank_bottlenecks(machines);
        for (i, pair) in ranked.windows(2).enumerate() {
            prop_assert_eq!(pair[0].rank, i + 1);
            prop_assert!(pair[0].utilisation >= pair[1].utilisation);
            if pair[0].utilisation == pair[1].utilisation {
                prop_assert!(pair[0].downtime_minutes >= pair[1].downtime_minutes);
            }
        }
    }

    #[test]
    fn prop_pareto_cumulative(quantities in prop::collection::vec(1i64..10_000, 1..8)) {
        let totals: Vec<(String, Decimal)> = quantities
            .iter()
            .enumerate()
            .map(|(i, q)| (format!("Reason {}", i), Decimal::from(*q)))
            .collect();

        let entries = pareto(totals);
        prop_assert_eq!(entries.len(), quantities.len());
        for pair in entries.windows(2) {
            prop_assert!(pair[0].quantity >= pair[1].quantity);
            prop_assert!(pair[0].cumulative_percent <= pair[1].cumulative_percent);
        }
        prop_assert_eq!(
            entries.last().map(|e| e.cumulative_percent),
            Some(Decimal::ONE_HUNDRED.round_dp(2))
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
    fn test_oee_reference_shift() {
        // 480 planned, 420 run, 30 s cycle, 800 made, 20 scrap, 10 rework
        let inputs = OeeInputs::for_run(
            Decimal::from(480),
            Decimal::from(420),
            Decimal::from(30),
            Decimal::from(800),
            Decimal::from(20),
            Decimal::from(10),
        );
        let result = oee(&inputs);
        assert_eq!(result.availability, Decimal::new(875, 3));
        assert_eq!(result.performance, Decimal::new(9524, 4));
        assert_eq!(result.quality, Decimal::new(9625, 4));
        assert_eq!(inputs.good_output, Decimal::from(770));
    }

    #[test]
    fn test_oee_zero_denominators() {
        let result = oee(&OeeInputs::default());
        assert_eq!(result.availability, Decimal::ZERO);
        assert_eq!(result.performance, Decimal::ZERO);
        assert_eq!(result.quality, Decimal::ZERO);
        assert_eq!(result.oee, Decimal::ZERO);
    }

    #[test]
    fn test_pareto_skips_empty_reasons() {
        let entries = pareto(vec![
            ("Porosity".to_string(), Decimal::from(30)),
            ("Cold shut".to_string(), Decimal::ZERO),
            ("Blowholes".to_string(), Decimal::from(70)),
        ]);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].reason, "Blowholes");
        assert_eq!(entries[0].share_percent, Decimal::from(70));
        assert_eq!(entries[1].cumulative_percent, Decimal::from(100));
    }
}
