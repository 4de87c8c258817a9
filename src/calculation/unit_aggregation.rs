//! Unit-level aggregation.
//!
//! Per-train exact totals are summed first and rounded once:
//!
//! ```text
//! base_total_staff = ceil(Σ exact)
//! total_staff      = ceil(Σ exact × (1 + reserve_rate / 100))
//! ```
//!
//! Rounding each train and then summing gives a different (wrong) answer, so
//! display values never feed back into a total.

use std::collections::BTreeMap;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{EngineSettings, StaffingStandard};
use crate::models::{
    CrewRole, ExactStaffing, RoleBreakdown, TrainFamily, TrainStaffingResult, UnitStaffingResult,
    UnmatchedTrain,
};

use super::remainder_distribution::distribute_display;

/// `ceil(value)` as a headcount; negative values count as zero.
pub(crate) fn ceil_headcount(value: Decimal) -> u32 {
    value.max(Decimal::ZERO).ceil().to_u32().unwrap_or(u32::MAX)
}

/// Resolves the reserve rate (percent) of a unit.
///
/// Lookup order: the unit's own entry, then the standard's family-wide rate,
/// then the engine default for the family.
pub fn resolve_reserve_rate(
    settings: &EngineSettings,
    standard: &StaffingStandard,
    unit: &str,
    family: TrainFamily,
) -> Decimal {
    if let Some(rate) = standard.reserve_rates.lookup(unit, family) {
        return rate;
    }
    let default = match family {
        TrainFamily::OtherProduction => settings.default_other_reserve_rate,
        TrainFamily::HighSpeed | TrainFamily::Conventional => settings.default_main_reserve_rate,
    };
    warn!(
        bureau = %standard.bureau,
        unit = %unit,
        family = %family,
        rate = %default,
        "Reserve rate not configured, using default"
    );
    default
}

/// Base and reserve-adjusted headcounts for an exact sum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReserveTotals {
    /// `ceil(exact)`.
    pub base_total_staff: u32,
    /// `ceil(exact × (1 + rate / 100))`.
    pub total_staff: u32,
}

/// Applies a reserve rate (percent) to an exact staff sum, rounding once.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::apply_reserve;
/// use rust_decimal::Decimal;
///
/// // 10.2 exact staff with an 8% reserve: ceil(11.016) = 12
/// let totals = apply_reserve(Decimal::new(102, 1), Decimal::from(8));
/// assert_eq!(totals.base_total_staff, 11);
/// assert_eq!(totals.total_staff, 12);
/// ```
pub fn apply_reserve(exact_total: Decimal, reserve_rate: Decimal) -> ReserveTotals {
    let uplift = Decimal::ONE + reserve_rate / Decimal::ONE_HUNDRED;
    ReserveTotals {
        base_total_staff: ceil_headcount(exact_total),
        total_staff: ceil_headcount(exact_total * uplift),
    }
}

/// Matched share of workings in percent, rounded to two places.
///
/// An empty unit is fully covered.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::coverage_rate;
/// use rust_decimal::Decimal;
///
/// assert_eq!(coverage_rate(2, 3), Decimal::new(6667, 2));
/// assert_eq!(coverage_rate(0, 0), Decimal::ONE_HUNDRED);
/// ```
pub fn coverage_rate(matched_count: usize, total_groups: usize) -> Decimal {
    if total_groups == 0 {
        return Decimal::ONE_HUNDRED;
    }
    (Decimal::from(matched_count) / Decimal::from(total_groups) * Decimal::ONE_HUNDRED).round_dp(2)
}

/// Identifies the unit and family an aggregation is for.
#[derive(Debug, Clone, Copy)]
pub struct UnitScope<'a> {
    /// Bureau whose standard was applied.
    pub bureau: &'a str,
    /// Unit being staffed.
    pub unit: &'a str,
    /// Train family.
    pub family: TrainFamily,
    /// Reserve rate in percent.
    pub reserve_rate: Decimal,
}

/// Builds the unit result from one result per working.
///
/// `train_results` must hold exactly one entry per distinct sequence key;
/// its length is the coverage denominator.
pub fn aggregate_unit(
    scope: UnitScope<'_>,
    train_results: Vec<TrainStaffingResult>,
    unmatched_trains: Vec<UnmatchedTrain>,
) -> UnitStaffingResult {
    let total_groups = train_results.len();
    let matched: Vec<&TrainStaffingResult> =
        train_results.iter().filter(|r| r.is_matched).collect();
    let matched_count = matched.len();

    let exact_base_total_staff: Decimal = matched.iter().map(|r| r.exact.total).sum();
    let totals = apply_reserve(exact_base_total_staff, scope.reserve_rate);

    let mut role_sums: BTreeMap<CrewRole, Decimal> = BTreeMap::new();
    for result in &matched {
        for (role, value) in &result.exact.roles {
            *role_sums.entry(*role).or_insert(Decimal::ZERO) += *value;
        }
    }
    let exact_roles = ExactStaffing::from_roles(role_sums);
    let display_roles = distribute_display(&exact_roles, totals.base_total_staff);
    let role_breakdown = exact_roles
        .roles
        .iter()
        .map(|(role, exact)| RoleBreakdown {
            role: *role,
            exact: *exact,
            display: display_roles.role(*role),
        })
        .collect();

    let coverage = coverage_rate(matched_count, total_groups);

    info!(
        bureau = %scope.bureau,
        unit = %scope.unit,
        family = %scope.family,
        total_groups,
        matched_count,
        coverage_rate = %coverage,
        total_staff = totals.total_staff,
        "Unit staffing calculated"
    );

    UnitStaffingResult {
        calculation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        bureau: scope.bureau.to_string(),
        unit: scope.unit.to_string(),
        family: scope.family,
        total_groups,
        matched_count,
        unmatched_count: total_groups - matched_count,
        exact_base_total_staff,
        base_total_staff: totals.base_total_staff,
        reserve_rate: scope.reserve_rate,
        total_staff: totals.total_staff,
        coverage_rate: coverage,
        role_breakdown,
        train_results,
        unmatched_trains,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::display_from_exact;
    use crate::config::UnitReserveRates;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn scope(reserve_rate: &str) -> UnitScope<'static> {
        UnitScope {
            bureau: "beijing",
            unit: "depot-1",
            family: TrainFamily::HighSpeed,
            reserve_rate: dec(reserve_rate),
        }
    }

    fn train(sequence: &str, conductor: Decimal, attendant: Decimal) -> TrainStaffingResult {
        let mut roles = BTreeMap::new();
        roles.insert(CrewRole::Conductor, conductor);
        roles.insert(CrewRole::TrainAttendant, attendant);
        let exact = ExactStaffing::from_roles(roles);
        let display = display_from_exact(&exact);
        TrainStaffingResult {
            sequence: sequence.to_string(),
            train_number: None,
            is_matched: true,
            rule_id: Some("hs-8".to_string()),
            rule_name: None,
            match_tier: None,
            matched_conditions: vec![],
            effective_group_count: Decimal::ONE,
            adjustment_factor: Decimal::ONE,
            exact,
            display,
            warnings: vec![],
        }
    }

    fn unmatched(sequence: &str) -> TrainStaffingResult {
        TrainStaffingResult {
            is_matched: false,
            rule_id: None,
            exact: ExactStaffing::default(),
            display: Default::default(),
            ..train(sequence, Decimal::ZERO, Decimal::ZERO)
        }
    }

    #[test]
    fn test_rounds_once_after_summing() {
        // Each train needs 1.3 people. Rounding per train would give 2 + 2 + 2 = 6.
        let trains = (1..=3)
            .map(|i| train(&i.to_string(), dec("0.3"), dec("1")))
            .collect::<Vec<_>>();
        let per_train_rounded: u32 = trains.iter().map(|t| t.display.total).sum();

        let result = aggregate_unit(scope("0"), trains, vec![]);

        assert_eq!(result.exact_base_total_staff, dec("3.9"));
        assert_eq!(result.base_total_staff, 4);
        assert_eq!(result.total_staff, 4);
        assert_eq!(per_train_rounded, 6);
        assert_ne!(per_train_rounded, result.total_staff);
    }

    #[test]
    fn test_reserve_applies_to_exact_sum() {
        // ceil(9.25 * 1.08) = ceil(9.99) = 10, whereas ceil(ceil(9.25) * 1.08) = 11.
        let trains = vec![train("1", dec("1.25"), dec("8"))];
        let result = aggregate_unit(scope("8"), trains, vec![]);

        assert_eq!(result.base_total_staff, 10);
        assert_eq!(result.total_staff, 10);
    }

    #[test]
    fn test_coverage_counts_workings() {
        let trains = vec![
            train("1", dec("1"), dec("4")),
            unmatched("2"),
            train("3", dec("1"), dec("4")),
        ];
        let result = aggregate_unit(scope("8"), trains, vec![]);

        assert_eq!(result.total_groups, 3);
        assert_eq!(result.matched_count, 2);
        assert_eq!(result.unmatched_count, 1);
        assert_eq!(result.coverage_rate, dec("66.67"));
    }

    #[test]
    fn test_empty_unit_is_fully_covered() {
        let result = aggregate_unit(scope("8"), vec![], vec![]);

        assert_eq!(result.coverage_rate, dec("100"));
        assert_eq!(result.total_staff, 0);
        assert_eq!(result.base_total_staff, 0);
        assert!(result.role_breakdown.is_empty());
    }

    #[test]
    fn test_role_breakdown_sums_to_base_total() {
        let trains = vec![
            train("1", dec("0.958"), dec("3.83")),
            train("2", dec("0.958"), dec("3.83")),
        ];
        let result = aggregate_unit(scope("8"), trains, vec![]);

        let displayed: u32 = result.role_breakdown.iter().map(|r| r.display).sum();
        assert_eq!(result.base_total_staff, 10);
        assert_eq!(displayed, 10);
        let conductor = result
            .role_breakdown
            .iter()
            .find(|r| r.role == CrewRole::Conductor)
            .unwrap();
        assert_eq!(conductor.exact, dec("1.916"));
        assert_eq!(conductor.display, 2);
    }

    #[test]
    fn test_resolve_reserve_rate_prefers_unit_entry() {
        let mut standard = StaffingStandard::empty("beijing");
        standard.reserve_rates.main_production = Some(dec("9"));
        standard.reserve_rates.units.insert(
            "depot-1".to_string(),
            UnitReserveRates {
                main_production: Some(dec("12")),
                other_production: None,
            },
        );
        let settings = EngineSettings::default();

        assert_eq!(
            resolve_reserve_rate(&settings, &standard, "depot-1", TrainFamily::HighSpeed),
            dec("12")
        );
        assert_eq!(
            resolve_reserve_rate(&settings, &standard, "depot-2", TrainFamily::Conventional),
            dec("9")
        );
        assert_eq!(
            resolve_reserve_rate(&settings, &standard, "depot-2", TrainFamily::OtherProduction),
            dec("5")
        );
    }

    #[test]
    fn test_resolve_reserve_rate_defaults_main_production() {
        let standard = StaffingStandard::empty("beijing");
        let rate = resolve_reserve_rate(
            &EngineSettings::default(),
            &standard,
            "depot-1",
            TrainFamily::HighSpeed,
        );
        assert_eq!(rate, dec("8"));
    }

    proptest! {
        #[test]
        fn prop_total_staff_is_order_independent(
            values in prop::collection::vec((0u32..500, 0u32..2000), 0..30),
            rate in 0u32..20,
        ) {
            let trains: Vec<_> = values
                .iter()
                .enumerate()
                .map(|(i, (c, a))| {
                    train(
                        &i.to_string(),
                        Decimal::new(i64::from(*c), 2),
                        Decimal::new(i64::from(*a), 3),
                    )
                })
                .collect();
            let mut reversed = trains.clone();
            reversed.reverse();
            let rate = Decimal::from(rate).to_string();

            let forward = aggregate_unit(scope(&rate), trains, vec![]);
            let backward = aggregate_unit(scope(&rate), reversed, vec![]);

            prop_assert_eq!(forward.total_staff, backward.total_staff);
            prop_assert_eq!(forward.base_total_staff, backward.base_total_staff);
            prop_assert_eq!(
                Decimal::from(forward.base_total_staff),
                forward.exact_base_total_staff.ceil()
            );
        }
    }
}
