//! Proportional rounding of exact crew breakdowns for display.
//!
//! Each role gets its share of the displayed total, rounded half away from
//! zero. The rounding difference is then moved one person at a time onto the
//! role that currently holds the most people (ties go to the earliest
//! [`CrewRole`]), so the displayed roles always add up to the displayed total.

use std::collections::BTreeMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::models::{CrewRole, DisplayStaffing, ExactStaffing};

/// Rounds an exact breakdown to whole people, with `total = ceil(exact.total)`.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::display_from_exact;
/// use crew_staffing_engine::models::{CrewRole, ExactStaffing};
/// use rust_decimal::Decimal;
/// use std::collections::BTreeMap;
///
/// let mut roles = BTreeMap::new();
/// roles.insert(CrewRole::Conductor, Decimal::new(958, 3));
/// roles.insert(CrewRole::TrainAttendant, Decimal::new(3830, 3));
/// let display = display_from_exact(&ExactStaffing::from_roles(roles));
///
/// assert_eq!(display.total, 5);
/// assert_eq!(display.role(CrewRole::Conductor), 1);
/// assert_eq!(display.role(CrewRole::TrainAttendant), 4);
/// ```
pub fn display_from_exact(exact: &ExactStaffing) -> DisplayStaffing {
    let total = exact.total.max(Decimal::ZERO).ceil().to_u32().unwrap_or(u32::MAX);
    distribute_display(exact, total)
}

/// Splits `display_total` across the roles of `exact` in proportion to their
/// exact counts.
pub fn distribute_display(exact: &ExactStaffing, display_total: u32) -> DisplayStaffing {
    if exact.total <= Decimal::ZERO || display_total == 0 {
        return DisplayStaffing {
            roles: exact.roles.keys().map(|role| (*role, 0)).collect(),
            total: 0,
        };
    }

    let target = Decimal::from(display_total);
    let mut roles: BTreeMap<CrewRole, i64> = exact
        .roles
        .iter()
        .map(|(role, value)| {
            let share = (*value / exact.total * target)
                .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
            (*role, share.to_i64().unwrap_or(0).max(0))
        })
        .collect();

    let assigned: i64 = roles.values().sum();
    let mut difference = i64::from(display_total) - assigned;
    while difference != 0 {
        let Some(role) = largest_role(&roles) else {
            break;
        };
        let step = difference.signum();
        if let Some(count) = roles.get_mut(&role) {
            *count += step;
        }
        difference -= step;
    }

    DisplayStaffing {
        roles: roles
            .into_iter()
            .map(|(role, count)| (role, u32::try_from(count).unwrap_or(0)))
            .collect(),
        total: display_total,
    }
}

/// The role with the highest count; the earliest role wins a tie.
fn largest_role(roles: &BTreeMap<CrewRole, i64>) -> Option<CrewRole> {
    roles
        .iter()
        .fold(None, |best: Option<(CrewRole, i64)>, (role, count)| match best {
            Some((_, best_count)) if best_count >= *count => best,
            _ => Some((*role, *count)),
        })
        .map(|(role, _)| role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn exact(pairs: &[(CrewRole, &str)]) -> ExactStaffing {
        ExactStaffing::from_roles(pairs.iter().map(|(r, v)| (*r, dec(v))).collect())
    }

    #[test]
    fn test_proportional_split_needs_no_reconciliation() {
        let display = display_from_exact(&exact(&[
            (CrewRole::Conductor, "2"),
            (CrewRole::TrainAttendant, "8"),
        ]));
        assert_eq!(display.total, 10);
        assert_eq!(display.role(CrewRole::Conductor), 2);
        assert_eq!(display.role(CrewRole::TrainAttendant), 8);
    }

    #[test]
    fn test_surplus_is_removed_from_largest_role() {
        // Shares of 2: 0.67, 0.67, 0.67 -> 1, 1, 1 = 3; one too many.
        let display = distribute_display(
            &exact(&[
                (CrewRole::TrainAttendant, "1"),
                (CrewRole::Conductor, "1"),
                (CrewRole::Broadcaster, "1"),
            ]),
            2,
        );
        assert_eq!(display.total, 2);
        assert_eq!(display.role(CrewRole::TrainAttendant), 0);
        assert_eq!(display.role(CrewRole::Conductor), 1);
        assert_eq!(display.role(CrewRole::Broadcaster), 1);
    }

    #[test]
    fn test_shortfall_goes_to_attendants_on_tie() {
        // Shares of 4: 1.33, 1.33, 1.33 -> 1, 1, 1 = 3; one short.
        let display = distribute_display(
            &exact(&[
                (CrewRole::BusinessClassAttendant, "1"),
                (CrewRole::Conductor, "1"),
                (CrewRole::TrainAttendant, "1"),
            ]),
            4,
        );
        assert_eq!(display.role(CrewRole::TrainAttendant), 2);
        assert_eq!(display.role(CrewRole::Conductor), 1);
        assert_eq!(display.role(CrewRole::BusinessClassAttendant), 1);
    }

    #[test]
    fn test_tie_prefers_conductor_over_specialty() {
        // Shares of 4: 1.33 each -> 1, 1, 1 = 3; one short.
        let display = distribute_display(
            &exact(&[
                (CrewRole::Broadcaster, "1"),
                (CrewRole::DiningCarStaff, "1"),
                (CrewRole::Conductor, "1"),
            ]),
            4,
        );
        assert_eq!(display.role(CrewRole::Conductor), 2);
        assert_eq!(display.role(CrewRole::DiningCarStaff), 1);
        assert_eq!(display.role(CrewRole::Broadcaster), 1);
    }

    #[test]
    fn test_many_half_shares_never_go_negative() {
        let display = distribute_display(
            &exact(&[
                (CrewRole::TrainAttendant, "0.5"),
                (CrewRole::Conductor, "0.5"),
                (CrewRole::DiningCarStaff, "0.5"),
                (CrewRole::Broadcaster, "0.5"),
            ]),
            2,
        );
        assert_eq!(display.roles.values().sum::<u32>(), 2);
    }

    #[test]
    fn test_zero_total_is_all_zero() {
        let display = display_from_exact(&exact(&[(CrewRole::Conductor, "0")]));
        assert_eq!(display.total, 0);
        assert_eq!(display.role(CrewRole::Conductor), 0);
    }

    proptest! {
        #[test]
        fn prop_display_roles_sum_to_total(
            values in prop::collection::vec(0u32..5000, 1..9),
            numerator in 1u32..2000,
        ) {
            let all_roles = [
                CrewRole::TrainAttendant,
                CrewRole::SeatCarAttendant,
                CrewRole::HardSleeperAttendant,
                CrewRole::SoftSleeperAttendant,
                CrewRole::Conductor,
                CrewRole::BusinessClassAttendant,
                CrewRole::DiningCarStaff,
                CrewRole::BaggageStaff,
                CrewRole::Broadcaster,
            ];
            let factor = Decimal::from(numerator) / Decimal::from(997);
            let roles = values
                .iter()
                .zip(all_roles)
                .map(|(v, role)| (role, Decimal::from(*v) / Decimal::from(100) * factor))
                .collect();
            let exact = ExactStaffing::from_roles(roles);
            let display = display_from_exact(&exact);

            prop_assert_eq!(display.roles.values().sum::<u32>(), display.total);
            prop_assert_eq!(Decimal::from(display.total), exact.total.ceil());
        }
    }
}
