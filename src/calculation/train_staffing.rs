//! Per-train staffing calculation.
//!
//! This module turns a matched rule and a train's attributes into a
//! [`TrainStaffingResult`] holding both the exact (fractional) crew breakdown
//! that aggregation sums and the reconciled whole-person breakdown for display.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::{ConventionalRule, EngineSettings, HighSpeedRule, StaffingStandard};
use crate::models::{
    CarType, CrewRole, ExactStaffing, MatchResult, TrainAttributes, TrainStaffingResult,
};

use super::ratio_allocation::allocate_by_ratio;
use super::remainder_distribution::display_from_exact;

/// Returns the work-hour adjustment factor of a standard.
///
/// `factor = reference_standard_hours / standard.standard_work_hours`, or 1 if
/// either value is missing or not positive.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::adjustment_factor;
/// use crew_staffing_engine::config::{EngineSettings, StaffingStandard};
/// use rust_decimal::Decimal;
///
/// let mut standard = StaffingStandard::empty("demo");
/// standard.standard_work_hours = Some(Decimal::new(1666, 1));
/// assert_eq!(adjustment_factor(&EngineSettings::default(), &standard), Decimal::ONE);
/// ```
pub fn adjustment_factor(settings: &EngineSettings, standard: &StaffingStandard) -> Decimal {
    let reference = settings.reference_standard_hours;
    match standard.standard_work_hours {
        Some(hours) if hours > Decimal::ZERO && reference > Decimal::ZERO => reference / hours,
        _ => {
            warn!(
                bureau = %standard.bureau,
                "Standard work hours missing, using adjustment factor 1"
            );
            Decimal::ONE
        }
    }
}

/// Reads the group count, defaulting to one group with a warning.
fn group_count_or_default(attrs: &TrainAttributes, warnings: &mut Vec<String>) -> Decimal {
    match attrs.group_count {
        Some(count) => count,
        None => {
            warnings.push("Group count missing, assuming 1 group".to_string());
            Decimal::ONE
        }
    }
}

fn sequence_of(attrs: &TrainAttributes) -> String {
    attrs.sequence.clone().unwrap_or_default()
}

fn add_role(roles: &mut BTreeMap<CrewRole, Decimal>, role: CrewRole, per_group: Decimal, groups: Decimal) {
    if per_group > Decimal::ZERO {
        *roles.entry(role).or_insert(Decimal::ZERO) += per_group * groups;
    }
}

/// Calculates staffing for one high-speed train.
///
/// The group count is scaled by `factor` before allocation. A rule asking for
/// business-class attendants on a train without a business-class car staffs
/// none and records a warning.
pub fn calculate_high_speed_train(
    attrs: &TrainAttributes,
    matched: &MatchResult<'_, HighSpeedRule>,
    factor: Decimal,
) -> TrainStaffingResult {
    let rule = matched.rule;
    let mut warnings = Vec::new();

    let groups = group_count_or_default(attrs, &mut warnings);
    let effective_group_count = groups * factor;

    let mut business = rule.staffing.business_class_attendant;
    if business > Decimal::ZERO && !attrs.has_business_class() {
        warnings.push(format!(
            "Rule '{}' staffs {} business-class attendant(s) but the train has no business-class car; using 0",
            rule.id,
            business.normalize()
        ));
        business = Decimal::ZERO;
    }

    let mut roles = BTreeMap::new();
    add_role(&mut roles, CrewRole::Conductor, rule.staffing.conductor, effective_group_count);
    add_role(
        &mut roles,
        CrewRole::TrainAttendant,
        rule.staffing.train_attendant,
        effective_group_count,
    );
    add_role(
        &mut roles,
        CrewRole::BusinessClassAttendant,
        business,
        effective_group_count,
    );

    let exact = ExactStaffing::from_roles(roles);
    let display = display_from_exact(&exact);

    TrainStaffingResult {
        sequence: sequence_of(attrs),
        train_number: attrs.train_number.clone(),
        is_matched: true,
        rule_id: Some(rule.id.clone()),
        rule_name: Some(rule.name.clone()),
        match_tier: Some(matched.tier),
        matched_conditions: matched.matched_conditions.clone(),
        effective_group_count,
        adjustment_factor: factor,
        exact,
        display,
        warnings,
    }
}

fn role_for_car_type(car_type: CarType) -> CrewRole {
    match car_type {
        CarType::Seat => CrewRole::SeatCarAttendant,
        CarType::HardSleeper => CrewRole::HardSleeperAttendant,
        CarType::SoftSleeper => CrewRole::SoftSleeperAttendant,
        CarType::Dining => CrewRole::DiningCarStaff,
        CarType::Baggage => CrewRole::BaggageStaff,
    }
}

/// Calculates staffing for one conventional train.
///
/// Fixed roles and car-type ratio allocations are per group and multiplied by
/// the train's group count. Conventional trains are not adjusted for work
/// hours, so the factor is always 1.
pub fn calculate_conventional_train(
    attrs: &TrainAttributes,
    matched: &MatchResult<'_, ConventionalRule>,
) -> TrainStaffingResult {
    let rule = matched.rule;
    let mut warnings = Vec::new();
    let groups = group_count_or_default(attrs, &mut warnings);

    let mut roles = BTreeMap::new();
    add_role(&mut roles, CrewRole::Conductor, rule.staffing.conductor, groups);
    add_role(&mut roles, CrewRole::Broadcaster, rule.staffing.broadcaster, groups);
    for ratio in &rule.staffing.car_ratios {
        let allocation = allocate_by_ratio(attrs.car_counts.get(ratio.car_type), ratio);
        if !allocation.parsed {
            warnings.push(format!("Rule '{}': {}", rule.id, allocation.reasoning));
        }
        add_role(&mut roles, role_for_car_type(ratio.car_type), allocation.staff, groups);
    }

    let exact = ExactStaffing::from_roles(roles);
    let display = display_from_exact(&exact);

    TrainStaffingResult {
        sequence: sequence_of(attrs),
        train_number: attrs.train_number.clone(),
        is_matched: true,
        rule_id: Some(rule.id.clone()),
        rule_name: Some(rule.name.clone()),
        match_tier: Some(matched.tier),
        matched_conditions: matched.matched_conditions.clone(),
        effective_group_count: groups,
        adjustment_factor: Decimal::ONE,
        exact,
        display,
        warnings,
    }
}

/// Builds the all-zero result of a train no rule covered.
pub fn unmatched_train_result(
    attrs: &TrainAttributes,
    reason: &str,
    factor: Decimal,
) -> TrainStaffingResult {
    TrainStaffingResult {
        sequence: sequence_of(attrs),
        train_number: attrs.train_number.clone(),
        is_matched: false,
        rule_id: None,
        rule_name: None,
        match_tier: None,
        matched_conditions: Vec::new(),
        effective_group_count: Decimal::ZERO,
        adjustment_factor: factor,
        exact: ExactStaffing::default(),
        display: Default::default(),
        warnings: vec![format!("No staffing rule matched: {}", reason)],
    }
}
