//! Calculation logic for the Crew Staffing Engine.
//!
//! This module contains the staffing pipeline: field extraction from loosely
//! typed schedule records, tiered rule matching for high-speed and
//! conventional trains, per-train crew calculation with car-type ratio
//! allocation and proportional rounding, sequence deduplication, unit
//! aggregation with reserve rates and coverage, derived "other production"
//! staffing, and uncovered-rule analysis.

mod conventional_matcher;
mod deduplication;
mod engine;
mod field_extractor;
mod high_speed_matcher;
mod other_production;
mod ratio_allocation;
mod remainder_distribution;
mod train_staffing;
mod uncovered;
mod unit_aggregation;

pub use conventional_matcher::{
    ConventionalRulebook, diagnose_conventional, match_conventional_rule,
};
pub use deduplication::{Working, deduplicate_by_sequence};
pub use engine::{AllStaffingResults, StaffingEngine};
pub use field_extractor::{
    BUSINESS_CLASS_ALIASES, END_TIME_ALIASES, FORMATION_ALIASES, FORMATION_DETAIL_ALIASES,
    FieldAccessor, GROUP_COUNT_ALIASES, INTERNATIONAL_ALIASES, RUNNING_TIME_ALIASES,
    SEQUENCE_ALIASES, START_TIME_ALIASES, TRAIN_NUMBER_ALIASES, TRAIN_TYPE_ALIASES,
    extract_attributes, extract_business_class_count, extract_car_counts, extract_formation,
    extract_group_count, extract_running_time, extract_sequence, extract_train_number,
    extract_train_type, has_business_class, is_international,
};
pub use high_speed_matcher::{diagnose_high_speed, match_high_speed_rule};
pub use other_production::{
    MAIN_PRODUCTION_ALIASES, MainProductionTotals, calculate_other_production, evaluate_rule,
    parse_formula, select_position_rules,
};
pub use ratio_allocation::{RatioAllocation, allocate_by_ratio, parse_ratio};
pub use remainder_distribution::{display_from_exact, distribute_display};
pub use train_staffing::{
    adjustment_factor, calculate_conventional_train, calculate_high_speed_train,
    unmatched_train_result,
};
pub use uncovered::{MAX_SAMPLE_TRAINS, UncoveredRuleSuggestion, analyze_uncovered};
pub use unit_aggregation::{
    ReserveTotals, UnitScope, aggregate_unit, apply_reserve, coverage_rate, resolve_reserve_rate,
};
