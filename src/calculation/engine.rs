//! The staffing engine facade.
//!
//! [`StaffingEngine`] wires the pipeline together for each train family:
//!
//! ```text
//! records -> deduplicate -> extract -> match -> per-train -> aggregate
//! ```
//!
//! Every call is pure with respect to its inputs and returns a fresh result
//! tree; nothing is cached between calls.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EngineSettings, StaffingStandard};
use crate::models::{
    OtherProductionUnitResult, TrainFamily, TrainRecord, TrainStaffingResult, UnitStaffingResult,
    UnmatchedTrain,
};

use super::conventional_matcher::{
    ConventionalRulebook, diagnose_conventional, match_conventional_rule,
};
use super::deduplication::deduplicate_by_sequence;
use super::field_extractor::extract_attributes;
use super::high_speed_matcher::{diagnose_high_speed, match_high_speed_rule};
use super::other_production::{MainProductionTotals, calculate_other_production};
use super::train_staffing::{
    adjustment_factor, calculate_conventional_train, calculate_high_speed_train,
    unmatched_train_result,
};
use super::uncovered::{UncoveredRuleSuggestion, analyze_uncovered};
use super::unit_aggregation::{UnitScope, aggregate_unit, resolve_reserve_rate};

/// Results of all three families for one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllStaffingResults {
    /// High-speed staffing.
    pub high_speed: UnitStaffingResult,
    /// Conventional staffing.
    pub conventional: UnitStaffingResult,
    /// Derived staffing computed from the two totals above.
    pub other_production: OtherProductionUnitResult,
    /// Missing rules across both train families, high-speed first.
    pub uncovered_rules: Vec<UncoveredRuleSuggestion>,
}

/// Calculates crew staffing against a [`StaffingStandard`].
///
/// # Example
///
/// ```
/// use crew_staffing_engine::calculation::StaffingEngine;
/// use crew_staffing_engine::config::{
///     EngineSettings, HighSpeedConditions, HighSpeedRule, HighSpeedStaffing, StaffingStandard,
/// };
/// use crew_staffing_engine::models::TrainRecord;
/// use rust_decimal::Decimal;
///
/// let mut standard = StaffingStandard::empty("demo");
/// standard.standard_work_hours = Some(Decimal::from(174));
/// standard.high_speed_rules.push(HighSpeedRule {
///     id: "hs-8".to_string(),
///     name: "8-car".to_string(),
///     conditions: HighSpeedConditions {
///         formations: vec!["8编组".to_string()],
///         running_time: Default::default(),
///     },
///     staffing: HighSpeedStaffing {
///         conductor: Decimal::ONE,
///         train_attendant: Decimal::from(4),
///         business_class_attendant: Decimal::ZERO,
///     },
/// });
///
/// let engine = StaffingEngine::new(EngineSettings::default());
/// let records = vec![TrainRecord::new().with("编组", "8编组").with("组数", 1)];
/// let result = engine.calculate_high_speed(&standard, "depot-1", &records);
///
/// assert_eq!(result.train_results[0].display.total, 5);
/// assert_eq!(result.base_total_staff, 5);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaffingEngine {
    settings: EngineSettings,
}

impl StaffingEngine {
    /// Creates an engine with the given constants.
    pub fn new(settings: EngineSettings) -> Self {
        Self { settings }
    }

    /// Returns the engine's constants.
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Calculates high-speed staffing for one unit.
    pub fn calculate_high_speed(
        &self,
        standard: &StaffingStandard,
        unit: &str,
        records: &[TrainRecord],
    ) -> UnitStaffingResult {
        let factor = adjustment_factor(&self.settings, standard);
        let rules = &standard.high_speed_rules;

        self.calculate_family(standard, unit, records, TrainFamily::HighSpeed, |record| {
            let attrs = extract_attributes(record);
            match match_high_speed_rule(&attrs, rules) {
                Some(matched) => (calculate_high_speed_train(&attrs, &matched, factor), None),
                None => {
                    let (reason, action) = diagnose_high_speed(&attrs, rules);
                    (
                        unmatched_train_result(&attrs, &reason, factor),
                        Some((reason, action)),
                    )
                }
            }
        })
    }

    /// Calculates conventional staffing for one unit.
    pub fn calculate_conventional(
        &self,
        standard: &StaffingStandard,
        unit: &str,
        records: &[TrainRecord],
    ) -> UnitStaffingResult {
        let rulebook = ConventionalRulebook::from_standard(standard);

        self.calculate_family(standard, unit, records, TrainFamily::Conventional, |record| {
            let attrs = extract_attributes(record);
            match match_conventional_rule(&attrs, &rulebook) {
                Some(matched) => (calculate_conventional_train(&attrs, &matched), None),
                None => {
                    let (reason, action) = diagnose_conventional(&attrs, &rulebook);
                    (
                        unmatched_train_result(&attrs, &reason, Decimal::ONE),
                        Some((reason, action)),
                    )
                }
            }
        })
    }

    /// Calculates derived staffing from the two main-production results.
    pub fn calculate_other_production(
        &self,
        standard: &StaffingStandard,
        unit: &str,
        high_speed: &UnitStaffingResult,
        conventional: &UnitStaffingResult,
    ) -> OtherProductionUnitResult {
        let totals = MainProductionTotals::from_results(high_speed, conventional);
        calculate_other_production(&self.settings, standard, unit, totals)
    }

    /// Runs every family in dependency order: high-speed and conventional,
    /// then the derived family on their totals.
    pub fn calculate_all(
        &self,
        standard: &StaffingStandard,
        unit: &str,
        high_speed_records: &[TrainRecord],
        conventional_records: &[TrainRecord],
    ) -> AllStaffingResults {
        let high_speed = self.calculate_high_speed(standard, unit, high_speed_records);
        let conventional = self.calculate_conventional(standard, unit, conventional_records);
        let other_production =
            self.calculate_other_production(standard, unit, &high_speed, &conventional);

        let mut uncovered_rules = analyze_uncovered(&high_speed);
        uncovered_rules.extend(analyze_uncovered(&conventional));

        AllStaffingResults {
            high_speed,
            conventional,
            other_production,
            uncovered_rules,
        }
    }

    /// Shared pipeline of the per-train families. `calculate` returns the
    /// train result and, for an unmatched train, `(reason, suggested_action)`.
    fn calculate_family<F>(
        &self,
        standard: &StaffingStandard,
        unit: &str,
        records: &[TrainRecord],
        family: TrainFamily,
        mut calculate: F,
    ) -> UnitStaffingResult
    where
        F: FnMut(&TrainRecord) -> (TrainStaffingResult, Option<(String, String)>),
    {
        let workings = deduplicate_by_sequence(records);
        debug!(
            family = %family,
            rows = records.len(),
            workings = workings.len(),
            duplicate_rows_merged = records.len() - workings.len(),
            "Records grouped by sequence key"
        );
        let mut train_results = Vec::with_capacity(workings.len());
        let mut unmatched_trains = Vec::new();

        for working in &workings {
            let (mut result, diagnosis) = calculate(working.representative);
            result.sequence = working.key.clone();
            if let Some((reason, suggested_action)) = diagnosis {
                unmatched_trains.push(UnmatchedTrain {
                    train_data: working.representative.clone(),
                    reason,
                    suggested_action,
                });
            }
            train_results.push(result);
        }

        let scope = UnitScope {
            bureau: &standard.bureau,
            unit,
            family,
            reserve_rate: resolve_reserve_rate(&self.settings, standard, unit, family),
        };
        aggregate_unit(scope, train_results, unmatched_trains)
    }
}
