//! Uncovered-rule analysis.
//!
//! Groups the unmatched trains of a unit result by the rule that would cover
//! them, so the most valuable missing rules can be added first.

use serde::{Deserialize, Serialize};

use crate::models::{TrainFamily, UnitStaffingResult};

use super::field_extractor::{extract_sequence, extract_train_number};

/// Maximum number of sample trains listed per suggestion.
pub const MAX_SAMPLE_TRAINS: usize = 5;

/// A missing rule and the trains it would cover.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UncoveredRuleSuggestion {
    /// Train family the rule belongs to.
    pub family: TrainFamily,
    /// The rule to add.
    pub suggested_action: String,
    /// Why the trains were not covered (from the first such train).
    pub reason: String,
    /// Number of unmatched workings the rule would cover.
    pub train_count: usize,
    /// Train numbers (or sequence keys) of up to five affected trains.
    pub sample_trains: Vec<String>,
}

/// Groups a unit result's unmatched trains by suggested action.
///
/// Suggestions are sorted by descending train count; equal counts keep the
/// order in which the action first appeared.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::{analyze_uncovered, StaffingEngine};
/// use crew_staffing_engine::config::{EngineSettings, StaffingStandard};
/// use crew_staffing_engine::models::TrainRecord;
///
/// let engine = StaffingEngine::new(EngineSettings::default());
/// let standard = StaffingStandard::empty("demo");
/// let records = vec![
///     TrainRecord::new().with("车次", "G1").with("编组", "8编组"),
///     TrainRecord::new().with("车次", "G2").with("编组", "8编组"),
/// ];
/// let result = engine.calculate_high_speed(&standard, "depot-1", &records);
///
/// let suggestions = analyze_uncovered(&result);
/// assert_eq!(suggestions.len(), 1);
/// assert_eq!(suggestions[0].train_count, 2);
/// assert_eq!(suggestions[0].sample_trains, vec!["G1", "G2"]);
/// ```
pub fn analyze_uncovered(result: &UnitStaffingResult) -> Vec<UncoveredRuleSuggestion> {
    let mut suggestions: Vec<UncoveredRuleSuggestion> = Vec::new();

    for unmatched in &result.unmatched_trains {
        let label = extract_train_number(&unmatched.train_data)
            .or_else(|| extract_sequence(&unmatched.train_data))
            .unwrap_or_else(|| "(unnamed)".to_string());

        match suggestions
            .iter_mut()
            .find(|s| s.suggested_action == unmatched.suggested_action)
        {
            Some(suggestion) => {
                suggestion.train_count += 1;
                if suggestion.sample_trains.len() < MAX_SAMPLE_TRAINS {
                    suggestion.sample_trains.push(label);
                }
            }
            None => suggestions.push(UncoveredRuleSuggestion {
                family: result.family,
                suggested_action: unmatched.suggested_action.clone(),
                reason: unmatched.reason.clone(),
                train_count: 1,
                sample_trains: vec![label],
            }),
        }
    }

    // Stable sort keeps first appearance among equal counts.
    suggestions.sort_by(|a, b| b.train_count.cmp(&a.train_count));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::StaffingEngine;
    use crate::config::{EngineSettings, StaffingStandard};
    use crate::models::TrainRecord;

    fn record(train_number: &str, formation: &str) -> TrainRecord {
        TrainRecord::new()
            .with("车次", train_number)
            .with("编组", formation)
    }

    #[test]
    fn test_groups_by_action_and_sorts_by_count() {
        let engine = StaffingEngine::new(EngineSettings::default());
        let standard = StaffingStandard::empty("demo");
        let records = vec![
            record("G1", "8编组"),
            record("G2", "16编组"),
            record("G3", "16编组"),
        ];
        let result = engine.calculate_high_speed(&standard, "depot-1", &records);
        let suggestions = analyze_uncovered(&result);

        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].train_count, 2);
        assert!(suggestions[0].suggested_action.contains("16编组"));
        assert_eq!(suggestions[0].family, TrainFamily::HighSpeed);
        assert_eq!(suggestions[1].sample_trains, vec!["G1"]);
    }

    #[test]
    fn test_ties_keep_first_appearance() {
        let engine = StaffingEngine::new(EngineSettings::default());
        let standard = StaffingStandard::empty("demo");
        let records = vec![record("G1", "16编组"), record("G2", "8编组")];
        let result = engine.calculate_high_speed(&standard, "depot-1", &records);
        let suggestions = analyze_uncovered(&result);

        assert!(suggestions[0].suggested_action.contains("16编组"));
        assert!(suggestions[1].suggested_action.contains("8编组"));
    }

    #[test]
    fn test_sample_trains_are_capped() {
        let engine = StaffingEngine::new(EngineSettings::default());
        let standard = StaffingStandard::empty("demo");
        let records: Vec<_> = (1..=8)
            .map(|i| record(&format!("G{}", i), "8编组"))
            .collect();
        let result = engine.calculate_high_speed(&standard, "depot-1", &records);
        let suggestions = analyze_uncovered(&result);

        assert_eq!(suggestions[0].train_count, 8);
        assert_eq!(suggestions[0].sample_trains.len(), MAX_SAMPLE_TRAINS);
    }

    #[test]
    fn test_fully_covered_unit_has_no_suggestions() {
        let engine = StaffingEngine::new(EngineSettings::default());
        let result = engine.calculate_high_speed(&StaffingStandard::empty("demo"), "depot-1", &[]);
        assert!(analyze_uncovered(&result).is_empty());
    }
}
