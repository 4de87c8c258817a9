//! Rule matching for high-speed trains.
//!
//! A high-speed rule matches on formation (case-insensitive, exact) and an
//! optional running-time range. Rules with a time range are tried before rules
//! without one, so an unbounded catch-all for a formation never shadows a
//! bounded rule that fits the train. Within each tier the first rule in
//! declaration order wins.

use tracing::debug;

use crate::config::HighSpeedRule;
use crate::models::{MatchResult, MatchTier, TrainAttributes};

type HighSpeedTier =
    for<'a> fn(&TrainAttributes, &'a [HighSpeedRule]) -> Option<MatchResult<'a, HighSpeedRule>>;

/// Tiers in priority order.
const TIERS: [HighSpeedTier; 2] = [bounded_time_match, unbounded_time_match];

/// Finds the best high-speed rule for a train.
///
/// Returns `None` if no rule covers the train's formation and running time.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::{extract_attributes, match_high_speed_rule};
/// use crew_staffing_engine::config::{HighSpeedConditions, HighSpeedRule, HighSpeedStaffing};
/// use crew_staffing_engine::models::TrainRecord;
///
/// let rules = vec![HighSpeedRule {
///     id: "hs-8".to_string(),
///     name: "8编组".to_string(),
///     conditions: HighSpeedConditions {
///         formations: vec!["8编组".to_string()],
///         running_time: Default::default(),
///     },
///     staffing: HighSpeedStaffing::default(),
/// }];
/// let attrs = extract_attributes(&TrainRecord::new().with("编组", "8编组"));
///
/// let matched = match_high_speed_rule(&attrs, &rules).unwrap();
/// assert_eq!(matched.rule.id, "hs-8");
/// ```
pub fn match_high_speed_rule<'a>(
    attrs: &TrainAttributes,
    rules: &'a [HighSpeedRule],
) -> Option<MatchResult<'a, HighSpeedRule>> {
    let result = TIERS.iter().find_map(|tier| tier(attrs, rules));
    if let Some(m) = &result {
        debug!(train = %attrs.label(), rule_id = %m.rule.id, tier = ?m.tier, "High-speed rule matched");
    }
    result
}

fn formation_matches(rule: &HighSpeedRule, formation: &str) -> bool {
    let formation = formation.trim();
    rule.conditions
        .formations
        .iter()
        .any(|f| f.trim().eq_ignore_ascii_case(formation))
}

/// Checks formation first and time second, failing on the first mismatch.
fn rule_matches(rule: &HighSpeedRule, attrs: &TrainAttributes) -> bool {
    let Some(formation) = attrs.formation.as_deref() else {
        return false;
    };
    if !formation_matches(rule, formation) {
        return false;
    }
    rule.conditions.running_time.contains(attrs.running_time_hours)
}

fn bounded_time_match<'a>(
    attrs: &TrainAttributes,
    rules: &'a [HighSpeedRule],
) -> Option<MatchResult<'a, HighSpeedRule>> {
    rules
        .iter()
        .filter(|r| !r.conditions.running_time.is_unbounded())
        .find(|r| rule_matches(r, attrs))
        .map(|rule| MatchResult {
            rule,
            tier: MatchTier::FullCondition,
            matched_conditions: vec![
                formation_condition(attrs),
                format!("running_time={}", rule.conditions.running_time.describe()),
            ],
        })
}

fn unbounded_time_match<'a>(
    attrs: &TrainAttributes,
    rules: &'a [HighSpeedRule],
) -> Option<MatchResult<'a, HighSpeedRule>> {
    rules
        .iter()
        .filter(|r| r.conditions.running_time.is_unbounded())
        .find(|r| rule_matches(r, attrs))
        .map(|rule| MatchResult {
            rule,
            tier: MatchTier::UnboundedTime,
            matched_conditions: vec![formation_condition(attrs)],
        })
}

fn formation_condition(attrs: &TrainAttributes) -> String {
    format!("formation={}", attrs.formation.as_deref().unwrap_or_default())
}

/// Explains why no high-speed rule matched and what rule would fix it.
///
/// Returns `(reason, suggested_action)`.
pub fn diagnose_high_speed(attrs: &TrainAttributes, rules: &[HighSpeedRule]) -> (String, String) {
    let Some(formation) = attrs.formation.as_deref() else {
        return (
            "Formation could not be read from the record".to_string(),
            "Add a formation column (编组) to the imported schedule".to_string(),
        );
    };

    let time = attrs
        .running_time_hours
        .map(|h| format!("{}h", h.round_dp(2).normalize()))
        .unwrap_or_else(|| "unknown running time".to_string());

    if rules.iter().any(|r| formation_matches(r, formation)) {
        (
            format!(
                "No high-speed rule for formation '{}' covers running time {}",
                formation, time
            ),
            format!(
                "Add a high-speed rule for formation '{}' with a running-time range covering {}",
                formation, time
            ),
        )
    } else {
        (
            format!("No high-speed rule for formation '{}'", formation),
            format!("Add a high-speed rule for formation '{}'", formation),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HighSpeedConditions, HighSpeedStaffing, TimeRange};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn rule(id: &str, formation: &str, min: Option<&str>, max: Option<&str>) -> HighSpeedRule {
        HighSpeedRule {
            id: id.to_string(),
            name: id.to_string(),
            conditions: HighSpeedConditions {
                formations: vec![formation.to_string()],
                running_time: TimeRange {
                    min_hours: min.map(dec),
                    max_hours: max.map(dec),
                },
            },
            staffing: HighSpeedStaffing::default(),
        }
    }

    fn attrs(formation: Option<&str>, hours: Option<&str>) -> TrainAttributes {
        TrainAttributes {
            train_number: Some("G1".to_string()),
            sequence: Some("1".to_string()),
            formation: formation.map(str::to_string),
            running_time_hours: hours.map(dec),
            train_type: None,
            is_international: false,
            group_count: None,
            car_counts: Default::default(),
            business_class_count: 0,
        }
    }

    #[test]
    fn test_bounded_rule_beats_unbounded_fallback() {
        // The unbounded rule is declared first but must not shadow the bounded one.
        let rules = vec![
            rule("fallback", "8编组", None, None),
            rule("short", "8编组", None, Some("4")),
        ];
        let m = match_high_speed_rule(&attrs(Some("8编组"), Some("3")), &rules).unwrap();
        assert_eq!(m.rule.id, "short");
        assert_eq!(m.tier, MatchTier::FullCondition);
    }

    #[test]
    fn test_unbounded_rule_catches_time_outside_bounds() {
        let rules = vec![
            rule("short", "8编组", None, Some("4")),
            rule("fallback", "8编组", None, None),
        ];
        let m = match_high_speed_rule(&attrs(Some("8编组"), Some("6")), &rules).unwrap();
        assert_eq!(m.rule.id, "fallback");
        assert_eq!(m.tier, MatchTier::UnboundedTime);
    }

    #[test]
    fn test_unknown_time_only_matches_unbounded() {
        let rules = vec![rule("short", "8编组", None, Some("4"))];
        assert!(match_high_speed_rule(&attrs(Some("8编组"), None), &rules).is_none());
    }

    #[test]
    fn test_formation_match_is_case_insensitive_and_exact() {
        let rules = vec![rule("crh", "CRH380A-8", None, None)];
        assert!(match_high_speed_rule(&attrs(Some(" crh380a-8 "), None), &rules).is_some());
        assert!(match_high_speed_rule(&attrs(Some("CRH380A-16"), None), &rules).is_none());
    }

    #[test]
    fn test_first_declared_rule_wins_within_tier() {
        let rules = vec![
            rule("a", "8编组", Some("2"), Some("10")),
            rule("b", "8编组", Some("4"), Some("8")),
        ];
        let m = match_high_speed_rule(&attrs(Some("8编组"), Some("5")), &rules).unwrap();
        assert_eq!(m.rule.id, "a");
    }

    #[test]
    fn test_missing_formation_never_matches() {
        let rules = vec![rule("fallback", "8编组", None, None)];
        assert!(match_high_speed_rule(&attrs(None, Some("3")), &rules).is_none());
    }

    #[test]
    fn test_matched_conditions_describe_the_match() {
        let rules = vec![rule("long", "8编组", Some("8"), None)];
        let m = match_high_speed_rule(&attrs(Some("8编组"), Some("9")), &rules).unwrap();
        assert_eq!(
            m.matched_conditions,
            vec!["formation=8编组".to_string(), "running_time=>= 8h".to_string()]
        );
    }

    #[test]
    fn test_diagnose_unknown_formation() {
        let rules = vec![rule("fallback", "8编组", None, None)];
        let (reason, action) = diagnose_high_speed(&attrs(Some("16编组"), Some("3")), &rules);
        assert_eq!(reason, "No high-speed rule for formation '16编组'");
        assert_eq!(action, "Add a high-speed rule for formation '16编组'");
    }

    #[test]
    fn test_diagnose_time_gap() {
        let rules = vec![rule("short", "8编组", None, Some("4"))];
        let (reason, action) = diagnose_high_speed(&attrs(Some("8编组"), Some("5.5")), &rules);
        assert!(reason.contains("covers running time 5.5h"));
        assert!(action.contains("covering 5.5h"));
    }

    #[test]
    fn test_diagnose_missing_formation() {
        let (reason, _) = diagnose_high_speed(&attrs(None, None), &[]);
        assert!(reason.contains("Formation could not be read"));
    }
}
