//! Rule matching for conventional trains.
//!
//! Conventional matching tries four tiers in order and stops at the first hit:
//!
//! 1. **Type priority**: rules for the bureau's privileged category (e.g. 直通)
//!    win outright for a train of that category, subject to their time bucket.
//! 2. **Full condition**: every declared condition agrees.
//! 3. **Type only**: category, time bucket and internationality agree;
//!    formation and car-type conditions are ignored.
//! 4. **Generic fallback**: for non-international trains, the bureau's default
//!    category rule, preferring one whose time bucket agrees.
//!
//! Within a tier the first rule in declaration order wins.

use tracing::debug;

use crate::config::{ConventionalRule, StaffingStandard};
use crate::models::{MatchResult, MatchTier, TrainAttributes};

/// The conventional rules of a standard plus the categories that steer matching.
#[derive(Debug, Clone, Copy)]
pub struct ConventionalRulebook<'a> {
    /// Rules in declaration order.
    pub rules: &'a [ConventionalRule],
    /// Category checked before everything else.
    pub priority_train_type: Option<&'a str>,
    /// Category of the bureau's default rule.
    pub default_train_type: Option<&'a str>,
}

impl<'a> ConventionalRulebook<'a> {
    /// Borrows the conventional rulebook of a standard.
    pub fn from_standard(standard: &'a StaffingStandard) -> Self {
        Self {
            rules: &standard.conventional_rules,
            priority_train_type: standard.priority_train_type.as_deref(),
            default_train_type: standard.default_train_type.as_deref(),
        }
    }
}

type ConventionalTier = for<'a> fn(
    &TrainAttributes,
    &ConventionalRulebook<'a>,
) -> Option<MatchResult<'a, ConventionalRule>>;

/// Tiers in priority order.
const TIERS: [ConventionalTier; 4] = [
    type_priority_match,
    full_condition_match,
    type_only_match,
    generic_fallback_match,
];

/// Finds the best conventional rule for a train.
pub fn match_conventional_rule<'a>(
    attrs: &TrainAttributes,
    rulebook: &ConventionalRulebook<'a>,
) -> Option<MatchResult<'a, ConventionalRule>> {
    let result = TIERS.iter().find_map(|tier| tier(attrs, rulebook));
    if let Some(m) = &result {
        debug!(train = %attrs.label(), rule_id = %m.rule.id, tier = ?m.tier, "Conventional rule matched");
    }
    result
}

fn same_category(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn lists_type(rule: &ConventionalRule, train_type: &str) -> bool {
    rule.conditions
        .train_types
        .iter()
        .any(|t| same_category(t, train_type))
}

fn type_condition_holds(rule: &ConventionalRule, attrs: &TrainAttributes) -> bool {
    if rule.conditions.train_types.is_empty() {
        return true;
    }
    attrs
        .train_type
        .as_deref()
        .is_some_and(|t| lists_type(rule, t))
}

fn bucket_condition_holds(rule: &ConventionalRule, attrs: &TrainAttributes) -> bool {
    match rule.conditions.time_bucket {
        None => true,
        Some(bucket) => attrs.time_bucket() == Some(bucket),
    }
}

fn international_condition_holds(rule: &ConventionalRule, attrs: &TrainAttributes) -> bool {
    rule.conditions
        .is_international
        .is_none_or(|flag| flag == attrs.is_international)
}

fn formation_condition_holds(rule: &ConventionalRule, attrs: &TrainAttributes) -> bool {
    if rule.conditions.formations.is_empty() {
        return true;
    }
    attrs.formation.as_deref().is_some_and(|formation| {
        rule.conditions
            .formations
            .iter()
            .any(|f| same_category(f, formation))
    })
}

fn car_trigger_condition_holds(rule: &ConventionalRule, attrs: &TrainAttributes) -> bool {
    rule.conditions
        .car_type_triggers
        .iter()
        .all(|car_type| attrs.car_counts.get(*car_type) > 0)
}

fn describe_conditions(rule: &ConventionalRule, attrs: &TrainAttributes, full: bool) -> Vec<String> {
    let mut conditions = Vec::new();
    if let Some(train_type) = &attrs.train_type {
        if !rule.conditions.train_types.is_empty() {
            conditions.push(format!("train_type={}", train_type));
        }
    }
    if let Some(bucket) = rule.conditions.time_bucket {
        conditions.push(format!("time_bucket={}", bucket));
    }
    if full {
        if let Some(flag) = rule.conditions.is_international {
            conditions.push(format!("is_international={}", flag));
        }
        if let (false, Some(formation)) = (rule.conditions.formations.is_empty(), &attrs.formation) {
            conditions.push(format!("formation={}", formation));
        }
        for car_type in &rule.conditions.car_type_triggers {
            conditions.push(format!("has_car={:?}", car_type));
        }
    }
    conditions
}

fn type_priority_match<'a>(
    attrs: &TrainAttributes,
    rulebook: &ConventionalRulebook<'a>,
) -> Option<MatchResult<'a, ConventionalRule>> {
    let priority = rulebook.priority_train_type?;
    let train_type = attrs.train_type.as_deref()?;
    if !same_category(train_type, priority) {
        return None;
    }
    rulebook
        .rules
        .iter()
        .filter(|r| lists_type(r, priority))
        .find(|r| bucket_condition_holds(r, attrs))
        .map(|rule| MatchResult {
            rule,
            tier: MatchTier::TypePriority,
            matched_conditions: describe_conditions(rule, attrs, false),
        })
}

fn full_condition_match<'a>(
    attrs: &TrainAttributes,
    rulebook: &ConventionalRulebook<'a>,
) -> Option<MatchResult<'a, ConventionalRule>> {
    rulebook
        .rules
        .iter()
        .find(|r| {
            type_condition_holds(r, attrs)
                && bucket_condition_holds(r, attrs)
                && international_condition_holds(r, attrs)
                && formation_condition_holds(r, attrs)
                && car_trigger_condition_holds(r, attrs)
        })
        .map(|rule| MatchResult {
            rule,
            tier: MatchTier::FullCondition,
            matched_conditions: describe_conditions(rule, attrs, true),
        })
}

fn type_only_match<'a>(
    attrs: &TrainAttributes,
    rulebook: &ConventionalRulebook<'a>,
) -> Option<MatchResult<'a, ConventionalRule>> {
    let train_type = attrs.train_type.as_deref()?;
    rulebook
        .rules
        .iter()
        .filter(|r| lists_type(r, train_type))
        .find(|r| bucket_condition_holds(r, attrs) && international_condition_holds(r, attrs))
        .map(|rule| MatchResult {
            rule,
            tier: MatchTier::TypeOnly,
            matched_conditions: describe_conditions(rule, attrs, false),
        })
}

fn generic_fallback_match<'a>(
    attrs: &TrainAttributes,
    rulebook: &ConventionalRulebook<'a>,
) -> Option<MatchResult<'a, ConventionalRule>> {
    if attrs.is_international {
        return None;
    }
    let default_type = rulebook.default_train_type?;
    let mut candidates = rulebook
        .rules
        .iter()
        .filter(|r| lists_type(r, default_type))
        .peekable();
    let first = *candidates.peek()?;
    let rule = candidates
        .find(|r| bucket_condition_holds(r, attrs))
        .unwrap_or(first);

    let mut matched_conditions = vec![format!("default_train_type={}", default_type)];
    if let Some(bucket) = rule.conditions.time_bucket {
        if attrs.time_bucket() == Some(bucket) {
            matched_conditions.push(format!("time_bucket={}", bucket));
        }
    }
    Some(MatchResult {
        rule,
        tier: MatchTier::GenericFallback,
        matched_conditions,
    })
}

/// Explains why no conventional rule matched and what rule would fix it.
///
/// Returns `(reason, suggested_action)`.
pub fn diagnose_conventional(
    attrs: &TrainAttributes,
    rulebook: &ConventionalRulebook<'_>,
) -> (String, String) {
    let bucket = attrs
        .time_bucket()
        .map(|b| b.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let Some(train_type) = attrs.train_type.as_deref() else {
        return (
            format!(
                "Train type could not be read from the record and no default rule applies (running time {})",
                bucket
            ),
            "Add a train type column (列车类型) to the imported schedule or configure a default train type rule"
                .to_string(),
        );
    };

    let scope = if attrs.is_international {
        "international train type"
    } else {
        "train type"
    };
    let reason = if rulebook.rules.iter().any(|r| lists_type(r, train_type)) {
        format!(
            "No conventional rule for {} '{}' with running time {}",
            scope, train_type, bucket
        )
    } else {
        format!("No conventional rule for {} '{}'", scope, train_type)
    };
    let action = format!(
        "Add a conventional rule for {} '{}' in time bucket {}",
        scope, train_type, bucket
    );
    (reason, action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConventionalConditions, ConventionalStaffing};
    use crate::models::{CarCounts, CarType, TimeBucket};
    use rust_decimal::Decimal;

    fn rule(id: &str, types: &[&str], bucket: Option<TimeBucket>) -> ConventionalRule {
        ConventionalRule {
            id: id.to_string(),
            name: id.to_string(),
            conditions: ConventionalConditions {
                train_types: types.iter().map(|t| t.to_string()).collect(),
                time_bucket: bucket,
                ..Default::default()
            },
            staffing: ConventionalStaffing::default(),
        }
    }

    fn attrs(train_type: Option<&str>, hours: Option<i64>) -> TrainAttributes {
        TrainAttributes {
            train_number: Some("K1".to_string()),
            sequence: Some("1".to_string()),
            formation: None,
            running_time_hours: hours.map(Decimal::from),
            train_type: train_type.map(str::to_string),
            is_international: false,
            group_count: None,
            car_counts: CarCounts::default(),
            business_class_count: 0,
        }
    }

    fn rulebook<'a>(rules: &'a [ConventionalRule]) -> ConventionalRulebook<'a> {
        ConventionalRulebook {
            rules,
            priority_train_type: Some("直通"),
            default_train_type: Some("普通"),
        }
    }

    #[test]
    fn test_priority_type_wins_over_earlier_rules() {
        let mut generic = rule("any-long", &[], Some(TimeBucket::From12To24));
        generic.conditions.train_types.clear();
        let rules = vec![generic, rule("through", &["直通"], None)];

        let m = match_conventional_rule(&attrs(Some("直通"), Some(14)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "through");
        assert_eq!(m.tier, MatchTier::TypePriority);
    }

    #[test]
    fn test_priority_rule_respects_its_time_bucket() {
        let rules = vec![
            rule("through-long", &["直通"], Some(TimeBucket::From12To24)),
            rule("through", &["直通"], None),
        ];
        let m = match_conventional_rule(&attrs(Some("直通"), Some(6)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "through");

        let m = match_conventional_rule(&attrs(Some("直通"), Some(13)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "through-long");
    }

    #[test]
    fn test_full_condition_requires_every_condition() {
        let mut sleeper = rule("local-sleeper", &["管内"], None);
        sleeper.conditions.car_type_triggers = vec![CarType::HardSleeper];
        let rules = vec![sleeper, rule("local", &["管内"], None)];

        let m = match_conventional_rule(&attrs(Some("管内"), Some(3)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "local");
        assert_eq!(m.tier, MatchTier::FullCondition);

        let mut with_sleeper = attrs(Some("管内"), Some(3));
        with_sleeper.car_counts.hard_sleeper = 4;
        let m = match_conventional_rule(&with_sleeper, &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "local-sleeper");
    }

    #[test]
    fn test_type_only_recovers_missing_car_data() {
        let mut sleeper = rule("local-sleeper", &["管内"], Some(TimeBucket::Under4));
        sleeper.conditions.car_type_triggers = vec![CarType::Seat];
        let rules = vec![sleeper];

        let m = match_conventional_rule(&attrs(Some("管内"), Some(2)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "local-sleeper");
        assert_eq!(m.tier, MatchTier::TypeOnly);
    }

    #[test]
    fn test_type_only_keeps_time_bucket() {
        let mut sleeper = rule("local-sleeper", &["管内"], Some(TimeBucket::Under4));
        sleeper.conditions.car_type_triggers = vec![CarType::Seat];
        let rules = vec![sleeper];

        assert!(match_conventional_rule(&attrs(Some("管内"), Some(5)), &rulebook(&rules)).is_none());
    }

    #[test]
    fn test_type_only_keeps_international_condition() {
        let mut domestic = rule("domestic-direct", &["直达"], None);
        domestic.conditions.is_international = Some(false);
        domestic.conditions.car_type_triggers = vec![CarType::Seat];
        let rules = vec![domestic];

        let mut intl = attrs(Some("直达"), Some(30));
        intl.is_international = true;
        assert!(match_conventional_rule(&intl, &rulebook(&rules)).is_none());

        let m = match_conventional_rule(&attrs(Some("直达"), Some(30)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "domestic-direct");
        assert_eq!(m.tier, MatchTier::TypeOnly);
    }

    #[test]
    fn test_generic_fallback_prefers_matching_bucket() {
        let rules = vec![
            rule("normal", &["普通"], Some(TimeBucket::Under4)),
            rule("normal-mid", &["普通"], Some(TimeBucket::From4To12)),
        ];
        let m = match_conventional_rule(&attrs(Some("临客"), Some(6)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "normal-mid");
        assert_eq!(m.tier, MatchTier::GenericFallback);
    }

    #[test]
    fn test_generic_fallback_accepts_any_bucket() {
        let rules = vec![rule("normal-short", &["普通"], Some(TimeBucket::Under4))];
        let m = match_conventional_rule(&attrs(None, Some(30)), &rulebook(&rules)).unwrap();
        assert_eq!(m.rule.id, "normal-short");
        assert_eq!(m.matched_conditions, vec!["default_train_type=普通".to_string()]);
    }

    #[test]
    fn test_generic_fallback_skips_international_trains() {
        let rules = vec![rule("normal", &["普通"], None)];
        let mut intl = attrs(Some("国际"), Some(30));
        intl.is_international = true;
        assert!(match_conventional_rule(&intl, &rulebook(&rules)).is_none());
    }

    #[test]
    fn test_international_condition() {
        let mut intl_rule = rule("intl", &[], None);
        intl_rule.conditions.is_international = Some(true);
        let rules = vec![intl_rule];

        let mut intl = attrs(Some("国际联运"), Some(30));
        intl.is_international = true;
        assert!(match_conventional_rule(&intl, &rulebook(&rules)).is_some());
        assert!(
            match_conventional_rule(&attrs(Some("国际联运"), Some(30)), &rulebook(&rules))
                .is_none()
        );
    }

    #[test]
    fn test_no_default_type_means_unmatched() {
        let rules = vec![rule("normal", &["普通"], None)];
        let book = ConventionalRulebook {
            rules: &rules,
            priority_train_type: None,
            default_train_type: None,
        };
        assert!(match_conventional_rule(&attrs(Some("临客"), Some(3)), &book).is_none());
    }

    #[test]
    fn test_diagnose_known_type_with_bucket_gap() {
        let rules = vec![rule("local", &["管内"], Some(TimeBucket::Under4))];
        let (reason, action) =
            diagnose_conventional(&attrs(Some("管内"), Some(13)), &rulebook(&rules));
        assert_eq!(reason, "No conventional rule for train type '管内' with running time 12to24");
        assert_eq!(action, "Add a conventional rule for train type '管内' in time bucket 12to24");
    }

    #[test]
    fn test_diagnose_missing_type() {
        let (reason, _) = diagnose_conventional(&attrs(None, None), &rulebook(&[]));
        assert!(reason.contains("Train type could not be read"));
        assert!(reason.contains("unknown"));
    }
}
