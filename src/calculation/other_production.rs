//! Derived ("other production") staffing.
//!
//! Other-production positions (management, dispatch, training, ...) are not
//! staffed per train. Each position's headcount is derived from the unit's
//! already-aggregated high-speed and conventional totals using one of four
//! methods:
//!
//! - **fixed**: a constant headcount
//! - **percentage**: a percentage of one aggregate
//! - **segmented**: separate clamped percentages of the high-speed and
//!   conventional totals, summed
//! - **formula**: `k * main`, where `main` is the main-production total
//!
//! Every item carries a trace string so the derivation can be audited.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{
    BaseTotal, EngineSettings, OtherProductionConfig, OtherProductionRule, Segment,
    StaffingStandard,
};
use crate::models::{OtherProductionItem, OtherProductionUnitResult, TrainFamily, UnitStaffingResult};

use super::unit_aggregation::{apply_reserve, ceil_headcount, resolve_reserve_rate};

/// Names a formula may use for the main-production total.
pub const MAIN_PRODUCTION_ALIASES: &[&str] =
    &["main", "mainProductionTotal", "主要生产", "主要生产人数"];

/// The aggregates derived rules are computed from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MainProductionTotals {
    /// High-speed total staff.
    pub high_speed: Decimal,
    /// Conventional total staff.
    pub conventional: Decimal,
}

impl MainProductionTotals {
    /// Takes the final (reserve-adjusted) totals of two unit results.
    pub fn from_results(high_speed: &UnitStaffingResult, conventional: &UnitStaffingResult) -> Self {
        Self {
            high_speed: Decimal::from(high_speed.total_staff),
            conventional: Decimal::from(conventional.total_staff),
        }
    }

    /// High-speed plus conventional.
    pub fn main_production(&self) -> Decimal {
        self.high_speed + self.conventional
    }

    fn base(&self, base: BaseTotal) -> Decimal {
        match base {
            BaseTotal::HighSpeed => self.high_speed,
            BaseTotal::Conventional => self.conventional,
            BaseTotal::MainProduction => self.main_production(),
        }
    }
}

fn base_label(base: BaseTotal) -> &'static str {
    match base {
        BaseTotal::HighSpeed => "high_speed",
        BaseTotal::Conventional => "conventional",
        BaseTotal::MainProduction => "main_production",
    }
}

/// Parses a `k * main` formula and returns `k`.
///
/// Either operand order is accepted, with `*`, `×` or `x` as the operator.
///
/// # Examples
///
/// ```
/// use crew_staffing_engine::calculation::parse_formula;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_formula("0.05 * 主要生产人数"), Some(Decimal::new(5, 2)));
/// assert_eq!(parse_formula("main × 2"), Some(Decimal::from(2)));
/// assert_eq!(parse_formula("main + 2"), None);
/// ```
pub fn parse_formula(expression: &str) -> Option<Decimal> {
    let expression = expression.trim();
    let (left, right) = ['*', '×']
        .iter()
        .find_map(|op| expression.split_once(*op))
        .or_else(|| expression.split_once(['x', 'X']))?;
    let (left, right) = (left.trim(), right.trim());

    let is_main = |s: &str| MAIN_PRODUCTION_ALIASES.contains(&s);
    let coefficient = if is_main(left) {
        right
    } else if is_main(right) {
        left
    } else {
        return None;
    };
    coefficient.parse::<Decimal>().ok()
}

/// Picks one rule per position for a unit.
///
/// For each position (in order of first declaration) a rule listing the unit
/// wins over a generic rule with no units; within a tier the first declared
/// rule wins. Disabled rules and rules for other units are ignored.
pub fn select_position_rules<'a>(
    rules: &'a [OtherProductionRule],
    unit: &str,
) -> Vec<&'a OtherProductionRule> {
    let enabled = move || rules.iter().filter(|r| r.enabled);

    let mut positions: Vec<&str> = Vec::new();
    for rule in enabled() {
        if !positions.contains(&rule.position.as_str()) {
            positions.push(&rule.position);
        }
    }

    positions
        .into_iter()
        .filter_map(|position| {
            let candidates = || enabled().filter(move |r| r.position == position);
            candidates()
                .find(|r| r.units.iter().any(|u| u == unit))
                .or_else(|| candidates().find(|r| r.units.is_empty()))
        })
        .collect()
}

fn clamp_segment(value: Decimal, segment: &Segment) -> Decimal {
    let value = segment.min.map_or(value, |min| value.max(min));
    segment.max.map_or(value, |max| value.min(max))
}

fn describe_segment(label: &str, total: Decimal, segment: &Segment) -> (Decimal, String) {
    let raw = total * segment.percentage / Decimal::ONE_HUNDRED;
    // An empty segment stays empty; the clamp only bounds a staffed one.
    let value = if total > Decimal::ZERO {
        clamp_segment(raw, segment)
    } else {
        Decimal::ZERO
    };
    let mut trace = format!(
        "{} {} x {}% = {}",
        label,
        total.normalize(),
        segment.percentage.normalize(),
        raw.normalize()
    );
    if value != raw {
        trace.push_str(&format!(" -> {}", value.normalize()));
    }
    (value, trace)
}

/// Evaluates one rule against the unit's totals.
///
/// Returns the item and, for an unsupported formula, a warning.
pub fn evaluate_rule(
    rule: &OtherProductionRule,
    totals: &MainProductionTotals,
) -> (OtherProductionItem, Option<String>) {
    let mut warning = None;
    let (exact, trace) = match &rule.config {
        OtherProductionConfig::Fixed { count } => (*count, format!("fixed {}", count.normalize())),
        OtherProductionConfig::Percentage { base, percentage } => {
            let base_value = totals.base(*base);
            let exact = base_value * *percentage / Decimal::ONE_HUNDRED;
            (
                exact,
                format!(
                    "{} {} x {}% = {}",
                    base_label(*base),
                    base_value.normalize(),
                    percentage.normalize(),
                    exact.normalize()
                ),
            )
        }
        OtherProductionConfig::Segmented {
            high_speed,
            conventional,
        } => {
            let (hs, hs_trace) = describe_segment("high_speed", totals.high_speed, high_speed);
            let (cv, cv_trace) =
                describe_segment("conventional", totals.conventional, conventional);
            let exact = hs + cv;
            (
                exact,
                format!("{}; {}; total {}", hs_trace, cv_trace, exact.normalize()),
            )
        }
        OtherProductionConfig::Formula { expression } => match parse_formula(expression) {
            Some(k) => {
                let main = totals.main_production();
                let exact = k * main;
                (
                    exact,
                    format!(
                        "{} x main_production {} = {}",
                        k.normalize(),
                        main.normalize(),
                        exact.normalize()
                    ),
                )
            }
            None => {
                warn!(
                    rule_id = %rule.id,
                    expression = %expression,
                    "Unsupported formula, using 0"
                );
                warning = Some(format!(
                    "Rule '{}': formula '{}' is not supported, using 0",
                    rule.id, expression
                ));
                (
                    Decimal::ZERO,
                    format!("formula '{}' not supported (expected k * main), using 0", expression),
                )
            }
        },
    };

    let item = OtherProductionItem {
        rule_id: rule.id.clone(),
        rule_name: rule.name.clone(),
        position: rule.position.clone(),
        method: rule.config.method().to_string(),
        exact,
        display: ceil_headcount(exact),
        trace,
    };
    (item, warning)
}

/// Calculates other-production staffing for one unit.
pub fn calculate_other_production(
    settings: &EngineSettings,
    standard: &StaffingStandard,
    unit: &str,
    totals: MainProductionTotals,
) -> OtherProductionUnitResult {
    let mut items = Vec::new();
    let mut warnings = Vec::new();
    for rule in select_position_rules(&standard.other_production_rules, unit) {
        let (item, warning) = evaluate_rule(rule, &totals);
        items.push(item);
        warnings.extend(warning);
    }

    let exact_base_total_staff: Decimal = items.iter().map(|i| i.exact).sum();
    let reserve_rate =
        resolve_reserve_rate(settings, standard, unit, TrainFamily::OtherProduction);
    let reserve = apply_reserve(exact_base_total_staff, reserve_rate);

    info!(
        bureau = %standard.bureau,
        unit = %unit,
        positions = items.len(),
        main_production_total = %totals.main_production(),
        total_staff = reserve.total_staff,
        "Other production staffing calculated"
    );

    OtherProductionUnitResult {
        calculation_id: Uuid::new_v4(),
        timestamp: Utc::now(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        bureau: standard.bureau.clone(),
        unit: unit.to_string(),
        high_speed_total: totals.high_speed,
        conventional_total: totals.conventional,
        main_production_total: totals.main_production(),
        items,
        exact_base_total_staff,
        base_total_staff: reserve.base_total_staff,
        reserve_rate,
        total_staff: reserve.total_staff,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn totals(high_speed: &str, conventional: &str) -> MainProductionTotals {
        MainProductionTotals {
            high_speed: dec(high_speed),
            conventional: dec(conventional),
        }
    }

    fn rule(id: &str, position: &str, units: &[&str], config: OtherProductionConfig) -> OtherProductionRule {
        OtherProductionRule {
            id: id.to_string(),
            name: id.to_string(),
            position: position.to_string(),
            units: units.iter().map(|u| u.to_string()).collect(),
            enabled: true,
            config,
        }
    }

    fn fixed(count: &str) -> OtherProductionConfig {
        OtherProductionConfig::Fixed { count: dec(count) }
    }

    #[test]
    fn test_parse_formula_accepts_both_operand_orders() {
        assert_eq!(parse_formula("0.05 * main"), Some(dec("0.05")));
        assert_eq!(parse_formula("mainProductionTotal*0.1"), Some(dec("0.1")));
        assert_eq!(parse_formula("0.02 x 主要生产"), Some(dec("0.02")));
        assert_eq!(parse_formula("主要生产人数 × 0.03"), Some(dec("0.03")));
    }

    #[test]
    fn test_parse_formula_rejects_other_syntax() {
        assert_eq!(parse_formula(""), None);
        assert_eq!(parse_formula("main"), None);
        assert_eq!(parse_formula("0.05 * high_speed"), None);
        assert_eq!(parse_formula("main * main"), None);
        assert_eq!(parse_formula("sqrt(main)"), None);
    }

    #[test]
    fn test_fixed_rule() {
        let (item, warning) = evaluate_rule(&rule("op-1", "调度", &[], fixed("4")), &totals("0", "0"));
        assert_eq!(item.exact, dec("4"));
        assert_eq!(item.display, 4);
        assert_eq!(item.method, "fixed");
        assert!(warning.is_none());
    }

    #[test]
    fn test_percentage_of_main_production() {
        let config = OtherProductionConfig::Percentage {
            base: BaseTotal::MainProduction,
            percentage: dec("3"),
        };
        let (item, _) = evaluate_rule(&rule("op-1", "管理", &[], config), &totals("80", "40"));
        assert_eq!(item.exact, dec("3.6"));
        assert_eq!(item.display, 4);
        assert_eq!(item.trace, "main_production 120 x 3% = 3.6");
    }

    #[test]
    fn test_segmented_clamps_each_segment() {
        let config = OtherProductionConfig::Segmented {
            high_speed: Segment {
                percentage: dec("2"),
                min: Some(dec("1")),
                max: Some(dec("10")),
            },
            conventional: Segment {
                percentage: dec("1"),
                min: Some(dec("1")),
                max: None,
            },
        };
        // high-speed 1000 x 2% = 20 -> clamped to 10; conventional 50 x 1% = 0.5 -> raised to 1
        let (item, _) = evaluate_rule(&rule("op-1", "培训", &[], config), &totals("1000", "50"));
        assert_eq!(item.exact, dec("11"));
        assert!(item.trace.contains("-> 10"));
        assert!(item.trace.contains("-> 1"));
    }

    #[test]
    fn test_segmented_empty_segment_stays_zero() {
        let config = OtherProductionConfig::Segmented {
            high_speed: Segment {
                percentage: dec("2"),
                min: Some(dec("1")),
                max: None,
            },
            conventional: Segment {
                percentage: dec("1"),
                min: Some(dec("1")),
                max: None,
            },
        };
        let (item, _) = evaluate_rule(&rule("op-1", "培训", &[], config), &totals("0", "300"));
        assert_eq!(item.exact, dec("3"));
    }

    #[test]
    fn test_formula_rule() {
        let config = OtherProductionConfig::Formula {
            expression: "0.01 * 主要生产人数".to_string(),
        };
        let (item, warning) = evaluate_rule(&rule("op-1", "安全", &[], config), &totals("150", "50"));
        assert_eq!(item.exact, dec("2"));
        assert_eq!(item.trace, "0.01 x main_production 200 = 2");
        assert!(warning.is_none());
    }

    #[test]
    fn test_unsupported_formula_yields_zero_with_trace() {
        let config = OtherProductionConfig::Formula {
            expression: "main / 50".to_string(),
        };
        let (item, warning) = evaluate_rule(&rule("op-1", "安全", &[], config), &totals("150", "50"));
        assert_eq!(item.exact, Decimal::ZERO);
        assert_eq!(item.display, 0);
        assert!(item.trace.contains("not supported"));
        assert!(warning.is_some());
    }

    #[test]
    fn test_unit_specific_rule_beats_generic() {
        let rules = vec![
            rule("generic", "调度", &[], fixed("4")),
            rule("depot", "调度", &["depot-1"], fixed("6")),
            rule("other-depot", "调度", &["depot-2"], fixed("9")),
        ];
        let selected = select_position_rules(&rules, "depot-1");
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].id, "depot");

        let selected = select_position_rules(&rules, "depot-3");
        assert_eq!(selected[0].id, "generic");
    }

    #[test]
    fn test_disabled_and_foreign_rules_are_skipped() {
        let mut disabled = rule("off", "管理", &[], fixed("3"));
        disabled.enabled = false;
        let rules = vec![disabled, rule("foreign", "培训", &["depot-2"], fixed("2"))];

        assert!(select_position_rules(&rules, "depot-1").is_empty());
    }

    #[test]
    fn test_positions_keep_declaration_order() {
        let rules = vec![
            rule("a", "管理", &[], fixed("1")),
            rule("b", "调度", &[], fixed("1")),
            rule("c", "管理", &["depot-1"], fixed("2")),
        ];
        let ids: Vec<_> = select_position_rules(&rules, "depot-1")
            .iter()
            .map(|r| r.id.as_str())
            .collect();
        assert_eq!(ids, vec!["c", "b"]);
    }

    #[test]
    fn test_unit_result_applies_other_reserve_rate() {
        let mut standard = StaffingStandard::empty("beijing");
        standard.other_production_rules = vec![
            rule("op-1", "调度", &[], fixed("4")),
            rule(
                "op-2",
                "管理",
                &[],
                OtherProductionConfig::Percentage {
                    base: BaseTotal::MainProduction,
                    percentage: dec("3"),
                },
            ),
        ];

        let result = calculate_other_production(
            &EngineSettings::default(),
            &standard,
            "depot-1",
            totals("80", "40"),
        );

        // 4 + 3.6 = 7.6 -> 8; 7.6 x 1.05 = 7.98 -> 8
        assert_eq!(result.main_production_total, dec("120"));
        assert_eq!(result.exact_base_total_staff, dec("7.6"));
        assert_eq!(result.base_total_staff, 8);
        assert_eq!(result.reserve_rate, dec("5"));
        assert_eq!(result.total_staff, 8);
        assert_eq!(result.items.len(), 2);
    }
}
