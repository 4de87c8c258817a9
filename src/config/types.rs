//! Configuration types for staffing calculation.
//!
//! This module contains the strongly-typed staffing standard and rule
//! structures that are deserialized from YAML configuration files. They are
//! read-only to the engine for the duration of a calculation.

use std::collections::{BTreeMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{parse_formula, parse_ratio};
use crate::error::{EngineError, EngineResult};
use crate::models::{CarType, TimeBucket, TrainFamily};

/// Engine-wide constants, injected into [`crate::calculation::StaffingEngine`].
///
/// # Example
///
/// ```
/// use crew_staffing_engine::config::EngineSettings;
///
/// let settings = EngineSettings::default();
/// assert_eq!(settings.reference_standard_hours.to_string(), "166.6");
/// assert_eq!(settings.default_main_reserve_rate.to_string(), "8");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Monthly standard work hours every bureau is normalized to.
    pub reference_standard_hours: Decimal,
    /// Reserve rate (percent) for high-speed and conventional staff when none is configured.
    pub default_main_reserve_rate: Decimal,
    /// Reserve rate (percent) for other-production staff when none is configured.
    pub default_other_reserve_rate: Decimal,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            reference_standard_hours: Decimal::new(1666, 1),
            default_main_reserve_rate: Decimal::from(8),
            default_other_reserve_rate: Decimal::from(5),
        }
    }
}

/// A running-time range in hours, half-open `[min_hours, max_hours)`.
///
/// A range with neither bound matches every running time, including an
/// unknown one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Inclusive lower bound.
    #[serde(default)]
    pub min_hours: Option<Decimal>,
    /// Exclusive upper bound.
    #[serde(default)]
    pub max_hours: Option<Decimal>,
}

impl TimeRange {
    /// Returns true if neither bound is set.
    pub fn is_unbounded(&self) -> bool {
        self.min_hours.is_none() && self.max_hours.is_none()
    }

    /// Returns true if `hours` falls inside the range.
    ///
    /// # Examples
    ///
    /// ```
    /// use crew_staffing_engine::config::TimeRange;
    /// use rust_decimal::Decimal;
    ///
    /// let range = TimeRange {
    ///     min_hours: Some(Decimal::from(4)),
    ///     max_hours: Some(Decimal::from(8)),
    /// };
    /// assert!(range.contains(Some(Decimal::from(4))));
    /// assert!(!range.contains(Some(Decimal::from(8))));
    /// assert!(!range.contains(None));
    /// ```
    pub fn contains(&self, hours: Option<Decimal>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(hours) = hours else {
            return false;
        };
        if self.min_hours.is_some_and(|min| hours < min) {
            return false;
        }
        if self.max_hours.is_some_and(|max| hours >= max) {
            return false;
        }
        true
    }

    /// Describes the range for diagnostics.
    pub fn describe(&self) -> String {
        match (self.min_hours, self.max_hours) {
            (None, None) => "any running time".to_string(),
            (Some(min), None) => format!(">= {}h", min.normalize()),
            (None, Some(max)) => format!("< {}h", max.normalize()),
            (Some(min), Some(max)) => format!("{}h-{}h", min.normalize(), max.normalize()),
        }
    }
}

/// Conditions of a high-speed rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSpeedConditions {
    /// Formations this rule covers (case-insensitive exact match).
    pub formations: Vec<String>,
    /// Running-time range; unbounded when omitted.
    #[serde(default)]
    pub running_time: TimeRange,
}

/// Per-group crew counts of a high-speed rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSpeedStaffing {
    /// Conductors per group.
    #[serde(default)]
    pub conductor: Decimal,
    /// Train attendants per group.
    #[serde(default)]
    pub train_attendant: Decimal,
    /// Business-class attendants per group (not scaled by car count).
    #[serde(default)]
    pub business_class_attendant: Decimal,
}

/// A staffing rule for high-speed trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighSpeedRule {
    /// Unique rule id within the standard.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Match conditions.
    pub conditions: HighSpeedConditions,
    /// Crew counts.
    pub staffing: HighSpeedStaffing,
}

/// Conditions of a conventional rule. Every declared condition must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionalConditions {
    /// Train categories covered; empty means any category.
    pub train_types: Vec<String>,
    /// Running-time bucket; `None` means any running time.
    pub time_bucket: Option<TimeBucket>,
    /// Required internationality, if declared.
    pub is_international: Option<bool>,
    /// Formations covered; empty means any formation.
    pub formations: Vec<String>,
    /// Car types the train must carry for the rule to apply.
    pub car_type_triggers: Vec<CarType>,
}

/// A "N persons per M cars" allocation for one car type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CarRatio {
    /// The car type the ratio applies to.
    pub car_type: CarType,
    /// Ratio text, e.g. `"1人2车"` or `"2 per 3"`.
    pub ratio: String,
    /// Lower bound on the allocation, also used when the ratio cannot be read.
    #[serde(default)]
    pub min_staff: u32,
}

/// Per-group crew counts of a conventional rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConventionalStaffing {
    /// Conductors per group.
    pub conductor: Decimal,
    /// Broadcasters per group.
    pub broadcaster: Decimal,
    /// Car-type ratios.
    pub car_ratios: Vec<CarRatio>,
}

/// A staffing rule for conventional trains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConventionalRule {
    /// Unique rule id within the standard.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Match conditions.
    #[serde(default)]
    pub conditions: ConventionalConditions,
    /// Crew counts.
    #[serde(default)]
    pub staffing: ConventionalStaffing,
}

/// Which aggregate a percentage rule is taken of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaseTotal {
    /// High-speed total staff.
    HighSpeed,
    /// Conventional total staff.
    Conventional,
    /// High-speed plus conventional.
    MainProduction,
}

/// One side of a segmented percentage rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Percentage of the segment's total.
    pub percentage: Decimal,
    /// Lower clamp.
    #[serde(default)]
    pub min: Option<Decimal>,
    /// Upper clamp.
    #[serde(default)]
    pub max: Option<Decimal>,
}

/// How an other-production rule computes its headcount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum OtherProductionConfig {
    /// A fixed headcount.
    Fixed {
        /// Headcount.
        count: Decimal,
    },
    /// A percentage of one aggregate.
    Percentage {
        /// The aggregate used as base.
        base: BaseTotal,
        /// Percentage applied to the base.
        percentage: Decimal,
    },
    /// Separate clamped percentages of the high-speed and conventional totals.
    Segmented {
        /// High-speed segment.
        high_speed: Segment,
        /// Conventional segment.
        conventional: Segment,
    },
    /// `k * main` where `main` is the main-production total.
    Formula {
        /// Formula text, e.g. `"0.05 * 主要生产人数"`.
        expression: String,
    },
}

impl OtherProductionConfig {
    /// Returns the method label used in results.
    pub fn method(&self) -> &'static str {
        match self {
            OtherProductionConfig::Fixed { .. } => "fixed",
            OtherProductionConfig::Percentage { .. } => "percentage",
            OtherProductionConfig::Segmented { .. } => "segmented",
            OtherProductionConfig::Formula { .. } => "formula",
        }
    }
}

fn enabled_by_default() -> bool {
    true
}

/// A derived staffing rule for one other-production position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherProductionRule {
    /// Unique rule id within the standard.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Position staffed by the rule.
    pub position: String,
    /// Units the rule is specific to; empty means every unit.
    #[serde(default)]
    pub units: Vec<String>,
    /// Disabled rules are ignored.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Calculation parameters.
    pub config: OtherProductionConfig,
}

/// Reserve rates (percent) for one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitReserveRates {
    /// Rate for high-speed and conventional staff.
    pub main_production: Option<Decimal>,
    /// Rate for other-production staff.
    pub other_production: Option<Decimal>,
}

/// Reserve-rate configuration of a standard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReserveRates {
    /// Bureau-wide main-production rate.
    pub main_production: Option<Decimal>,
    /// Bureau-wide other-production rate.
    pub other_production: Option<Decimal>,
    /// Per-unit overrides keyed by unit name.
    pub units: BTreeMap<String, UnitReserveRates>,
}

impl ReserveRates {
    /// Looks up the configured rate for a unit and family.
    ///
    /// A per-unit entry wins over the bureau-wide rate. Returns `None` if
    /// neither is configured.
    pub fn lookup(&self, unit: &str, family: TrainFamily) -> Option<Decimal> {
        let unit_rates = self.units.get(unit);
        match family {
            TrainFamily::HighSpeed | TrainFamily::Conventional => unit_rates
                .and_then(|r| r.main_production)
                .or(self.main_production),
            TrainFamily::OtherProduction => unit_rates
                .and_then(|r| r.other_production)
                .or(self.other_production),
        }
    }
}

/// The complete staffing rulebook of one bureau.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingStandard {
    /// Bureau the standard belongs to.
    pub bureau: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Monthly standard work hours of this bureau.
    #[serde(default)]
    pub standard_work_hours: Option<Decimal>,
    /// High-speed rules in priority order.
    #[serde(default)]
    pub high_speed_rules: Vec<HighSpeedRule>,
    /// Conventional rules in priority order.
    #[serde(default)]
    pub conventional_rules: Vec<ConventionalRule>,
    /// Train category whose rules are checked before all others (e.g. "直通").
    #[serde(default)]
    pub priority_train_type: Option<String>,
    /// Category of the bureau's default conventional rule (e.g. "普通").
    #[serde(default)]
    pub default_train_type: Option<String>,
    /// Derived rules in priority order.
    #[serde(default)]
    pub other_production_rules: Vec<OtherProductionRule>,
    /// Reserve rates.
    #[serde(default)]
    pub reserve_rates: ReserveRates,
}

impl StaffingStandard {
    /// Creates a standard with no rules.
    pub fn empty(bureau: impl Into<String>) -> Self {
        Self {
            bureau: bureau.into(),
            name: String::new(),
            standard_work_hours: None,
            high_speed_rules: Vec::new(),
            conventional_rules: Vec::new(),
            priority_train_type: None,
            default_train_type: None,
            other_production_rules: Vec::new(),
            reserve_rates: ReserveRates::default(),
        }
    }

    /// Checks the standard for configuration that cannot be calculated with.
    ///
    /// Rejects duplicate rule ids, negative counts or rates, and non-positive
    /// standard work hours. Unreadable ratio strings and formulas are not
    /// errors; see [`StaffingStandard::lint`].
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidStandard {
            bureau: self.bureau.clone(),
            message,
        };

        if self.standard_work_hours.is_some_and(|h| h <= Decimal::ZERO) {
            return Err(invalid("standard_work_hours must be positive".to_string()));
        }

        let ids = self
            .high_speed_rules
            .iter()
            .map(|r| r.id.as_str())
            .chain(self.conventional_rules.iter().map(|r| r.id.as_str()))
            .chain(self.other_production_rules.iter().map(|r| r.id.as_str()));
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(id) {
                return Err(invalid(format!("duplicate rule id '{}'", id)));
            }
        }

        for rule in &self.high_speed_rules {
            let s = &rule.staffing;
            if [s.conductor, s.train_attendant, s.business_class_attendant]
                .iter()
                .any(Decimal::is_sign_negative)
            {
                return Err(invalid(format!("rule '{}' has a negative crew count", rule.id)));
            }
        }
        for rule in &self.conventional_rules {
            let s = &rule.staffing;
            if s.conductor.is_sign_negative() || s.broadcaster.is_sign_negative() {
                return Err(invalid(format!("rule '{}' has a negative crew count", rule.id)));
            }
        }
        for rule in &self.other_production_rules {
            let negative = match &rule.config {
                OtherProductionConfig::Fixed { count } => count.is_sign_negative(),
                OtherProductionConfig::Percentage { percentage, .. } => {
                    percentage.is_sign_negative()
                }
                OtherProductionConfig::Segmented {
                    high_speed,
                    conventional,
                } => high_speed.percentage.is_sign_negative()
                    || conventional.percentage.is_sign_negative(),
                OtherProductionConfig::Formula { .. } => false,
            };
            if negative {
                return Err(invalid(format!("rule '{}' has a negative parameter", rule.id)));
            }
        }

        let rates = std::iter::once(self.reserve_rates.main_production)
            .chain(std::iter::once(self.reserve_rates.other_production))
            .chain(
                self.reserve_rates
                    .units
                    .values()
                    .flat_map(|u| [u.main_production, u.other_production]),
            )
            .flatten();
        for rate in rates {
            if rate.is_sign_negative() {
                return Err(invalid("reserve rates must not be negative".to_string()));
            }
        }

        Ok(())
    }

    /// Lists rule parameters that will fall back at calculation time.
    ///
    /// # Example
    ///
    /// ```
    /// use crew_staffing_engine::config::{
    ///     CarRatio, ConventionalRule, ConventionalStaffing, StaffingStandard,
    /// };
    /// use crew_staffing_engine::models::CarType;
    ///
    /// let mut standard = StaffingStandard::empty("demo");
    /// standard.conventional_rules.push(ConventionalRule {
    ///     id: "k-1".to_string(),
    ///     name: "K".to_string(),
    ///     conditions: Default::default(),
    ///     staffing: ConventionalStaffing {
    ///         car_ratios: vec![CarRatio {
    ///             car_type: CarType::Seat,
    ///             ratio: "one per car".to_string(),
    ///             min_staff: 1,
    ///         }],
    ///         ..Default::default()
    ///     },
    /// });
    /// assert_eq!(standard.lint().len(), 1);
    /// ```
    pub fn lint(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        for rule in &self.conventional_rules {
            for ratio in &rule.staffing.car_ratios {
                if parse_ratio(&ratio.ratio).is_none() {
                    warnings.push(format!(
                        "rule '{}': ratio '{}' is not readable, min_staff {} will be used",
                        rule.id, ratio.ratio, ratio.min_staff
                    ));
                }
            }
        }
        for rule in &self.other_production_rules {
            if let OtherProductionConfig::Formula { expression } = &rule.config {
                if parse_formula(expression).is_none() {
                    warnings.push(format!(
                        "rule '{}': formula '{}' is not supported, 0 will be used",
                        rule.id, expression
                    ));
                }
            }
        }
        warnings
    }
}
