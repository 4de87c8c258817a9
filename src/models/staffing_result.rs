//! Staffing result models.
//!
//! This module contains the per-train [`TrainStaffingResult`] and the per-unit
//! [`UnitStaffingResult`] produced by a calculation run. Results are value
//! objects: a recalculation builds a new tree and the caller replaces the old
//! one wholesale.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::TrainRecord;

/// The three train families the engine calculates for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainFamily {
    /// High-speed (动车组) trains.
    HighSpeed,
    /// Conventional (普速) trains.
    Conventional,
    /// Derived "other production" staff.
    OtherProduction,
}

impl fmt::Display for TrainFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrainFamily::HighSpeed => "high_speed",
            TrainFamily::Conventional => "conventional",
            TrainFamily::OtherProduction => "other_production",
        };
        f.write_str(label)
    }
}

/// An on-board crew position.
///
/// The declaration order is also the tie-break order used when a rounding
/// remainder has to be assigned to one of several equally large roles:
/// attendant-type roles first, then the conductor, then specialty roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrewRole {
    /// General train attendant (列车员).
    TrainAttendant,
    /// Seat-car attendant.
    SeatCarAttendant,
    /// Hard-sleeper attendant.
    HardSleeperAttendant,
    /// Soft-sleeper attendant.
    SoftSleeperAttendant,
    /// Conductor / train chief (列车长).
    Conductor,
    /// Business-class attendant (商务座服务员).
    BusinessClassAttendant,
    /// Dining-car staff.
    DiningCarStaff,
    /// Baggage-car staff.
    BaggageStaff,
    /// Broadcaster.
    Broadcaster,
}

/// Un-rounded crew breakdown. This is what aggregation sums.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExactStaffing {
    /// Exact count per role.
    pub roles: BTreeMap<CrewRole, Decimal>,
    /// Sum of all roles.
    pub total: Decimal,
}

impl ExactStaffing {
    /// Builds an exact breakdown, computing the total from the roles.
    pub fn from_roles(roles: BTreeMap<CrewRole, Decimal>) -> Self {
        let total = roles.values().copied().sum();
        Self { roles, total }
    }

    /// Returns the exact count for a role (zero if not staffed).
    pub fn role(&self, role: CrewRole) -> Decimal {
        self.roles.get(&role).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Rounded crew breakdown for display; `roles` always sum to `total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayStaffing {
    /// Whole-person count per role.
    pub roles: BTreeMap<CrewRole, u32>,
    /// Displayed total.
    pub total: u32,
}

impl DisplayStaffing {
    /// Returns the displayed count for a role (zero if not staffed).
    pub fn role(&self, role: CrewRole) -> u32 {
        self.roles.get(&role).copied().unwrap_or(0)
    }
}

/// Which tier of the matching strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchTier {
    /// Privileged train-type rule (conventional).
    TypePriority,
    /// Every declared condition agreed.
    FullCondition,
    /// Formation matched a rule without a running-time bound (high-speed).
    UnboundedTime,
    /// Train type and time bucket only (conventional).
    TypeOnly,
    /// Bureau default rule type (conventional).
    GenericFallback,
}

/// The best rule for one train and the conditions that agreed.
///
/// Created fresh for each train and never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult<'a, R> {
    /// The matched rule.
    pub rule: &'a R,
    /// The tier that produced the match.
    pub tier: MatchTier,
    /// Human-readable conditions that agreed (e.g. `formation=8编组`).
    pub matched_conditions: Vec<String>,
}

/// Staffing for one representative train record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainStaffingResult {
    /// Sequence key of the working.
    pub sequence: String,
    /// Train number, if present.
    pub train_number: Option<String>,
    /// Whether a rule matched.
    pub is_matched: bool,
    /// ID of the matched rule.
    pub rule_id: Option<String>,
    /// Name of the matched rule.
    pub rule_name: Option<String>,
    /// Tier that produced the match.
    pub match_tier: Option<MatchTier>,
    /// Conditions that agreed.
    pub matched_conditions: Vec<String>,
    /// Group count after the adjustment factor.
    pub effective_group_count: Decimal,
    /// Work-hour adjustment factor applied to the group count.
    pub adjustment_factor: Decimal,
    /// Un-rounded staffing.
    pub exact: ExactStaffing,
    /// Rounded staffing for display.
    pub display: DisplayStaffing,
    /// Non-fatal issues found while calculating.
    pub warnings: Vec<String>,
}

/// A train that no rule covered, with a remediation hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmatchedTrain {
    /// The representative record as imported.
    pub train_data: TrainRecord,
    /// Why no rule matched.
    pub reason: String,
    /// The rule that would cover this train.
    pub suggested_action: String,
}

/// Exact and displayed headcount of one role across a unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBreakdown {
    /// The role.
    pub role: CrewRole,
    /// Exact sum over matched trains.
    pub exact: Decimal,
    /// Displayed share of the base total.
    pub display: u32,
}

/// Aggregate staffing for one bureau/unit and one train family.
///
/// # Example
///
/// ```
/// use crew_staffing_engine::calculation::StaffingEngine;
/// use crew_staffing_engine::config::{EngineSettings, StaffingStandard};
///
/// let engine = StaffingEngine::new(EngineSettings::default());
/// let standard = StaffingStandard::empty("demo");
/// let result = engine.calculate_high_speed(&standard, "depot-1", &[]);
/// assert_eq!(result.total_staff, 0);
/// assert_eq!(result.coverage_rate.to_string(), "100");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitStaffingResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// Bureau whose standard was applied.
    pub bureau: String,
    /// Physical unit (e.g. a passenger depot) being staffed.
    pub unit: String,
    /// Train family.
    pub family: TrainFamily,
    /// Distinct workings (sequence keys); the coverage denominator.
    pub total_groups: usize,
    /// Workings that matched a rule.
    pub matched_count: usize,
    /// Workings that matched no rule.
    pub unmatched_count: usize,
    /// Sum of exact per-train totals.
    pub exact_base_total_staff: Decimal,
    /// `ceil(exact_base_total_staff)`.
    pub base_total_staff: u32,
    /// Reserve uplift in percent.
    pub reserve_rate: Decimal,
    /// `ceil(exact_base_total_staff * (1 + reserve_rate / 100))`.
    pub total_staff: u32,
    /// Matched share of workings, in percent.
    pub coverage_rate: Decimal,
    /// Per-role totals.
    pub role_breakdown: Vec<RoleBreakdown>,
    /// Per-train results, one per working.
    pub train_results: Vec<TrainStaffingResult>,
    /// Diagnostics for trains without a rule.
    pub unmatched_trains: Vec<UnmatchedTrain>,
}
