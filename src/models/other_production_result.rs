//! Result models for derived ("other production") staffing.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Staffing computed by one derived rule for one position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherProductionItem {
    /// ID of the rule that was applied.
    pub rule_id: String,
    /// Name of the rule.
    pub rule_name: String,
    /// Position the rule staffs (e.g. "车队管理").
    pub position: String,
    /// Calculation method label (`fixed`, `percentage`, `segmented`, `formula`).
    pub method: String,
    /// Un-rounded headcount.
    pub exact: Decimal,
    /// `ceil(exact)`, for display only.
    pub display: u32,
    /// Human-readable calculation trace for audit display.
    pub trace: String,
}

/// Aggregate derived staffing for one bureau/unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherProductionUnitResult {
    /// Unique identifier for this calculation.
    pub calculation_id: Uuid,
    /// When the calculation was performed.
    pub timestamp: DateTime<Utc>,
    /// The version of the engine that performed the calculation.
    pub engine_version: String,
    /// Bureau whose standard was applied.
    pub bureau: String,
    /// Physical unit being staffed.
    pub unit: String,
    /// High-speed total staff used as an input.
    pub high_speed_total: Decimal,
    /// Conventional total staff used as an input.
    pub conventional_total: Decimal,
    /// High-speed plus conventional.
    pub main_production_total: Decimal,
    /// One item per staffed position.
    pub items: Vec<OtherProductionItem>,
    /// Sum of exact item values.
    pub exact_base_total_staff: Decimal,
    /// `ceil(exact_base_total_staff)`.
    pub base_total_staff: u32,
    /// Reserve uplift in percent.
    pub reserve_rate: Decimal,
    /// `ceil(exact_base_total_staff * (1 + reserve_rate / 100))`.
    pub total_staff: u32,
    /// Non-fatal issues (e.g. formulas that fell back to zero).
    pub warnings: Vec<String>,
}
