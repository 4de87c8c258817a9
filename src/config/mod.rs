//! Configuration loading and management for the crew staffing engine.
//!
//! This module provides the per-bureau staffing standards (rulebooks for the
//! three train families plus reserve rates and standard work hours) and the
//! engine settings, loaded from YAML files.
//!
//! # Example
//!
//! ```no_run
//! use crew_staffing_engine::config::StandardLoader;
//!
//! let loader = StandardLoader::load("./config").unwrap();
//! println!("Reference hours: {}", loader.settings().reference_standard_hours);
//! ```

mod loader;
mod types;

pub use loader::StandardLoader;
pub use types::{
    BaseTotal, CarRatio, ConventionalConditions, ConventionalRule, ConventionalStaffing,
    EngineSettings, HighSpeedConditions, HighSpeedRule, HighSpeedStaffing, OtherProductionConfig,
    OtherProductionRule, ReserveRates, Segment, StaffingStandard, TimeRange, UnitReserveRates,
};
