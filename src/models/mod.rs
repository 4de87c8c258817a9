//! Core data models for the crew staffing engine.
//!
//! This module contains the input record model and the result value objects
//! produced by a calculation run.

mod other_production_result;
mod staffing_result;
mod train;

pub use other_production_result::{OtherProductionItem, OtherProductionUnitResult};
pub use staffing_result::{
    CrewRole, DisplayStaffing, ExactStaffing, MatchResult, MatchTier, RoleBreakdown, TrainFamily,
    TrainStaffingResult, UnitStaffingResult, UnmatchedTrain,
};
pub use train::{CarCounts, CarType, FieldValue, TimeBucket, TrainAttributes, TrainRecord};
