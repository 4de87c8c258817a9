//! Request types for the Crew Staffing Engine API.
//!
//! This module defines the JSON request structures for the `/calculate/*`
//! endpoints. Train records are passed through as open field maps.

use serde::{Deserialize, Serialize};

use crate::models::TrainRecord;

/// Request body for `/calculate/high-speed` and `/calculate/conventional`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitCalculationRequest {
    /// Bureau whose staffing standard applies.
    pub bureau: String,
    /// Unit being staffed.
    pub unit: String,
    /// Imported schedule records.
    #[serde(default)]
    pub records: Vec<TrainRecord>,
}

/// Request body for `/calculate/all`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllCalculationRequest {
    /// Bureau whose staffing standard applies.
    pub bureau: String,
    /// Unit being staffed.
    pub unit: String,
    /// High-speed schedule records.
    #[serde(default)]
    pub high_speed_records: Vec<TrainRecord>,
    /// Conventional schedule records.
    #[serde(default)]
    pub conventional_records: Vec<TrainRecord>,
}
