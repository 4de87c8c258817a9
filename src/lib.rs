//! Crew Staffing Engine for railway passenger trains
//!
//! This crate calculates how many conductors, attendants and other crew a
//! passenger-transport unit needs, by matching imported train schedules
//! against a bureau's configurable staffing standard. High-speed and
//! conventional trains are staffed per train and aggregated per unit; derived
//! "other production" positions are computed from those unit totals.

#![warn(missing_docs)]

pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
