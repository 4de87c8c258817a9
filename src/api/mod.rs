//! HTTP API module for the Crew Staffing Engine.
//!
//! This module provides the REST API endpoints for calculating crew staffing
//! of a bureau's units against its configured staffing standard.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{AllCalculationRequest, UnitCalculationRequest};
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
