//! HTTP request handlers for the Crew Staffing Engine API.
//!
//! This module contains the handler functions for all API endpoints. The
//! handlers only decode requests, look up the bureau's standard and hand the
//! records to the [`StaffingEngine`](crate::calculation::StaffingEngine).

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::calculation::StaffingEngine;
use crate::config::StaffingStandard;
use crate::models::{TrainFamily, TrainRecord, UnitStaffingResult};

use super::request::{AllCalculationRequest, UnitCalculationRequest};
use super::response::{ApiError, ApiErrorResponse};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/calculate/high-speed", post(high_speed_handler))
        .route("/calculate/conventional", post(conventional_handler))
        .route("/calculate/all", post(all_handler))
        .with_state(state)
}

/// Handler for POST /calculate/high-speed.
async fn high_speed_handler(
    State(state): State<AppState>,
    payload: Result<Json<UnitCalculationRequest>, JsonRejection>,
) -> Response {
    calculate_unit(
        &state,
        payload,
        TrainFamily::HighSpeed,
        StaffingEngine::calculate_high_speed,
    )
}

/// Handler for POST /calculate/conventional.
async fn conventional_handler(
    State(state): State<AppState>,
    payload: Result<Json<UnitCalculationRequest>, JsonRejection>,
) -> Response {
    calculate_unit(
        &state,
        payload,
        TrainFamily::Conventional,
        StaffingEngine::calculate_conventional,
    )
}

/// Per-train family calculation run by [`calculate_unit`].
type FamilyCalculation =
    fn(&StaffingEngine, &StaffingStandard, &str, &[TrainRecord]) -> UnitStaffingResult;

fn calculate_unit(
    state: &AppState,
    payload: Result<Json<UnitCalculationRequest>, JsonRejection>,
    family: TrainFamily,
    calculate: FamilyCalculation,
) -> Response {
    // Generate correlation ID for request tracking
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, family = %family, "Processing unit calculation request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let standard = match state.standards().get_standard(&request.bureau) {
        Ok(standard) => standard,
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                bureau = %request.bureau,
                "Staffing standard not found"
            );
            return ApiErrorResponse::from(err).into_response();
        }
    };

    let start_time = Instant::now();
    let result = calculate(state.engine(), standard, &request.unit, &request.records);

    info!(
        correlation_id = %correlation_id,
        bureau = %request.bureau,
        unit = %request.unit,
        records = request.records.len(),
        total_staff = result.total_staff,
        coverage_rate = %result.coverage_rate,
        duration_us = start_time.elapsed().as_micros(),
        "Calculation completed successfully"
    );
    json_response(&result)
}

/// Handler for POST /calculate/all.
///
/// Runs high-speed and conventional staffing, then derived staffing on their
/// totals, and reports the rules that would cover the unmatched trains.
async fn all_handler(
    State(state): State<AppState>,
    payload: Result<Json<AllCalculationRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing calculate-all request");

    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return rejection_response(correlation_id, rejection),
    };

    let standard = match state.standards().get_standard(&request.bureau) {
        Ok(standard) => standard,
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                bureau = %request.bureau,
                "Staffing standard not found"
            );
            return ApiErrorResponse::from(err).into_response();
        }
    };

    let start_time = Instant::now();
    let results = state.engine().calculate_all(
        standard,
        &request.unit,
        &request.high_speed_records,
        &request.conventional_records,
    );

    info!(
        correlation_id = %correlation_id,
        bureau = %request.bureau,
        unit = %request.unit,
        high_speed_total = results.high_speed.total_staff,
        conventional_total = results.conventional.total_staff,
        other_production_total = results.other_production.total_staff,
        uncovered_rules = results.uncovered_rules.len(),
        duration_us = start_time.elapsed().as_micros(),
        "Calculation completed successfully"
    );
    json_response(&results)
}

fn json_response<T: Serialize>(body: &T) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

/// Maps a JSON extraction failure to a 400 response.
fn rejection_response(correlation_id: Uuid, rejection: JsonRejection) -> Response {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            // The body text carries serde's detailed message
            let body_text = err.body_text();
            warn!(
                correlation_id = %correlation_id,
                error = %body_text,
                "JSON data error"
            );
            if body_text.contains("missing field") {
                ApiError::validation_error(body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "JSON syntax error"
            );
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    (
        StatusCode::BAD_REQUEST,
        [(header::CONTENT_TYPE, "application/json")],
        Json(error),
    )
        .into_response()
}
