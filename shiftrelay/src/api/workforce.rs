//! Workforce proxy handlers
//!
//! GET/POST /api/employees, GET /api/locations, POST /api/shifts.
//! Upstream records pass through unchanged; upstream failures keep their
//! status and payload (see [`ApiError::Upstream`]).

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::Value;
use shiftrelay_common::models::{
    CreateEmployeeRequest, CreateShiftRequest, EmployeeRecord, Location, NewEmployee,
};

use crate::{error::ApiResult, AppState};

/// GET /api/employees
pub async fn list_employees(State(state): State<AppState>) -> ApiResult<Json<Vec<EmployeeRecord>>> {
    let employees = state.workforce.list_employees().await?;
    Ok(Json(employees))
}

/// POST /api/employees
///
/// `firstName` must not be blank; `lastName` defaults to "Doe" when omitted or blank.
pub async fn create_employee(
    State(state): State<AppState>,
    Json(request): Json<NewEmployee>,
) -> ApiResult<Json<Value>> {
    let payload = CreateEmployeeRequest::try_from(request)?;
    let created = state.workforce.create_employee(&payload).await?;

    tracing::info!(
        first_name = %payload.first_name,
        last_name = %payload.last_name,
        company_id = payload.company_id,
        "Employee created"
    );
    Ok(Json(created))
}

/// GET /api/locations
pub async fn list_locations(State(state): State<AppState>) -> ApiResult<Json<Vec<Location>>> {
    let locations = state.workforce.list_locations().await?;
    Ok(Json(locations))
}

/// POST /api/shifts
pub async fn create_shift(
    State(state): State<AppState>,
    Json(request): Json<CreateShiftRequest>,
) -> ApiResult<Json<Value>> {
    let created = state.workforce.create_shift(&request).await?;

    tracing::info!(
        employee_id = request.employee_id,
        start = request.start_timestamp,
        end = request.end_timestamp,
        "Shift created"
    );
    Ok(Json(created))
}

/// Build workforce proxy routes
pub fn workforce_routes() -> Router<AppState> {
    Router::new()
        .route("/api/employees", get(list_employees).post(create_employee))
        .route("/api/locations", get(list_locations))
        .route("/api/shifts", post(create_shift))
}
