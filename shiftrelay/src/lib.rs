//! shiftrelay library interface
//!
//! Relays employee/shift requests to a workforce-management API and turns
//! uploaded schedule images into shifts through a generative model.

pub mod api;
pub mod clients;
pub mod error;
pub mod pipeline;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use shiftrelay_common::config::{RelayConfig, ShiftDefaults};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::clients::{GeminiClient, ScheduleVision, WorkforceApi, WorkforceClient};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Workforce API client
    pub workforce: Arc<dyn WorkforceApi>,
    /// Schedule-reading model client
    pub vision: Arc<dyn ScheduleVision>,
    /// Largest accepted schedule image in bytes
    pub max_upload_bytes: usize,
    /// Values for numeric shift fields the model leaves out
    pub shift_defaults: ShiftDefaults,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Build the real upstream clients from configuration
    pub fn from_config(config: &RelayConfig) -> shiftrelay_common::Result<Self> {
        let workforce = WorkforceClient::new(&config.workforce, config.upstream_timeout)?;
        let vision = GeminiClient::new(&config.gemini, config.upstream_timeout)?;

        Ok(Self::new(
            Arc::new(workforce),
            Arc::new(vision),
            config.max_upload_bytes,
            config.shift_defaults,
        ))
    }

    pub fn new(
        workforce: Arc<dyn WorkforceApi>,
        vision: Arc<dyn ScheduleVision>,
        max_upload_bytes: usize,
        shift_defaults: ShiftDefaults,
    ) -> Self {
        Self {
            workforce,
            vision,
            max_upload_bytes,
            shift_defaults,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api::workforce_routes())
        .merge(api::schedule_routes(max_upload_bytes))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
