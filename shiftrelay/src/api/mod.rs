//! HTTP API handlers for shiftrelay
//!
//! - `/health`
//! - `/api/employees`, `/api/locations`, `/api/shifts`: workforce proxy
//! - `/api/schedule/analyze`: schedule image pipeline

pub mod health;
pub mod schedule;
pub mod workforce;

pub use health::health_routes;
pub use schedule::schedule_routes;
pub use workforce::workforce_routes;
