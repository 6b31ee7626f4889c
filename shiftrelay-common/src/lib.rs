//! # shiftrelay common library
//!
//! Shared code for the shiftrelay service:
//! - Error and result types
//! - Configuration loading and resolution
//! - Workforce API wire models
//! - Schedule timestamp normalization

pub mod config;
pub mod error;
pub mod models;
pub mod time;

pub use error::{Error, Result};
