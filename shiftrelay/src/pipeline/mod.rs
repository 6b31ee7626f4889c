//! Image-to-shift pipeline
//!
//! ```text
//! image -> model text -> repair -> candidates -> normalize -> resolve -> gate -> submit
//! ```
//!
//! - [`repair`]: model text to JSON values
//! - [`shift`]: candidates and timestamp/default normalization
//! - [`resolver`]: tiered employee name matching
//! - [`batch`]: all-or-nothing resolution gate, then sequential submission

pub mod batch;
pub mod repair;
pub mod resolver;
pub mod shift;

pub use batch::{process_batch, BatchOutcome, ProcessedShift, SubmissionResult, UnresolvedShift};
pub use repair::{repair_shift_json, RepairError};
pub use resolver::{resolve, MatchResult, MatchTier};
pub use shift::{EmployeeRef, ShiftCandidate, ValidatedShift};

use shiftrelay_common::config::ShiftDefaults;
use tracing::{info, warn};

use crate::clients::{ScheduleVision, UpstreamError, WorkforceApi};

/// Result of analyzing one schedule image
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    /// Model text could not be repaired into JSON
    Unparseable { error: RepairError, raw: String },
    /// Parsed, but the model listed no shifts
    Empty,
    Batch(BatchOutcome),
}

/// Run the whole pipeline for one uploaded image
///
/// Only a failed model call is an `Err`; everything after it is reported
/// through [`AnalysisOutcome`].
pub async fn analyze_schedule(
    vision: &dyn ScheduleVision,
    workforce: &dyn WorkforceApi,
    image: &[u8],
    mime_type: &str,
    defaults: &ShiftDefaults,
) -> Result<AnalysisOutcome, UpstreamError> {
    let raw = vision.extract_schedule(image, mime_type).await?;
    info!(response_chars = raw.len(), "Model response received");

    let values = match repair_shift_json(&raw) {
        Ok(values) => values,
        Err(error) => {
            warn!(error = %error, "Model response could not be parsed");
            return Ok(AnalysisOutcome::Unparseable { error, raw });
        }
    };

    if values.is_empty() {
        info!("Model found no shifts in image");
        return Ok(AnalysisOutcome::Empty);
    }

    let now = chrono::Utc::now().timestamp();
    let shifts: Vec<ValidatedShift> = values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            ValidatedShift::from_candidate(index, ShiftCandidate::from_value(value), now, defaults)
        })
        .collect();

    info!(shifts = shifts.len(), "Extracted shift candidates");
    let outcome = process_batch(workforce, shifts).await;
    info!(
        total = outcome.total(),
        blocked = matches!(outcome, BatchOutcome::Blocked { .. }),
        "Schedule analysis finished"
    );
    Ok(AnalysisOutcome::Batch(outcome))
}
