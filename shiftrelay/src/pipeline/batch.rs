//! Batch submission
//!
//! Two sub-stages with different failure policies:
//! - **Resolution** is all-or-nothing. Every shift is resolved first; if any
//!   employee cannot be found, nothing is submitted and the caller gets the
//!   full list of processed and unresolved shifts.
//! - **Submission** is per-item. Shifts are created one at a time, in order;
//!   an upstream failure is recorded and the next shift is still attempted.
//!
//! No retries and no concurrency: the workforce API documents neither rate
//! limits nor concurrent-write behavior.

use serde::Serialize;
use serde_json::Value;
use shiftrelay_common::models::{record_id, CreateShiftRequest};
use tracing::{error, info, warn};

use super::resolver::{reference_for, resolve, MatchResult, MatchTier};
use super::shift::{ShiftCandidate, ValidatedShift};
use crate::clients::WorkforceApi;

/// Resolution details kept for operators
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDebug {
    pub extracted_name: Option<String>,
    pub candidates_checked: usize,
    pub match_found: bool,
    pub match_tier: Option<MatchTier>,
    pub defaulted_fields: Vec<&'static str>,
}

/// A shift whose employee resolved, ready to submit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedShift {
    pub index: usize,
    pub employee_name: String,
    pub shift: CreateShiftRequest,
    pub debug: MatchDebug,
}

/// A shift whose employee could not be found
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnresolvedShift {
    pub index: usize,
    pub reference: Option<String>,
    pub error: String,
    pub shift: ShiftCandidate,
    pub debug: MatchDebug,
}

/// Outcome of one create-shift call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResult {
    pub index: usize,
    pub success: bool,
    pub employee_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shift_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_status: Option<u16>,
    /// Raw provider error payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_error: Option<Value>,
}

/// What happened to a batch
#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// At least one employee was not found; zero shifts were created
    Blocked {
        processed: Vec<ProcessedShift>,
        unresolved: Vec<UnresolvedShift>,
    },
    /// Every shift resolved and a create call was made for each
    Submitted {
        processed: Vec<ProcessedShift>,
        results: Vec<SubmissionResult>,
    },
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        match self {
            BatchOutcome::Blocked { processed, unresolved } => processed.len() + unresolved.len(),
            BatchOutcome::Submitted { processed, .. } => processed.len(),
        }
    }
}

/// Resolve every shift, then submit only if all resolved
pub async fn process_batch(api: &dyn WorkforceApi, shifts: Vec<ValidatedShift>) -> BatchOutcome {
    let mut processed = Vec::with_capacity(shifts.len());
    let mut unresolved = Vec::new();

    for shift in shifts {
        match resolve_shift(api, shift).await {
            Ok(done) => processed.push(done),
            Err(failed) => unresolved.push(failed),
        }
    }

    if !unresolved.is_empty() {
        warn!(
            unresolved = unresolved.len(),
            processed = processed.len(),
            "Employees not found, no shifts submitted"
        );
        return BatchOutcome::Blocked {
            processed,
            unresolved,
        };
    }

    let mut results = Vec::with_capacity(processed.len());
    for shift in &processed {
        results.push(submit_shift(api, shift).await);
    }

    info!(
        submitted = results.iter().filter(|r| r.success).count(),
        failed = results.iter().filter(|r| !r.success).count(),
        "Batch submission finished"
    );

    BatchOutcome::Submitted { processed, results }
}

/// Fetch a fresh roster and resolve one shift's employee
async fn resolve_shift(
    api: &dyn WorkforceApi,
    shift: ValidatedShift,
) -> Result<ProcessedShift, UnresolvedShift> {
    let reference = reference_for(&shift.candidate);
    let extracted_name = reference.as_ref().map(|r| r.to_string());
    let defaulted_fields = shift.defaulted_fields();

    let unresolved = |error: String, candidates_checked: usize| UnresolvedShift {
        index: shift.index,
        reference: extracted_name.clone(),
        error,
        shift: shift.candidate.clone(),
        debug: MatchDebug {
            extracted_name: extracted_name.clone(),
            candidates_checked,
            match_found: false,
            match_tier: None,
            defaulted_fields: defaulted_fields.clone(),
        },
    };

    let Some(reference) = reference else {
        warn!(shift_index = shift.index, "Extracted shift has no employee reference");
        return Err(unresolved(
            "No employee reference found in extracted shift".to_string(),
            0,
        ));
    };

    let roster = match api.list_employees().await {
        Ok(roster) => roster,
        Err(e) => {
            error!(shift_index = shift.index, error = %e, "Failed to fetch roster");
            return Err(unresolved(format!("Failed to fetch employee list: {}", e), 0));
        }
    };

    match resolve(&reference, &roster) {
        MatchResult::Resolved {
            employee,
            tier,
            candidates_checked,
        } => {
            info!(
                shift_index = shift.index,
                reference = %reference,
                employee_id = employee.id,
                ?tier,
                candidates_checked,
                "Employee resolved"
            );
            Ok(ProcessedShift {
                index: shift.index,
                employee_name: employee.display_name.clone(),
                shift: CreateShiftRequest {
                    start_timestamp: shift.start.value,
                    end_timestamp: shift.end.value,
                    employee_id: employee.id,
                    publish: shift.publish,
                    mealbreak_minutes: shift.mealbreak_minutes.value,
                    opunit_id: shift.opunit_id.value,
                    force_overwrite: shift.overwrite,
                    open: shift.open,
                    comment: shift.comment.clone(),
                    confirm_status: shift.confirm_status,
                },
                debug: MatchDebug {
                    extracted_name: extracted_name.clone(),
                    candidates_checked,
                    match_found: true,
                    match_tier: Some(tier),
                    defaulted_fields: defaulted_fields.clone(),
                },
            })
        }
        MatchResult::Unresolved {
            reference,
            candidates_checked,
        } => {
            warn!(
                shift_index = shift.index,
                reference = %reference,
                candidates_checked,
                "Employee not found"
            );
            Err(unresolved(
                format!("Employee not found: {}", reference),
                candidates_checked,
            ))
        }
    }
}

async fn submit_shift(api: &dyn WorkforceApi, shift: &ProcessedShift) -> SubmissionResult {
    match api.create_shift(&shift.shift).await {
        Ok(record) => {
            let shift_id = record_id(&record);
            info!(
                shift_index = shift.index,
                employee_id = shift.shift.employee_id,
                shift_id = ?shift_id,
                "Shift created"
            );
            SubmissionResult {
                index: shift.index,
                success: true,
                employee_id: shift.shift.employee_id,
                shift_id,
                error: None,
                upstream_status: None,
                upstream_error: None,
            }
        }
        Err(e) => {
            error!(
                shift_index = shift.index,
                employee_id = shift.shift.employee_id,
                status = ?e.status(),
                error = %e,
                "Shift creation failed"
            );
            SubmissionResult {
                index: shift.index,
                success: false,
                employee_id: shift.shift.employee_id,
                shift_id: None,
                error: Some(e.message().to_string()),
                upstream_status: e.status(),
                upstream_error: e.payload().cloned(),
            }
        }
    }
}
