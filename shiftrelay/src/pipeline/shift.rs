//! Extracted shift candidates and their normalization
//!
//! Model output is loosely typed: booleans show up as `0`/`1`, numbers as
//! strings, and field names drift. [`ShiftCandidate::from_value`] reads
//! whatever is there without failing; [`ValidatedShift::from_candidate`]
//! then fills every gap through the validate-or-default combinator.

use serde::Serialize;
use serde_json::{Map, Value};
use shiftrelay_common::config::ShiftDefaults;
use shiftrelay_common::time::{or_default, to_epoch_seconds, Defaulted, DEFAULT_SHIFT_SECONDS};
use std::fmt;
use tracing::warn;

/// Who a shift is for, as written in the schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EmployeeRef {
    /// Explicit workforce employee id
    Id(u64),
    /// Free-text name
    Name(String),
}

impl EmployeeRef {
    /// Numbers and all-digit strings are ids; other non-blank text is a name
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_u64().map(EmployeeRef::Id),
            Value::String(s) => {
                let s = s.trim();
                if s.is_empty() {
                    None
                } else if s.bytes().all(|b| b.is_ascii_digit()) {
                    s.parse().ok().map(EmployeeRef::Id)
                } else {
                    Some(EmployeeRef::Name(s.to_string()))
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for EmployeeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmployeeRef::Id(id) => write!(f, "{}", id),
            EmployeeRef::Name(name) => f.write_str(name),
        }
    }
}

/// One shift as the model described it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftCandidate {
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub employee_ref: Option<EmployeeRef>,
    pub comment: Option<String>,
    pub publish: Option<bool>,
    pub mealbreak_minutes: Option<u32>,
    pub opunit_id: Option<u64>,
    pub overwrite: Option<bool>,
    pub open: Option<bool>,
    pub confirm_status: Option<u32>,
}

impl ShiftCandidate {
    /// Read a candidate out of one parsed element; non-objects yield an empty candidate
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        Self {
            date: field(obj, &["date", "strDate"]).and_then(as_text).unwrap_or_default(),
            start_time: field(obj, &["startTime", "start"])
                .and_then(as_text)
                .unwrap_or_default(),
            end_time: field(obj, &["endTime", "end"]).and_then(as_text).unwrap_or_default(),
            employee_ref: field(obj, &["employeeRef", "employee", "employeeName", "intRosterEmployee"])
                .and_then(EmployeeRef::from_value),
            comment: field(obj, &["strComment", "comment"]).and_then(as_text),
            publish: field(obj, &["blnPublish", "publish"]).and_then(as_bool),
            mealbreak_minutes: field(obj, &["intMealbreakMinute", "mealbreakMinutes"])
                .and_then(as_u64)
                .and_then(|v| u32::try_from(v).ok()),
            opunit_id: field(obj, &["intOpunitId", "opunitId"]).and_then(as_u64),
            overwrite: field(obj, &["blnForceOverwrite", "overwrite"]).and_then(as_bool),
            open: field(obj, &["blnOpen", "open"]).and_then(as_bool),
            confirm_status: field(obj, &["intConfirmStatus", "confirmStatus"])
                .and_then(as_u64)
                .and_then(|v| u32::try_from(v).ok()),
        }
    }
}

/// A candidate with every field resolved
#[derive(Debug, Clone)]
pub struct ValidatedShift {
    /// Position in the extracted batch
    pub index: usize,
    pub candidate: ShiftCandidate,
    pub start: Defaulted<i64>,
    /// Not checked against `start`
    pub end: Defaulted<i64>,
    pub mealbreak_minutes: Defaulted<u32>,
    pub opunit_id: Defaulted<u64>,
    pub publish: bool,
    pub overwrite: bool,
    pub open: bool,
    pub confirm_status: u32,
    pub comment: String,
}

impl ValidatedShift {
    /// Normalize timestamps and fill defaults
    ///
    /// Unparseable start becomes `now`, unparseable end `now + 8h`.
    pub fn from_candidate(
        index: usize,
        candidate: ShiftCandidate,
        now: i64,
        defaults: &ShiftDefaults,
    ) -> Self {
        let start = or_default(
            to_epoch_seconds(&candidate.date, &candidate.start_time),
            || now,
        );
        let end = or_default(to_epoch_seconds(&candidate.date, &candidate.end_time), || {
            now + DEFAULT_SHIFT_SECONDS
        });
        let mealbreak_minutes = or_default(candidate.mealbreak_minutes, || defaults.mealbreak_minutes);
        let opunit_id = or_default(candidate.opunit_id, || defaults.opunit_id);

        let shift = Self {
            index,
            start,
            end,
            mealbreak_minutes,
            opunit_id,
            publish: candidate.publish.unwrap_or(true),
            overwrite: candidate.overwrite.unwrap_or(false),
            open: candidate.open.unwrap_or(false),
            confirm_status: candidate.confirm_status.unwrap_or(0),
            comment: synthesize_comment(&candidate),
            candidate,
        };

        if start.defaulted || end.defaulted {
            warn!(
                shift_index = index,
                date = %shift.candidate.date,
                start_time = %shift.candidate.start_time,
                end_time = %shift.candidate.end_time,
                start_defaulted = start.defaulted,
                end_defaulted = end.defaulted,
                "Shift time could not be parsed, substituting default"
            );
        }

        shift
    }

    /// Names of fields that fell back to a default
    pub fn defaulted_fields(&self) -> Vec<&'static str> {
        [
            ("start", self.start.defaulted),
            ("end", self.end.defaulted),
            ("mealbreakMinutes", self.mealbreak_minutes.defaulted),
            ("opunitId", self.opunit_id.defaulted),
        ]
        .into_iter()
        .filter_map(|(name, defaulted)| defaulted.then_some(name))
        .collect()
    }
}

fn synthesize_comment(candidate: &ShiftCandidate) -> String {
    match (&candidate.comment, &candidate.employee_ref) {
        (Some(comment), _) => comment.clone(),
        (None, Some(reference)) => format!("Shift for {} (imported from schedule image)", reference),
        (None, None) => "Imported from schedule image".to_string(),
    }
}

/// First present, non-null field among `names`
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| obj.get(*name))
        .find(|v| !v.is_null())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}
