//! Workforce API wire models
//!
//! Field names follow the workforce API's Hungarian-style JSON keys
//! (`intStartTimestamp`, `strComment`, ...). Records returned by the API
//! keep every field they arrive with so the proxy endpoints can pass them
//! through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Error;

/// Employee as listed by the workforce API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    #[serde(rename = "Id")]
    pub id: u64,

    #[serde(rename = "DisplayName", default)]
    pub display_name: String,

    /// Remaining upstream fields, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmployeeRecord {
    pub fn new(id: u64, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            extra: Map::new(),
        }
    }
}

/// Company/location as listed by the workforce API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(rename = "Id")]
    pub id: u64,

    #[serde(rename = "CompanyName", default)]
    pub company_name: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Shift-creation payload (`POST supervise/roster`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateShiftRequest {
    #[serde(rename = "intStartTimestamp")]
    pub start_timestamp: i64,

    #[serde(rename = "intEndTimestamp")]
    pub end_timestamp: i64,

    #[serde(rename = "intRosterEmployee")]
    pub employee_id: u64,

    #[serde(rename = "blnPublish", default = "default_true")]
    pub publish: bool,

    #[serde(rename = "intMealbreakMinute", default)]
    pub mealbreak_minutes: u32,

    #[serde(rename = "intOpunitId")]
    pub opunit_id: u64,

    #[serde(rename = "blnForceOverwrite", default)]
    pub force_overwrite: bool,

    #[serde(rename = "blnOpen", default)]
    pub open: bool,

    #[serde(rename = "strComment", default)]
    pub comment: String,

    #[serde(rename = "intConfirmStatus", default)]
    pub confirm_status: u32,
}

fn default_true() -> bool {
    true
}

/// Default last name for employees created without one
pub const DEFAULT_LAST_NAME: &str = "Doe";

/// Inbound employee-creation body accepted by the relay
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEmployee {
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    pub company_id: u64,
    pub location_id: u64,
}

/// Employee-creation payload (`POST supervise/employee`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateEmployeeRequest {
    #[serde(rename = "strFirstName")]
    pub first_name: String,

    #[serde(rename = "strLastName")]
    pub last_name: String,

    #[serde(rename = "intCompanyId")]
    pub company_id: u64,

    #[serde(rename = "intMainLocationId")]
    pub location_id: u64,
}

impl TryFrom<NewEmployee> for CreateEmployeeRequest {
    type Error = Error;

    /// Fails with [`Error::InvalidInput`] when `firstName` is blank
    fn try_from(input: NewEmployee) -> Result<Self, Self::Error> {
        let first_name = input.first_name.trim().to_string();
        if first_name.is_empty() {
            return Err(Error::InvalidInput("firstName must not be empty".to_string()));
        }

        let last_name = input
            .last_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_LAST_NAME.to_string());

        Ok(Self {
            first_name,
            last_name,
            company_id: input.company_id,
            location_id: input.location_id,
        })
    }
}

/// Pull the record id out of a created-record response
pub fn record_id(record: &Value) -> Option<u64> {
    match record.get("Id")? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
