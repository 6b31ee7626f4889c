//! Integration tests for shiftrelay HTTP endpoints
//!
//! The router runs against in-memory fakes for the workforce API and the
//! vision model, driven through `oneshot`.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use shiftrelay::clients::{ScheduleVision, UpstreamError, WorkforceApi};
use shiftrelay::{build_router, AppState};
use shiftrelay_common::config::ShiftDefaults;
use shiftrelay_common::models::{
    CreateEmployeeRequest, CreateShiftRequest, EmployeeRecord, Location,
};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

const BOUNDARY: &str = "shiftrelay-test-boundary";

/// Workforce API double recording every write
#[derive(Default)]
struct FakeWorkforce {
    roster: Vec<EmployeeRecord>,
    locations: Vec<Location>,
    /// Employee id whose shift creation is rejected with 409
    reject_shifts_for: Option<u64>,
    /// Status returned for every call when set
    down_with: Option<u16>,
    shifts: Mutex<Vec<CreateShiftRequest>>,
    employees: Mutex<Vec<CreateEmployeeRequest>>,
}

impl FakeWorkforce {
    fn with_roster(roster: Vec<EmployeeRecord>) -> Self {
        Self {
            roster,
            ..Default::default()
        }
    }

    fn outage(&self) -> Result<(), UpstreamError> {
        match self.down_with {
            Some(status) => Err(UpstreamError::Status {
                service: "workforce",
                status,
                message: "Access denied".to_string(),
                body: json!({"error": {"code": status, "message": "Access denied"}}),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl WorkforceApi for FakeWorkforce {
    async fn list_employees(&self) -> Result<Vec<EmployeeRecord>, UpstreamError> {
        self.outage()?;
        Ok(self.roster.clone())
    }

    async fn list_locations(&self) -> Result<Vec<Location>, UpstreamError> {
        self.outage()?;
        Ok(self.locations.clone())
    }

    async fn create_shift(&self, shift: &CreateShiftRequest) -> Result<Value, UpstreamError> {
        self.outage()?;
        if self.reject_shifts_for == Some(shift.employee_id) {
            return Err(UpstreamError::Status {
                service: "workforce",
                status: 409,
                message: "Shift overlaps an existing shift".to_string(),
                body: json!({"error": {"message": "Shift overlaps an existing shift"}}),
            });
        }
        let mut shifts = self.shifts.lock().unwrap();
        shifts.push(shift.clone());
        Ok(json!({"Id": 500 + shifts.len(), "Employee": shift.employee_id}))
    }

    async fn create_employee(
        &self,
        employee: &CreateEmployeeRequest,
    ) -> Result<Value, UpstreamError> {
        self.outage()?;
        self.employees.lock().unwrap().push(employee.clone());
        Ok(json!({"Id": 42, "FirstName": employee.first_name, "LastName": employee.last_name}))
    }
}

/// Vision model double returning a canned reply
struct FakeVision {
    reply: Result<String, &'static str>,
    calls: Mutex<Vec<String>>,
}

impl FakeVision {
    fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &'static str) -> Self {
        Self {
            reply: Err(message),
            calls: Mutex::new(Vec::new()),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ScheduleVision for FakeVision {
    async fn extract_schedule(&self, image: &[u8], mime_type: &str) -> Result<String, UpstreamError> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("{}:{}", mime_type, image.len()));
        self.reply.clone().map_err(|message| UpstreamError::Transport {
            service: "gemini",
            message: message.to_string(),
        })
    }
}

fn roster() -> Vec<EmployeeRecord> {
    vec![
        EmployeeRecord::new(7, "Alice Wong"),
        EmployeeRecord::new(9, "Bob Marley"),
    ]
}

fn setup_app(workforce: Arc<FakeWorkforce>, vision: Arc<FakeVision>) -> axum::Router {
    setup_app_with_limit(workforce, vision, 1024 * 1024)
}

fn setup_app_with_limit(
    workforce: Arc<FakeWorkforce>,
    vision: Arc<FakeVision>,
    max_upload_bytes: usize,
) -> axum::Router {
    let state = AppState::new(workforce, vision, max_upload_bytes, ShiftDefaults::default());
    build_router(state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Multipart upload with a single file field
fn upload(field: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"schedule\"\r\n",
            field
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", content_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/api/schedule/analyze")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn png_upload() -> Request<Body> {
    upload("image", "image/png", b"\x89PNG\r\n\x1a\nfake-image-data")
}

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

const TWO_SHIFTS: &str = r#"```json
[
  {"date": "2-Dec-24", "startTime": "9:00 AM", "endTime": "5:00 PM", "employeeRef": "Alice Wong", "strComment": "Opening"},
  {"date": "2-Dec-24", "startTime": "1:00 PM", "endTime": "9:30 PM", "employeeRef": 9, "intMealbreakMinute": 45},
]
```"#;

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let app = setup_app(
        Arc::new(FakeWorkforce::default()),
        Arc::new(FakeVision::replying("[]")),
    );

    let (status, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "shiftrelay");
    assert!(body["uptime_seconds"].is_u64());
}

// ============================================================================
// Workforce proxy
// ============================================================================

#[tokio::test]
async fn test_list_employees_passes_records_through() {
    let mut alice = EmployeeRecord::new(7, "Alice Wong");
    alice.extra.insert("Active".to_string(), json!(true));
    let app = setup_app(
        Arc::new(FakeWorkforce::with_roster(vec![alice])),
        Arc::new(FakeVision::replying("[]")),
    );

    let (status, body) = send(app, get("/api/employees")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"Id": 7, "DisplayName": "Alice Wong", "Active": true}]));
}

#[tokio::test]
async fn test_list_locations() {
    let workforce = FakeWorkforce {
        locations: vec![Location {
            id: 1,
            company_name: "Harbour Cafe".to_string(),
            extra: Default::default(),
        }],
        ..Default::default()
    };
    let app = setup_app(Arc::new(workforce), Arc::new(FakeVision::replying("[]")));

    let (status, body) = send(app, get("/api/locations")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["CompanyName"], "Harbour Cafe");
}

#[tokio::test]
async fn test_upstream_error_status_is_mirrored() {
    let workforce = FakeWorkforce {
        down_with: Some(403),
        ..Default::default()
    };
    let app = setup_app(Arc::new(workforce), Arc::new(FakeVision::replying("[]")));

    let (status, body) = send(app, get("/api/employees")).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
    assert_eq!(body["error"]["upstream_status"], 403);
    assert_eq!(body["error"]["details"]["error"]["message"], "Access denied");
}

#[tokio::test]
async fn test_create_employee_defaults_last_name() {
    let workforce = Arc::new(FakeWorkforce::default());
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying("[]")));

    let (status, body) = send(
        app,
        post_json(
            "/api/employees",
            json!({"firstName": "Carmen", "companyId": 3, "locationId": 4}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Id"], 42);

    let created = workforce.employees.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].first_name, "Carmen");
    assert_eq!(created[0].last_name, "Doe");
    assert_eq!(created[0].company_id, 3);
    assert_eq!(created[0].location_id, 4);
}

#[tokio::test]
async fn test_create_employee_rejects_blank_first_name() {
    let workforce = Arc::new(FakeWorkforce::default());
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying("[]")));

    let (status, body) = send(
        app,
        post_json(
            "/api/employees",
            json!({"firstName": "  ", "lastName": "Smith", "companyId": 3, "locationId": 4}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
    assert!(workforce.employees.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_create_shift_forwards_payload() {
    let workforce = Arc::new(FakeWorkforce::default());
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying("[]")));

    let (status, body) = send(
        app,
        post_json(
            "/api/shifts",
            json!({
                "intStartTimestamp": 1_733_130_000,
                "intEndTimestamp": 1_733_158_800,
                "intRosterEmployee": 7,
                "intOpunitId": 2,
                "strComment": "Manual"
            }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["Id"], 501);

    let shifts = workforce.shifts.lock().unwrap();
    assert_eq!(shifts[0].employee_id, 7);
    assert!(shifts[0].publish, "blnPublish defaults to true");
    assert_eq!(shifts[0].comment, "Manual");
}

// ============================================================================
// Schedule analysis
// ============================================================================

#[tokio::test]
async fn test_analyze_submits_every_resolved_shift() {
    let workforce = Arc::new(FakeWorkforce::with_roster(roster()));
    let vision = Arc::new(FakeVision::replying(TWO_SHIFTS));
    let app = setup_app(workforce.clone(), vision.clone());

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalShifts"], 2);
    assert_eq!(body["results"][0]["shiftId"], 501);
    assert_eq!(body["results"][1]["employeeId"], 9);
    assert_eq!(body["processedShifts"][0]["debug"]["matchTier"], "exact");
    assert_eq!(body["processedShifts"][1]["debug"]["matchTier"], "id");

    assert_eq!(vision.calls.lock().unwrap()[0], "image/png:23");

    let shifts = workforce.shifts.lock().unwrap();
    assert_eq!(shifts.len(), 2);
    assert_eq!(shifts[0].employee_id, 7);
    assert_eq!(shifts[0].end_timestamp - shifts[0].start_timestamp, 8 * 3600);
    assert_eq!(shifts[0].comment, "Opening");
    assert_eq!(shifts[0].mealbreak_minutes, 30);
    assert_eq!(shifts[1].employee_id, 9);
    assert_eq!(shifts[1].mealbreak_minutes, 45);
    assert_eq!(
        shifts[1].comment,
        "Shift for 9 (imported from schedule image)"
    );
}

#[tokio::test]
async fn test_analyze_blocks_batch_on_unknown_employee() {
    let reply = r#"[
        {"date": "2-Dec-24", "startTime": "9:00 AM", "endTime": "5:00 PM", "employeeRef": "Alice"},
        {"date": "2-Dec-24", "startTime": "9:00 AM", "endTime": "5:00 PM", "employeeRef": "Zed Quinn"}
    ]"#;
    let workforce = Arc::new(FakeWorkforce::with_roster(roster()));
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying(reply)));

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["totalShifts"], 2);
    assert_eq!(body["failedShifts"][0]["index"], 1);
    assert_eq!(body["failedShifts"][0]["reference"], "Zed Quinn");
    assert_eq!(body["failedShifts"][0]["debug"]["candidatesChecked"], 2);
    assert_eq!(body["processedShifts"][0]["employeeName"], "Alice Wong");
    assert!(
        workforce.shifts.lock().unwrap().is_empty(),
        "no shift may be created when any employee is unresolved"
    );
}

#[tokio::test]
async fn test_analyze_resolves_employee_from_comment() {
    let reply = r#"{"date": "2-Dec-24", "startTime": "9:00 AM", "endTime": "5:00 PM", "strComment": "Cover for Bob"}"#;
    let workforce = Arc::new(FakeWorkforce::with_roster(roster()));
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying(reply)));

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["processedShifts"][0]["debug"]["extractedName"], "Bob");
    assert_eq!(workforce.shifts.lock().unwrap()[0].employee_id, 9);
}

#[tokio::test]
async fn test_analyze_reports_per_shift_submission_failure() {
    let workforce = Arc::new(FakeWorkforce {
        roster: roster(),
        reject_shifts_for: Some(7),
        ..Default::default()
    });
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying(TWO_SHIFTS)));

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert_eq!(body["results"][0]["success"], false);
    assert_eq!(body["results"][0]["upstreamStatus"], 409);
    assert_eq!(
        body["results"][0]["upstreamError"]["error"]["message"],
        "Shift overlaps an existing shift"
    );
    assert_eq!(body["results"][1]["success"], true);
    assert_eq!(workforce.shifts.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_analyze_unparseable_reply_is_a_warning() {
    let reply = "Sorry, I could not find a schedule in this picture.";
    let workforce = Arc::new(FakeWorkforce::with_roster(roster()));
    let app = setup_app(workforce.clone(), Arc::new(FakeVision::replying(reply)));

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body["warning"].is_string());
    assert_eq!(body["rawResponse"], reply);
    assert!(workforce.shifts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_empty_schedule() {
    let app = setup_app(
        Arc::new(FakeWorkforce::with_roster(roster())),
        Arc::new(FakeVision::replying("```json\n[]\n```")),
    );

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["totalShifts"], 0);
}

#[tokio::test]
async fn test_analyze_model_failure_is_bad_gateway() {
    let app = setup_app(
        Arc::new(FakeWorkforce::with_roster(roster())),
        Arc::new(FakeVision::failing("connection reset")),
    );

    let (status, body) = send(app, png_upload()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "UPSTREAM_ERROR");
}

#[tokio::test]
async fn test_analyze_rejects_non_image_upload() {
    let vision = Arc::new(FakeVision::replying("[]"));
    let app = setup_app(Arc::new(FakeWorkforce::default()), vision.clone());

    let (status, body) = send(app, upload("image", "application/pdf", b"%PDF-1.4")).await;

    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["error"]["code"], "UNSUPPORTED_MEDIA_TYPE");
    assert_eq!(vision.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_requires_image_field() {
    let vision = Arc::new(FakeVision::replying("[]"));
    let app = setup_app(Arc::new(FakeWorkforce::default()), vision.clone());

    let (status, _) = send(app, upload("photo", "image/png", b"data")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(vision.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_empty_image() {
    let vision = Arc::new(FakeVision::replying("[]"));
    let app = setup_app(Arc::new(FakeWorkforce::default()), vision.clone());

    let (status, _) = send(app, upload("image", "image/jpeg", b"")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(vision.call_count(), 0);
}

#[tokio::test]
async fn test_analyze_rejects_oversized_image() {
    let vision = Arc::new(FakeVision::replying("[]"));
    let app = setup_app_with_limit(Arc::new(FakeWorkforce::default()), vision.clone(), 16);

    let (status, body) = send(app, upload("image", "image/png", &[0u8; 64])).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    assert_eq!(vision.call_count(), 0);
}
