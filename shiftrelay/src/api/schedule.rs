//! Schedule image analysis
//!
//! POST /api/schedule/analyze accepts a multipart upload with one `image`
//! field and runs the image-to-shift pipeline. Pipeline outcomes map to:
//! - 200 `success: false` + `warning`: model text could not be parsed
//! - 200 `success: true`: nothing found, or every shift was submitted
//!   (`success` is false if any individual creation failed)
//! - 422: some employees were not found, nothing was submitted

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde_json::json;

use crate::{
    error::{ApiError, ApiResult},
    pipeline::{analyze_schedule, AnalysisOutcome, BatchOutcome},
    AppState,
};

/// Multipart form field carrying the image
pub const IMAGE_FIELD: &str = "image";

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// POST /api/schedule/analyze
pub async fn analyze_schedule_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Response> {
    let (image, mime_type) = read_image(&mut multipart, state.max_upload_bytes).await?;

    tracing::info!(bytes = image.len(), mime_type = %mime_type, "Schedule image received");

    let outcome = analyze_schedule(
        state.vision.as_ref(),
        state.workforce.as_ref(),
        &image,
        &mime_type,
        &state.shift_defaults,
    )
    .await?;

    Ok(outcome_response(outcome))
}

/// Pull the `image` field out of the form and check it
async fn read_image(multipart: &mut Multipart, max_bytes: usize) -> ApiResult<(Vec<u8>, String)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let mime_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_default();
        if !mime_type.starts_with("image/") {
            return Err(ApiError::UnsupportedMediaType(format!(
                "expected an image upload, got '{}'",
                mime_type
            )));
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("uploaded image is empty".to_string()));
        }
        if bytes.len() > max_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "image is {} bytes, limit is {} bytes",
                bytes.len(),
                max_bytes
            )));
        }

        return Ok((bytes.to_vec(), mime_type));
    }

    Err(ApiError::BadRequest(format!(
        "multipart field '{}' is required",
        IMAGE_FIELD
    )))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(err.body_text())
    } else {
        ApiError::BadRequest(err.body_text())
    }
}

/// Map a pipeline outcome onto the HTTP response
pub fn outcome_response(outcome: AnalysisOutcome) -> Response {
    match outcome {
        AnalysisOutcome::Unparseable { error, raw } => Json(json!({
            "success": false,
            "warning": "Could not parse the model response as shift data",
            "error": error.message,
            "rawResponse": raw,
        }))
        .into_response(),

        AnalysisOutcome::Empty => Json(json!({
            "success": true,
            "message": "No shifts found in image",
            "totalShifts": 0,
            "results": [],
        }))
        .into_response(),

        AnalysisOutcome::Batch(BatchOutcome::Blocked {
            processed,
            unresolved,
        }) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({
                "success": false,
                "error": format!(
                    "{} of {} shifts reference employees that could not be found; no shifts were created",
                    unresolved.len(),
                    processed.len() + unresolved.len()
                ),
                "totalShifts": processed.len() + unresolved.len(),
                "failedShifts": unresolved,
                "processedShifts": processed,
            })),
        )
            .into_response(),

        AnalysisOutcome::Batch(BatchOutcome::Submitted { processed, results }) => {
            let created = results.iter().filter(|r| r.success).count();
            Json(json!({
                "success": created == results.len(),
                "message": format!("Created {} of {} shifts", created, results.len()),
                "totalShifts": results.len(),
                "results": results,
                "processedShifts": processed,
            }))
            .into_response()
        }
    }
}

/// Build schedule analysis routes
pub fn schedule_routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/schedule/analyze", post(analyze_schedule_image))
        .layer(DefaultBodyLimit::max(
            max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES),
        ))
}
