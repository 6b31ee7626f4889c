//! Gemini client
//!
//! Sends the schedule image inline (base64) together with a fixed
//! extraction prompt to `models/{model}:generateContent` and returns the
//! concatenated text of the first candidate.
//!
//! # API Reference
//! - Endpoint: `{base}/models/{model}:generateContent`
//! - Auth: `x-goog-api-key` header; the key never appears in the URL
//! - Documentation: https://ai.google.dev/api/generate-content

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use shiftrelay_common::config::GeminiConfig;
use shiftrelay_common::{Error, Result};
use std::time::Duration;
use tracing::debug;

use super::{read_json, transport_error, ScheduleVision, UpstreamError};

const SERVICE: &str = "gemini";

const API_KEY_HEADER: &str = "x-goog-api-key";

/// Instruction sent alongside every schedule image
pub const EXTRACTION_PROMPT: &str = r#"You are reading a photo or screenshot of a staff work schedule.
Extract every shift you can see and answer with ONLY a JSON array, no prose and no Markdown.
Each element must be an object with exactly these fields:
{
  "date": "D-MMM-YY, for example 1-Dec-24",
  "startTime": "H:MM AM/PM, for example 9:00 AM",
  "endTime": "H:MM AM/PM, for example 5:30 PM",
  "employeeRef": "the employee's name exactly as written, or their numeric id if only an id is shown",
  "blnPublish": true,
  "intMealbreakMinute": 30,
  "intOpunitId": 1,
  "blnForceOverwrite": false,
  "blnOpen": false,
  "strComment": "any note written next to the shift, otherwise \"Shift for <employee name>\"",
  "intConfirmStatus": 0
}
Use one object per shift. If a value is not visible, leave the example default."#;

/// reqwest-backed [`ScheduleVision`]
#[derive(Clone)]
pub struct GeminiClient {
    http_client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig, timeout: Duration) -> Result<Self> {
        let mut api_key = header::HeaderValue::from_str(&config.api_key)
            .map_err(|_| Error::Config("Gemini API key contains invalid characters".to_string()))?;
        api_key.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(API_KEY_HEADER, api_key);

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config: config.clone(),
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    Inline { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Text parts of the first candidate, joined
    fn into_text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

#[async_trait]
impl ScheduleVision for GeminiClient {
    async fn extract_schedule(
        &self,
        image: &[u8],
        mime_type: &str,
    ) -> std::result::Result<String, UpstreamError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    Part::Text {
                        text: EXTRACTION_PROMPT,
                    },
                    Part::Inline {
                        inline_data: InlineData {
                            mime_type,
                            data: STANDARD.encode(image),
                        },
                    },
                ],
            }],
        };

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url, self.config.model
        );
        debug!(url = %url, image_bytes = image.len(), "Requesting schedule extraction");

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;

        let generated: GenerateResponse = read_json(SERVICE, response).await?;
        generated.into_text().ok_or(UpstreamError::Decode {
            service: SERVICE,
            message: "model returned no text candidates".to_string(),
        })
    }
}
