//! Workforce API client
//!
//! Thin reqwest wrapper over the workforce API's REST resources:
//! - `GET  {base}/supervise/employee` - roster
//! - `POST {base}/supervise/employee` - create employee
//! - `GET  {base}/resource/Company`   - locations
//! - `POST {base}/supervise/roster`   - create shift
//!
//! Every request carries `Authorization: Bearer <token>` and JSON content
//! type. Failures are returned, never retried.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde_json::Value;
use shiftrelay_common::config::WorkforceConfig;
use shiftrelay_common::models::{CreateEmployeeRequest, CreateShiftRequest, EmployeeRecord, Location};
use shiftrelay_common::{Error, Result};
use std::time::Duration;
use tracing::debug;

use super::{read_json, transport_error, UpstreamError, WorkforceApi};

const SERVICE: &str = "workforce";

/// reqwest-backed [`WorkforceApi`]
#[derive(Clone)]
pub struct WorkforceClient {
    http_client: Client,
    base_url: String,
}

impl WorkforceClient {
    /// Build a client with auth headers baked in
    ///
    /// Fails with [`Error::Config`] if the token cannot be used as a header.
    pub fn new(config: &WorkforceConfig, timeout: Duration) -> Result<Self> {
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| Error::Config("workforce token contains invalid characters".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let http_client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> std::result::Result<T, UpstreamError> {
        let url = self.url(path);
        debug!(url = %url, "Workforce GET");

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        read_json(SERVICE, response).await
    }

    async fn post<B: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<Value, UpstreamError> {
        let url = self.url(path);
        debug!(url = %url, "Workforce POST");

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl WorkforceApi for WorkforceClient {
    async fn list_employees(&self) -> std::result::Result<Vec<EmployeeRecord>, UpstreamError> {
        let employees: Vec<EmployeeRecord> = self.get("supervise/employee").await?;
        debug!(count = employees.len(), "Fetched roster");
        Ok(employees)
    }

    async fn list_locations(&self) -> std::result::Result<Vec<Location>, UpstreamError> {
        self.get("resource/Company").await
    }

    async fn create_shift(
        &self,
        shift: &CreateShiftRequest,
    ) -> std::result::Result<Value, UpstreamError> {
        self.post("supervise/roster", shift).await
    }

    async fn create_employee(
        &self,
        employee: &CreateEmployeeRequest,
    ) -> std::result::Result<Value, UpstreamError> {
        self.post("supervise/employee", employee).await
    }
}
