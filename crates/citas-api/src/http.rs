//! HTTP client for the scheduling server's JSON endpoints.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use citas_core::{AppointmentRecord, BranchRef, ClientConfig, ClientRecord, ConfiguredSlot, ReasonRef};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::wire::{
    CancelRequest, CancelResponse, ScheduleRequest, ScheduleResponse, SimpleRegistrationRequest,
    SettingValue, SimpleRegistrationResponse, VerificationResponse,
};
use crate::{ApiError, SchedulingApi};

/// reqwest-backed [`SchedulingApi`].
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    /// Create a client for the given API base URL.
    ///
    /// `base_url` should be like `http://localhost:5000` (no trailing slash).
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `path` with one extra percent-encoded segment appended.
    fn url_with_segment(&self, path: &str, segment: &str) -> Result<reqwest::Url, ApiError> {
        let raw = self.url(path);
        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| ApiError::Transport(format!("invalid URL {raw}: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Transport(format!("cannot append to URL {raw}")))?
            .push(segment);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        self.get_json_at(self.url(path), query).await
    }

    async fn get_json_at<U, T>(&self, url: U, query: &[(&str, String)]) -> Result<T, ApiError>
    where
        U: reqwest::IntoUrl + std::fmt::Display,
        T: DeserializeOwned,
    {
        debug!(url = %url, "GET");
        let resp = self.client.get(url).query(query).send().await?;
        Self::read_json(resp).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(url = %url, method = %method, "sending");
        let resp = self.client.request(method, &url).json(body).send().await?;
        Self::read_json(resp).await
    }

    async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ApiError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ApiError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl SchedulingApi for HttpApi {
    async fn validate_client(&self, client_number: &str) -> Result<ClientRecord, ApiError> {
        self.get_json(
            "/api/clients/validate",
            &[("clientNumber", client_number.to_string())],
        )
        .await
    }

    async fn branches(&self) -> Result<Vec<BranchRef>, ApiError> {
        let branches: Vec<BranchRef> = self.get_json("/api/branches", &[]).await?;
        info!(count = branches.len(), "loaded branches");
        Ok(branches)
    }

    async fn reasons(&self) -> Result<Vec<ReasonRef>, ApiError> {
        let reasons: Vec<ReasonRef> = self.get_json("/api/appointment-types", &[]).await?;
        info!(count = reasons.len(), "loaded appointment types");
        Ok(reasons)
    }

    async fn available_times(
        &self,
        date: NaiveDate,
        branch_id: i64,
    ) -> Result<Vec<String>, ApiError> {
        self.get_json(
            "/api/appointments/available-times",
            &[
                ("date", date.format("%Y-%m-%d").to_string()),
                ("branchId", branch_id.to_string()),
            ],
        )
        .await
    }

    async fn configured_slots(&self, branch_id: i64) -> Result<Vec<ConfiguredSlot>, ApiError> {
        self.get_json(&format!("/api/time-slots/branch/{branch_id}"), &[])
            .await
    }

    async fn branch_appointments(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, ApiError> {
        self.get_json(
            &format!("/api/appointments/branch/{branch_id}"),
            &[("date", date.format("%Y-%m-%d").to_string())],
        )
        .await
    }

    async fn client_appointments(
        &self,
        client_number: &str,
    ) -> Result<Vec<AppointmentRecord>, ApiError> {
        self.get_json(
            "/api/appointments/client",
            &[("clientNumber", client_number.to_string())],
        )
        .await
    }

    async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleResponse, ApiError> {
        info!(
            client = %request.client_number,
            branch_id = request.branch_id,
            date = %request.appointment_date,
            time = %request.appointment_time,
            "scheduling appointment"
        );
        self.send_json(reqwest::Method::POST, "/api/appointments/schedule", request)
            .await
    }

    async fn register_and_schedule(
        &self,
        request: &SimpleRegistrationRequest,
    ) -> Result<SimpleRegistrationResponse, ApiError> {
        info!(
            branch_id = request.branch_id,
            date = %request.appointment_date,
            time = %request.appointment_time,
            "registering client and scheduling appointment"
        );
        self.send_json(
            reqwest::Method::POST,
            "/api/appointments/simple-registration",
            request,
        )
        .await
    }

    async fn cancel(
        &self,
        appointment_id: i64,
        request: &CancelRequest,
    ) -> Result<CancelResponse, ApiError> {
        info!(appointment_id, client = %request.client_number, "cancelling appointment");
        self.send_json(
            reqwest::Method::PUT,
            &format!("/api/appointments/{appointment_id}/cancel"),
            request,
        )
        .await
    }

    async fn verify(
        &self,
        appointment_number: &str,
        client_number: &str,
    ) -> Result<VerificationResponse, ApiError> {
        self.get_json(
            "/api/appointments/verify",
            &[
                ("appointmentNumber", appointment_number.to_string()),
                ("clientNumber", client_number.to_string()),
            ],
        )
        .await
    }

    async fn setting(&self, key: &str) -> Result<Option<String>, ApiError> {
        let url = self.url_with_segment("/api/settings", key)?;
        let result: Result<Option<SettingValue>, ApiError> = self.get_json_at(url, &[]).await;
        match result {
            Ok(value) => Ok(value.and_then(SettingValue::into_value)),
            Err(ApiError::Server { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
