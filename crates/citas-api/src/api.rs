use async_trait::async_trait;
use chrono::NaiveDate;
use citas_core::{AppointmentRecord, BranchRef, ClientRecord, ConfiguredSlot, ReasonRef};

use crate::ApiError;
use crate::wire::{
    CancelRequest, CancelResponse, ScheduleRequest, ScheduleResponse, SimpleRegistrationRequest,
    SimpleRegistrationResponse, VerificationResponse,
};

/// Logical operations offered by the scheduling server.
///
/// Every call is independent; implementations must not retry or cache.
#[async_trait]
pub trait SchedulingApi: Send + Sync {
    /// Look up an existing client by client number.
    async fn validate_client(&self, client_number: &str) -> Result<ClientRecord, ApiError>;

    async fn branches(&self) -> Result<Vec<BranchRef>, ApiError>;

    async fn reasons(&self) -> Result<Vec<ReasonRef>, ApiError>;

    /// Bookable times for a date and branch, already filtered and ordered by
    /// the server's business rules.
    async fn available_times(&self, date: NaiveDate, branch_id: i64)
    -> Result<Vec<String>, ApiError>;

    /// Date-independent slot configuration of a branch.
    async fn configured_slots(&self, branch_id: i64) -> Result<Vec<ConfiguredSlot>, ApiError>;

    async fn branch_appointments(
        &self,
        branch_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<AppointmentRecord>, ApiError>;

    async fn client_appointments(
        &self,
        client_number: &str,
    ) -> Result<Vec<AppointmentRecord>, ApiError>;

    /// Schedule for a known client.
    async fn schedule(&self, request: &ScheduleRequest) -> Result<ScheduleResponse, ApiError>;

    /// Register the client and schedule the appointment atomically.
    async fn register_and_schedule(
        &self,
        request: &SimpleRegistrationRequest,
    ) -> Result<SimpleRegistrationResponse, ApiError>;

    async fn cancel(
        &self,
        appointment_id: i64,
        request: &CancelRequest,
    ) -> Result<CancelResponse, ApiError>;

    async fn verify(
        &self,
        appointment_number: &str,
        client_number: &str,
    ) -> Result<VerificationResponse, ApiError>;

    /// Raw value of a server-managed setting, `None` if it does not exist.
    async fn setting(&self, key: &str) -> Result<Option<String>, ApiError>;
}
