use std::sync::Arc;

use chrono::NaiveDateTime;
use citas_api::SchedulingApi;
use citas_api::wire::CancelRequest;
use citas_core::{AppointmentRecord, CancellationPolicy, CancellationRefused, ClientConfig, ErrorDescriptor};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelError {
    /// The local lead-time guard refused; no request was sent.
    #[error(transparent)]
    Refused(#[from] CancellationRefused),
    #[error("appointment {0} has no usable date and time")]
    UnknownSchedule(i64),
    #[error("appointment {0} is already cancelled")]
    AlreadyCancelled(i64),
    #[error("{0}")]
    Rejected(ErrorDescriptor),
}

/// One row of a client's appointment list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppointmentRow {
    pub appointment: AppointmentRecord,
    pub scheduled_at: Option<NaiveDateTime>,
    pub cancellable: bool,
}

#[derive(Clone)]
pub struct CancellationService {
    api: Arc<dyn SchedulingApi>,
    policy: CancellationPolicy,
}

impl CancellationService {
    pub fn new(api: Arc<dyn SchedulingApi>, policy: CancellationPolicy) -> Self {
        Self { api, policy }
    }

    /// Read the lead time from the server setting named in `config`.
    pub async fn load(api: Arc<dyn SchedulingApi>, config: &ClientConfig) -> Self {
        let key = config.cancellation_lead_time_setting.as_str();
        let default = config.default_cancellation_lead_time_hours;
        let raw = match api.setting(key).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(setting = key, error = %e, "could not read cancellation lead time, using default");
                None
            }
        };
        let policy = CancellationPolicy::from_setting(raw.as_deref(), default);
        info!(lead_time_hours = policy.lead_time_hours(), "cancellation policy loaded");
        Self::new(api, policy)
    }

    pub fn policy(&self) -> CancellationPolicy {
        self.policy
    }

    pub fn can_cancel(&self, appointment: &AppointmentRecord, now: NaiveDateTime) -> bool {
        !appointment.is_cancelled()
            && appointment
                .scheduled_at()
                .is_some_and(|at| self.policy.can_cancel(at, now))
    }

    /// The client's appointments, soonest first, each flagged with whether
    /// the guard currently allows cancelling it.
    pub async fn appointments(
        &self,
        client_number: &str,
        now: NaiveDateTime,
    ) -> Result<Vec<AppointmentRow>, ErrorDescriptor> {
        let records = self
            .api
            .client_appointments(client_number.trim())
            .await
            .map_err(|e| {
                warn!(client = %client_number, error = %e, "could not list appointments");
                e.describe()
            })?;

        let mut rows: Vec<AppointmentRow> = records
            .into_iter()
            .map(|appointment| AppointmentRow {
                scheduled_at: appointment.scheduled_at(),
                cancellable: self.can_cancel(&appointment, now),
                appointment,
            })
            .collect();
        // Unparseable schedules sort last.
        rows.sort_by_key(|r| (r.scheduled_at.is_none(), r.scheduled_at));
        Ok(rows)
    }

    /// Cancel after checking the lead time locally.
    pub async fn cancel(
        &self,
        client_number: &str,
        appointment: &AppointmentRecord,
        reason: &str,
        now: NaiveDateTime,
    ) -> Result<String, CancelError> {
        if appointment.is_cancelled() {
            return Err(CancelError::AlreadyCancelled(appointment.id));
        }
        let at = appointment
            .scheduled_at()
            .ok_or(CancelError::UnknownSchedule(appointment.id))?;
        if let Err(refused) = self.policy.check(at, now) {
            info!(appointment = appointment.id, lead_time_hours = refused.lead_time_hours, "cancellation refused locally");
            return Err(refused.into());
        }
        self.force_cancel(client_number, appointment.id, reason).await
    }

    /// Cancel without the local guard; the server decides.
    pub async fn force_cancel(
        &self,
        client_number: &str,
        appointment_id: i64,
        reason: &str,
    ) -> Result<String, CancelError> {
        let request = CancelRequest {
            client_number: client_number.trim().to_string(),
            reason: reason.trim().to_string(),
        };
        match self.api.cancel(appointment_id, &request).await {
            Ok(resp) => {
                info!(appointment = appointment_id, "appointment cancelled");
                Ok(resp.message)
            }
            Err(e) => {
                let descriptor = e.describe();
                if descriptor.is_expected_validation {
                    info!(appointment = appointment_id, code = %descriptor.code, "cancellation rejected");
                } else {
                    warn!(appointment = appointment_id, error = %e, "cancellation failed");
                }
                Err(CancelError::Rejected(descriptor))
            }
        }
    }
}
