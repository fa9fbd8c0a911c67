//! Client-side cancellation lead-time guard.
//!
//! Advisory only: the server has the final word. A pass here does not mean
//! the server will accept the cancellation.

use chrono::{Duration, NaiveDateTime};
use thiserror::Error;

pub const DEFAULT_LEAD_TIME_HOURS: i64 = 24;

/// Setting key holding the lead time in hours.
pub const LEAD_TIME_SETTING: &str = "CancellationLeadTimeHours";

/// Refusal reported before any network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "las citas solo pueden cancelarse con al menos {lead_time_hours} horas de anticipación"
)]
pub struct CancellationRefused {
    pub lead_time_hours: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationPolicy {
    lead_time_hours: i64,
}

impl Default for CancellationPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_TIME_HOURS)
    }
}

impl CancellationPolicy {
    pub fn new(lead_time_hours: i64) -> Self {
        Self { lead_time_hours }
    }

    /// Build from the raw server setting; absent or unparsable values fall
    /// back to `default_hours`.
    pub fn from_setting(raw: Option<&str>, default_hours: i64) -> Self {
        let hours = raw
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|h| lead_time_in_range(*h))
            .unwrap_or_else(|| {
                tracing::debug!(raw = ?raw, default_hours, "using default cancellation lead time");
                default_hours
            });
        Self::new(hours)
    }

    pub fn lead_time_hours(&self) -> i64 {
        self.lead_time_hours
    }

    /// True when at least the lead time remains before the appointment.
    /// The boundary is inclusive.
    /// A lead time too large to represent is never satisfied.
    pub fn can_cancel(&self, appointment_at: NaiveDateTime, now: NaiveDateTime) -> bool {
        Duration::try_hours(self.lead_time_hours)
            .is_some_and(|lead| appointment_at - now >= lead)
    }

    pub fn check(
        &self,
        appointment_at: NaiveDateTime,
        now: NaiveDateTime,
    ) -> Result<(), CancellationRefused> {
        if self.can_cancel(appointment_at, now) {
            Ok(())
        } else {
            Err(CancellationRefused {
                lead_time_hours: self.lead_time_hours,
            })
        }
    }
}

/// Non-negative and representable as a duration.
pub fn lead_time_in_range(hours: i64) -> bool {
    hours >= 0 && Duration::try_hours(hours).is_some()
}
